use super::{
    Badge, BadgeSet, ExpertDetails, ExpertDetailsRow, ProgressLevel, SessionReview,
    SessionReviewRow, UnknownTag,
};

impl TryFrom<ExpertDetailsRow> for ExpertDetails {
    type Error = UnknownTag;

    fn try_from(row: ExpertDetailsRow) -> Result<Self, Self::Error> {
        let badges = row
            .badges
            .iter()
            .map(|tag| tag.parse::<Badge>())
            .collect::<Result<BadgeSet, _>>()?;

        Ok(ExpertDetails {
            id: row.id,
            user_id: row.user_id,
            ratings: row.ratings,
            progress_level: row.progress_level.parse::<ProgressLevel>()?,
            badges,
            expertise: row.expertise,
        })
    }
}

impl TryFrom<SessionReviewRow> for SessionReview {
    type Error = UnknownTag;

    fn try_from(row: SessionReviewRow) -> Result<Self, Self::Error> {
        Ok(SessionReview {
            id: row.id,
            expert_id: row.expert_id,
            reviewer_id: row.reviewer_id,
            session_id: row.session_id,
            rating: row.rating,
            satisfaction: row.satisfaction.parse()?,
            remarks: row.remarks,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Badge tags in the form stored in the `badges TEXT[]` column
pub fn badge_tags(badges: &BadgeSet) -> Vec<String> {
    badges.iter().map(|badge| badge.as_str().to_string()).collect()
}
