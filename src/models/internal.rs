use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A stored tag that does not name any known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {tag}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub tag: String,
}

/// Expert reputation tier - declaration order is tier order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressLevel {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl ProgressLevel {
    /// Database / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "BRONZE",
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
            Self::Platinum => "PLATINUM",
        }
    }
}

impl FromStr for ProgressLevel {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BRONZE" => Ok(Self::Bronze),
            "SILVER" => Ok(Self::Silver),
            "GOLD" => Ok(Self::Gold),
            "PLATINUM" => Ok(Self::Platinum),
            other => Err(UnknownTag {
                kind: "progress level",
                tag: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProgressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Achievement tag on an expert profile.
///
/// The first five are derived from review state on every recompute; the
/// rest are assigned out-of-band and only ever carried forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Badge {
    TopRated,
    RisingExpert,
    InDemand,
    EliteExpert,
    VersatilePro,
    CommunityContributor,
    Specialist,
    MulticityExpert,
    QuickResponder,
}

impl Badge {
    pub const DERIVED: [Badge; 5] = [
        Badge::TopRated,
        Badge::RisingExpert,
        Badge::InDemand,
        Badge::EliteExpert,
        Badge::VersatilePro,
    ];

    pub const MANUAL: [Badge; 4] = [
        Badge::CommunityContributor,
        Badge::Specialist,
        Badge::MulticityExpert,
        Badge::QuickResponder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopRated => "TOP_RATED",
            Self::RisingExpert => "RISING_EXPERT",
            Self::InDemand => "IN_DEMAND",
            Self::EliteExpert => "ELITE_EXPERT",
            Self::VersatilePro => "VERSATILE_PRO",
            Self::CommunityContributor => "COMMUNITY_CONTRIBUTOR",
            Self::Specialist => "SPECIALIST",
            Self::MulticityExpert => "MULTICITY_EXPERT",
            Self::QuickResponder => "QUICK_RESPONDER",
        }
    }

    pub fn is_manual(&self) -> bool {
        Self::MANUAL.contains(self)
    }

    /// Human-readable name: the tag with underscores rendered as spaces
    pub fn display_name(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl FromStr for Badge {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::DERIVED
            .iter()
            .chain(Self::MANUAL.iter())
            .find(|badge| badge.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownTag {
                kind: "badge",
                tag: s.to_string(),
            })
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badges have membership semantics only
pub type BadgeSet = BTreeSet<Badge>;

/// Reviewer's categorical satisfaction with a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Satisfaction {
    VerySatisfied,
    Satisfied,
    Neutral,
    Dissatisfied,
    VeryDissatisfied,
}

impl Satisfaction {
    pub const ALL: [Satisfaction; 5] = [
        Satisfaction::VerySatisfied,
        Satisfaction::Satisfied,
        Satisfaction::Neutral,
        Satisfaction::Dissatisfied,
        Satisfaction::VeryDissatisfied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerySatisfied => "VERY_SATISFIED",
            Self::Satisfied => "SATISFIED",
            Self::Neutral => "NEUTRAL",
            Self::Dissatisfied => "DISSATISFIED",
            Self::VeryDissatisfied => "VERY_DISSATISFIED",
        }
    }
}

impl FromStr for Satisfaction {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .find(|value| value.as_str() == normalized)
            .copied()
            .ok_or_else(|| UnknownTag {
                kind: "satisfaction",
                tag: s.to_string(),
            })
    }
}

/// Expert profile as far as reputation is concerned
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub ratings: Decimal,
    pub progress_level: ProgressLevel,
    pub badges: BadgeSet,
    pub expertise: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReview {
    pub id: Uuid,
    pub expert_id: Uuid,
    pub reviewer_id: Uuid,
    pub session_id: Option<String>,
    pub rating: i32,
    pub satisfaction: Satisfaction,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated reviewer-controlled fields of a review
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewContent {
    pub rating: i32,
    pub satisfaction: Satisfaction,
    pub remarks: Option<String>,
}

/// A review about to be inserted
#[derive(Debug, Clone)]
pub struct NewReview {
    pub expert_id: Uuid,
    pub reviewer_id: Uuid,
    pub session_id: Option<String>,
    pub content: ReviewContent,
}

/// Derived reputation fields written back onto an expert in one update
#[derive(Debug, Clone, PartialEq)]
pub struct ReputationUpdate {
    pub ratings: Decimal,
    pub progress_level: ProgressLevel,
    pub badges: BadgeSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    BadgeEarned,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadgeEarned => "BADGE_EARNED",
        }
    }
}

/// Notification to be created; system notifications carry no sender
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationType,
    pub content: String,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
}

impl NewNotification {
    pub fn badge_earned(recipient_id: Uuid, badge: Badge) -> Self {
        Self {
            kind: NotificationType::BadgeEarned,
            content: format!(
                "Congratulations! You have earned the {} badge.",
                badge.display_name()
            ),
            recipient_id,
            sender_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub content: String,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Normalized page window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Rows to skip. Saturates instead of overflowing for huge pages.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Which reviews a list query selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewFilter {
    Expert(Uuid),
    Reviewer(Uuid),
}
