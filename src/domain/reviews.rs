//! Review operations. Every mutation locks the reviewed expert, applies the
//! change, recomputes the expert's reputation and commits, all in one
//! transaction. Badge notifications go out only after the commit.

use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{with_retry, ReputationStore, ReputationTx};
use crate::domain::reputation::{
    compute_reputation, earned_badges, ReviewStats, IN_DEMAND_WINDOW_DAYS,
};
use crate::domain::DomainError;
use crate::models::{
    Badge, ExpertDetails, NewNotification, NewReview, PageRequest, ReputationUpdate,
    ReviewContent, ReviewFilter, Satisfaction, SessionReview, SubmitReviewPayload,
    UpdateReviewPayload,
};

/// Attempts per mutation before a transient store error is returned
pub const MAX_ATTEMPTS: u8 = 3;

pub const MAX_REMARKS_CHARS: usize = 2000;

/// Result of one reputation recompute
#[derive(Debug, Clone, PartialEq)]
pub struct ReputationOutcome {
    pub expert_id: Uuid,
    /// The expert's owning user, who receives badge notifications
    pub recipient_id: Uuid,
    pub update: ReputationUpdate,
    pub earned_badges: Vec<Badge>,
}

/// A created, updated or deleted review and the reputation it produced
#[derive(Debug, Clone)]
pub struct ReviewMutation {
    pub review: SessionReview,
    /// True when the submission inserted a new row
    pub created: bool,
    pub reputation: ReputationOutcome,
}

/// One page of reviews plus the total matching count
#[derive(Debug, Clone)]
pub struct ReviewPage {
    pub reviews: Vec<SessionReview>,
    pub total: i64,
    pub page: PageRequest,
}

#[derive(Debug, Clone)]
pub struct ExpertReviewPage {
    pub expert: ExpertDetails,
    pub reviews: ReviewPage,
}

/// Fields of a PATCH after validation; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
struct ReviewPatch {
    rating: Option<i32>,
    satisfaction: Option<Satisfaction>,
    remarks: Option<String>,
}

impl ReviewPatch {
    fn apply(&self, review: &SessionReview) -> ReviewContent {
        ReviewContent {
            rating: self.rating.unwrap_or(review.rating),
            satisfaction: self.satisfaction.unwrap_or(review.satisfaction),
            remarks: self.remarks.clone().or_else(|| review.remarks.clone()),
        }
    }
}

fn validate_rating(rating: i32) -> Result<i32, DomainError> {
    if !(1..=5).contains(&rating) {
        return Err(DomainError::Validation(format!(
            "rating must be between 1 and 5, got {}",
            rating
        )));
    }
    Ok(rating)
}

fn validate_satisfaction(value: &str) -> Result<Satisfaction, DomainError> {
    value.parse::<Satisfaction>().map_err(|_| {
        DomainError::Validation(format!(
            "satisfaction must be one of VERY_SATISFIED, SATISFIED, NEUTRAL, DISSATISFIED, VERY_DISSATISFIED, got {:?}",
            value
        ))
    })
}

fn validate_remarks(remarks: Option<String>) -> Result<Option<String>, DomainError> {
    match remarks {
        Some(text) if text.chars().count() > MAX_REMARKS_CHARS => Err(DomainError::Validation(
            format!("remarks must be at most {} characters", MAX_REMARKS_CHARS),
        )),
        other => Ok(other),
    }
}

fn validate_submission(payload: SubmitReviewPayload) -> Result<(Option<String>, ReviewContent), DomainError> {
    let content = ReviewContent {
        rating: validate_rating(payload.rating)?,
        satisfaction: validate_satisfaction(&payload.satisfaction)?,
        remarks: validate_remarks(payload.remarks)?,
    };
    Ok((payload.session_id, content))
}

fn validate_patch(payload: UpdateReviewPayload) -> Result<ReviewPatch, DomainError> {
    Ok(ReviewPatch {
        rating: payload.rating.map(validate_rating).transpose()?,
        satisfaction: payload
            .satisfaction
            .as_deref()
            .map(validate_satisfaction)
            .transpose()?,
        remarks: validate_remarks(payload.remarks)?,
    })
}

/// Review operations over any [`ReputationStore`]
pub struct ReviewService<S> {
    store: S,
}

impl<S: ReputationStore> ReviewService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Round trip to the backing store
    pub async fn health_check(&self) -> Result<(), DomainError> {
        self.store.ping().await?;
        Ok(())
    }

    /// Create the caller's review of an expert, or overwrite it in place if
    /// one already exists. The expert is addressed by its owning user id.
    #[tracing::instrument(skip(self, payload))]
    pub async fn submit_or_update_review(
        &self,
        reviewer_id: Uuid,
        expert_user_id: Uuid,
        payload: SubmitReviewPayload,
    ) -> Result<ReviewMutation, DomainError> {
        let (session, content) = validate_submission(payload)?;
        if reviewer_id == expert_user_id {
            return Err(DomainError::Validation(
                "experts cannot review themselves".to_string(),
            ));
        }

        let session_id = session.as_deref();
        let content = &content;
        let mutation = with_retry(MAX_ATTEMPTS, move || {
            self.submit_once(reviewer_id, expert_user_id, session_id, content)
        })
        .await?;

        info!(
            review_id = %mutation.review.id,
            expert_id = %mutation.reputation.expert_id,
            created = mutation.created,
            "Review submitted"
        );
        self.notify_earned(&mutation.reputation).await;
        Ok(mutation)
    }

    async fn submit_once(
        &self,
        reviewer_id: Uuid,
        expert_user_id: Uuid,
        session_id: Option<&str>,
        content: &ReviewContent,
    ) -> Result<ReviewMutation, DomainError> {
        let mut tx = self.store.begin().await?;

        let expert = tx
            .lock_expert_by_user(expert_user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Expert not found".to_string()))?;

        let (review, created) = match tx.find_review_by_pair(reviewer_id, expert.id).await? {
            Some(existing) => {
                let review = tx.update_review(existing.id, session_id, content).await?;
                (review, false)
            }
            None => {
                let new_review = NewReview {
                    expert_id: expert.id,
                    reviewer_id,
                    session_id: session_id.map(str::to_string),
                    content: content.clone(),
                };
                (tx.insert_review(&new_review).await?, true)
            }
        };

        let reputation = recompute_locked(&mut tx, &expert).await?;
        tx.commit().await?;

        Ok(ReviewMutation {
            review,
            created,
            reputation,
        })
    }

    /// Partially update a review owned by `requester_id`
    #[tracing::instrument(skip(self, payload))]
    pub async fn update_review(
        &self,
        review_id: Uuid,
        requester_id: Uuid,
        payload: UpdateReviewPayload,
    ) -> Result<ReviewMutation, DomainError> {
        let patch = validate_patch(payload)?;
        let patch = &patch;

        let mutation = with_retry(MAX_ATTEMPTS, move || {
            self.update_once(review_id, requester_id, patch)
        })
        .await?;

        info!(%review_id, expert_id = %mutation.reputation.expert_id, "Review updated");
        self.notify_earned(&mutation.reputation).await;
        Ok(mutation)
    }

    async fn update_once(
        &self,
        review_id: Uuid,
        requester_id: Uuid,
        patch: &ReviewPatch,
    ) -> Result<ReviewMutation, DomainError> {
        let mut tx = self.store.begin().await?;
        let (expert, review) = lock_owned_review(&mut tx, review_id, requester_id).await?;

        let content = patch.apply(&review);
        let review = tx.update_review(review.id, None, &content).await?;

        let reputation = recompute_locked(&mut tx, &expert).await?;
        tx.commit().await?;

        Ok(ReviewMutation {
            review,
            created: false,
            reputation,
        })
    }

    /// Delete a review owned by `requester_id`
    #[tracing::instrument(skip(self))]
    pub async fn delete_review(
        &self,
        review_id: Uuid,
        requester_id: Uuid,
    ) -> Result<ReviewMutation, DomainError> {
        let mutation = with_retry(MAX_ATTEMPTS, move || self.delete_once(review_id, requester_id)).await?;

        info!(%review_id, expert_id = %mutation.reputation.expert_id, "Review deleted");
        self.notify_earned(&mutation.reputation).await;
        Ok(mutation)
    }

    async fn delete_once(
        &self,
        review_id: Uuid,
        requester_id: Uuid,
    ) -> Result<ReviewMutation, DomainError> {
        let mut tx = self.store.begin().await?;
        let (expert, review) = lock_owned_review(&mut tx, review_id, requester_id).await?;

        if !tx.delete_review(review.id).await? {
            return Err(DomainError::NotFound("Review not found".to_string()));
        }

        let reputation = recompute_locked(&mut tx, &expert).await?;
        tx.commit().await?;

        Ok(ReviewMutation {
            review,
            created: false,
            reputation,
        })
    }

    /// Recompute an expert's rating, level and badges from its current reviews
    #[tracing::instrument(skip(self))]
    pub async fn recompute_expert_reputation(
        &self,
        expert_id: Uuid,
    ) -> Result<ReputationOutcome, DomainError> {
        let outcome = with_retry(MAX_ATTEMPTS, move || async move {
            let mut tx = self.store.begin().await?;
            let expert = tx
                .lock_expert(expert_id)
                .await?
                .ok_or_else(|| DomainError::NotFound("Expert not found".to_string()))?;

            let outcome = recompute_locked(&mut tx, &expert).await?;
            tx.commit().await?;
            Ok::<_, DomainError>(outcome)
        })
        .await?;

        self.notify_earned(&outcome).await;
        Ok(outcome)
    }

    /// A page of an expert's reviews with its current reputation
    #[tracing::instrument(skip(self))]
    pub async fn get_expert_reviews(
        &self,
        expert_id: Uuid,
        page: PageRequest,
    ) -> Result<ExpertReviewPage, DomainError> {
        let expert = self
            .store
            .find_expert(expert_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Expert not found".to_string()))?;

        let (reviews, total) = self
            .store
            .list_reviews_page(ReviewFilter::Expert(expert_id), page)
            .await?;

        Ok(ExpertReviewPage {
            expert,
            reviews: ReviewPage {
                reviews,
                total,
                page,
            },
        })
    }

    /// A page of the reviews a user has written
    #[tracing::instrument(skip(self))]
    pub async fn get_user_reviews(
        &self,
        reviewer_id: Uuid,
        page: PageRequest,
    ) -> Result<ReviewPage, DomainError> {
        let (reviews, total) = self
            .store
            .list_reviews_page(ReviewFilter::Reviewer(reviewer_id), page)
            .await?;

        Ok(ReviewPage {
            reviews,
            total,
            page,
        })
    }

    async fn notify_earned(&self, outcome: &ReputationOutcome) {
        for badge in &outcome.earned_badges {
            let notification = NewNotification::badge_earned(outcome.recipient_id, *badge);
            match self.store.create_notification(&notification).await {
                Ok(()) => info!(
                    expert_id = %outcome.expert_id,
                    badge = %badge,
                    "Badge earned notification sent"
                ),
                Err(e) => warn!(
                    expert_id = %outcome.expert_id,
                    badge = %badge,
                    error = %e,
                    "Failed to send badge earned notification"
                ),
            }
        }
    }
}

/// Find a review, check ownership, then lock its expert and read the
/// review again under the lock.
async fn lock_owned_review<T: ReputationTx>(
    tx: &mut T,
    review_id: Uuid,
    requester_id: Uuid,
) -> Result<(ExpertDetails, SessionReview), DomainError> {
    let review = tx
        .find_review(review_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("Review not found".to_string()))?;

    if review.reviewer_id != requester_id {
        return Err(DomainError::Forbidden(
            "You can only modify your own reviews".to_string(),
        ));
    }

    let expert = tx
        .lock_expert(review.expert_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("Expert not found".to_string()))?;

    let review = tx
        .find_review(review_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("Review not found".to_string()))?;

    Ok((expert, review))
}

/// Recompute and persist reputation for an expert whose row lock `tx` holds
async fn recompute_locked<T: ReputationTx>(
    tx: &mut T,
    expert: &ExpertDetails,
) -> Result<ReputationOutcome, DomainError> {
    let reviews = tx.list_reviews(expert.id).await?;
    let recent = tx
        .count_recent_reviews(expert.id, IN_DEMAND_WINDOW_DAYS)
        .await?;

    let stats = ReviewStats::from_ratings(reviews.iter().map(|review| review.rating), recent);
    let update = compute_reputation(expert, &stats);
    tx.update_expert_reputation(expert.id, &update).await?;

    let earned = earned_badges(&expert.badges, &update.badges);
    info!(
        expert_id = %expert.id,
        review_count = stats.review_count,
        ratings = %update.ratings,
        progress_level = %update.progress_level,
        earned = earned.len(),
        "Recomputed expert reputation"
    );

    Ok(ReputationOutcome {
        expert_id: expert.id,
        recipient_id: expert.user_id,
        update,
        earned_badges: earned,
    })
}
