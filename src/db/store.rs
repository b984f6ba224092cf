//! Store contract consumed by the review operations and the reputation engine.
//!
//! Every review mutation runs inside one [`ReputationTx`]. The transaction's
//! `lock_expert*` methods take an exclusive per-expert lock that is held
//! until commit or drop, so recomputes on the same expert never interleave.
//! Dropping a transaction without committing discards all of its writes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::errors::Result;
use crate::models::{
    ExpertDetails, NewNotification, NewReview, PageRequest, ReputationUpdate, ReviewContent,
    ReviewFilter, SessionReview,
};

#[async_trait]
pub trait ReputationStore: Send + Sync + 'static {
    type Tx: ReputationTx;

    /// Open a unit of work
    async fn begin(&self) -> Result<Self::Tx>;

    /// Read an expert without locking
    async fn find_expert(&self, expert_id: Uuid) -> Result<Option<ExpertDetails>>;

    /// One page of reviews, newest first, plus the total matching the filter
    async fn list_reviews_page(
        &self,
        filter: ReviewFilter,
        page: PageRequest,
    ) -> Result<(Vec<SessionReview>, i64)>;

    /// Insert a notification outside any review transaction
    async fn create_notification(&self, notification: &NewNotification) -> Result<()>;

    /// Cheap round trip proving the store is reachable
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait ReputationTx: Send {
    /// Load and lock an expert by its own id
    async fn lock_expert(&mut self, expert_id: Uuid) -> Result<Option<ExpertDetails>>;

    /// Load and lock an expert by the owning user's id
    async fn lock_expert_by_user(&mut self, user_id: Uuid) -> Result<Option<ExpertDetails>>;

    async fn find_review(&mut self, review_id: Uuid) -> Result<Option<SessionReview>>;

    async fn find_review_by_pair(
        &mut self,
        reviewer_id: Uuid,
        expert_id: Uuid,
    ) -> Result<Option<SessionReview>>;

    async fn insert_review(&mut self, review: &NewReview) -> Result<SessionReview>;

    /// Overwrite a review's content in place. `session_id` of `None` keeps
    /// the stored value. Id and creation time never change.
    async fn update_review(
        &mut self,
        review_id: Uuid,
        session_id: Option<&str>,
        content: &ReviewContent,
    ) -> Result<SessionReview>;

    /// Returns false when no row was deleted
    async fn delete_review(&mut self, review_id: Uuid) -> Result<bool>;

    async fn list_reviews(&mut self, expert_id: Uuid) -> Result<Vec<SessionReview>>;

    /// Reviews of the expert created within the last `window_days` days,
    /// measured on the store's own clock so it agrees with `created_at`
    async fn count_recent_reviews(&mut self, expert_id: Uuid, window_days: i32) -> Result<i64>;

    /// Persist derived reputation fields; `NotFound` if the expert is gone
    async fn update_expert_reputation(
        &mut self,
        expert_id: Uuid,
        update: &ReputationUpdate,
    ) -> Result<()>;

    async fn commit(self) -> Result<()>;
}
