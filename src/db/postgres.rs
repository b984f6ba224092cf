use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::connection::health_check;
use crate::db::errors::{DatabaseError, Result};
use crate::db::queries;
use crate::db::store::{ReputationStore, ReputationTx};
use crate::models::{
    ExpertDetails, NewNotification, NewReview, PageRequest, ReputationUpdate, ReviewContent,
    ReviewFilter, SessionReview,
};

/// Postgres-backed store. Expert locks are `SELECT ... FOR UPDATE` row locks.
#[derive(Clone)]
pub struct PgReputationStore {
    pool: PgPool,
}

impl PgReputationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgReputationTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReputationStore for PgReputationStore {
    type Tx = PgReputationTx;

    async fn begin(&self) -> Result<PgReputationTx> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::TransactionError(e.to_string()))?;
        Ok(PgReputationTx { tx })
    }

    async fn find_expert(&self, expert_id: Uuid) -> Result<Option<ExpertDetails>> {
        queries::find_expert(&self.pool, expert_id).await
    }

    async fn list_reviews_page(
        &self,
        filter: ReviewFilter,
        page: PageRequest,
    ) -> Result<(Vec<SessionReview>, i64)> {
        queries::list_reviews_page(&self.pool, filter, page).await
    }

    async fn create_notification(&self, notification: &NewNotification) -> Result<()> {
        queries::insert_notification(&self.pool, notification).await
    }

    async fn ping(&self) -> Result<()> {
        health_check(&self.pool).await
    }
}

#[async_trait]
impl ReputationTx for PgReputationTx {
    async fn lock_expert(&mut self, expert_id: Uuid) -> Result<Option<ExpertDetails>> {
        queries::lock_expert(&mut self.tx, expert_id).await
    }

    async fn lock_expert_by_user(&mut self, user_id: Uuid) -> Result<Option<ExpertDetails>> {
        queries::lock_expert_by_user(&mut self.tx, user_id).await
    }

    async fn find_review(&mut self, review_id: Uuid) -> Result<Option<SessionReview>> {
        queries::find_review(&mut self.tx, review_id).await
    }

    async fn find_review_by_pair(
        &mut self,
        reviewer_id: Uuid,
        expert_id: Uuid,
    ) -> Result<Option<SessionReview>> {
        queries::find_review_by_pair(&mut self.tx, reviewer_id, expert_id).await
    }

    async fn insert_review(&mut self, review: &NewReview) -> Result<SessionReview> {
        queries::insert_review(&mut self.tx, review).await
    }

    async fn update_review(
        &mut self,
        review_id: Uuid,
        session_id: Option<&str>,
        content: &ReviewContent,
    ) -> Result<SessionReview> {
        queries::update_review(&mut self.tx, review_id, session_id, content).await
    }

    async fn delete_review(&mut self, review_id: Uuid) -> Result<bool> {
        queries::delete_review(&mut self.tx, review_id).await
    }

    async fn list_reviews(&mut self, expert_id: Uuid) -> Result<Vec<SessionReview>> {
        queries::list_reviews_for_expert(&mut self.tx, expert_id).await
    }

    async fn count_recent_reviews(&mut self, expert_id: Uuid, window_days: i32) -> Result<i64> {
        queries::count_recent_reviews(&mut self.tx, expert_id, window_days).await
    }

    async fn update_expert_reputation(
        &mut self,
        expert_id: Uuid,
        update: &ReputationUpdate,
    ) -> Result<()> {
        queries::update_expert_reputation(&mut self.tx, expert_id, update).await
    }

    async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DatabaseError::TransactionError(e.to_string()))
    }
}
