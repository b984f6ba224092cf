//! In-process store used by tests and local runs without Postgres.
//!
//! All transactions are serialized through one async mutex: `begin` takes
//! the lock and works on a staged copy of the state, `commit` writes the copy
//! back and dropping the transaction discards it. This is coarser than the
//! per-expert row lock Postgres takes but gives the same guarantee.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::db::errors::{DatabaseError, Result};
use crate::db::store::{ReputationStore, ReputationTx};
use crate::models::{
    ExpertDetails, NewNotification, NewReview, Notification, PageRequest, ReputationUpdate,
    ReviewContent, ReviewFilter, SessionReview,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    experts: HashMap<Uuid, ExpertDetails>,
    reviews: HashMap<Uuid, SessionReview>,
    notifications: Vec<Notification>,
}

impl MemoryState {
    fn insert_review_at(
        &mut self,
        review: &NewReview,
        created_at: DateTime<Utc>,
    ) -> Result<SessionReview> {
        let duplicate = self.reviews.values().any(|existing| {
            existing.reviewer_id == review.reviewer_id && existing.expert_id == review.expert_id
        });
        if duplicate {
            return Err(DatabaseError::IntegrityError(format!(
                "review by {} for expert {} already exists",
                review.reviewer_id, review.expert_id
            )));
        }
        if !self.experts.contains_key(&review.expert_id) {
            return Err(DatabaseError::IntegrityError(format!(
                "expert {} does not exist",
                review.expert_id
            )));
        }

        let stored = SessionReview {
            id: Uuid::new_v4(),
            expert_id: review.expert_id,
            reviewer_id: review.reviewer_id,
            session_id: review.session_id.clone(),
            rating: review.content.rating,
            satisfaction: review.content.satisfaction,
            remarks: review.content.remarks.clone(),
            created_at,
            updated_at: created_at,
        };
        self.reviews.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[derive(Clone, Default)]
pub struct MemoryReputationStore {
    state: Arc<Mutex<MemoryState>>,
    fail_notifications: Arc<AtomicBool>,
    fail_reputation_updates: Arc<AtomicBool>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryReputationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_expert(&self, expert: ExpertDetails) {
        self.state.lock().await.experts.insert(expert.id, expert);
    }

    /// Insert a review directly with a chosen creation time, bypassing
    /// the review operations and the recompute.
    pub async fn seed_review(
        &self,
        review: NewReview,
        created_at: DateTime<Utc>,
    ) -> Result<SessionReview> {
        self.state.lock().await.insert_review_at(&review, created_at)
    }

    pub async fn expert(&self, expert_id: Uuid) -> Option<ExpertDetails> {
        self.state.lock().await.experts.get(&expert_id).cloned()
    }

    pub async fn reviews_for(&self, expert_id: Uuid) -> Vec<SessionReview> {
        let state = self.state.lock().await;
        let mut reviews: Vec<_> = state
            .reviews
            .values()
            .filter(|review| review.expert_id == expert_id)
            .cloned()
            .collect();
        reviews.sort_by_key(|review| review.created_at);
        reviews
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.clone()
    }

    /// Make every notification insert fail until reset
    pub fn set_fail_notifications(&self, fail: bool) {
        self.fail_notifications.store(fail, Ordering::SeqCst);
    }

    /// Make every reputation write fail until reset
    pub fn set_fail_reputation_updates(&self, fail: bool) {
        self.fail_reputation_updates.store(fail, Ordering::SeqCst);
    }

    /// Make health pings fail until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_reputation_updates: bool,
}

#[async_trait]
impl ReputationStore for MemoryReputationStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx {
            guard,
            staged,
            fail_reputation_updates: self.fail_reputation_updates.load(Ordering::SeqCst),
        })
    }

    async fn find_expert(&self, expert_id: Uuid) -> Result<Option<ExpertDetails>> {
        Ok(self.expert(expert_id).await)
    }

    async fn list_reviews_page(
        &self,
        filter: ReviewFilter,
        page: PageRequest,
    ) -> Result<(Vec<SessionReview>, i64)> {
        let state = self.state.lock().await;
        let mut matching: Vec<&SessionReview> = state
            .reviews
            .values()
            .filter(|review| match filter {
                ReviewFilter::Expert(id) => review.expert_id == id,
                ReviewFilter::Reviewer(id) => review.reviewer_id == id,
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let reviews = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok((reviews, total))
    }

    async fn ping(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionError("store unavailable".to_string()));
        }
        Ok(())
    }

    async fn create_notification(&self, notification: &NewNotification) -> Result<()> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionError(
                "notification sink unavailable".to_string(),
            ));
        }

        self.state.lock().await.notifications.push(Notification {
            id: Uuid::new_v4(),
            kind: notification.kind,
            content: notification.content.clone(),
            recipient_id: notification.recipient_id,
            sender_id: notification.sender_id,
            is_read: false,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl ReputationTx for MemoryTx {
    async fn lock_expert(&mut self, expert_id: Uuid) -> Result<Option<ExpertDetails>> {
        Ok(self.staged.experts.get(&expert_id).cloned())
    }

    async fn lock_expert_by_user(&mut self, user_id: Uuid) -> Result<Option<ExpertDetails>> {
        Ok(self
            .staged
            .experts
            .values()
            .find(|expert| expert.user_id == user_id)
            .cloned())
    }

    async fn find_review(&mut self, review_id: Uuid) -> Result<Option<SessionReview>> {
        Ok(self.staged.reviews.get(&review_id).cloned())
    }

    async fn find_review_by_pair(
        &mut self,
        reviewer_id: Uuid,
        expert_id: Uuid,
    ) -> Result<Option<SessionReview>> {
        Ok(self
            .staged
            .reviews
            .values()
            .find(|review| review.reviewer_id == reviewer_id && review.expert_id == expert_id)
            .cloned())
    }

    async fn insert_review(&mut self, review: &NewReview) -> Result<SessionReview> {
        self.staged.insert_review_at(review, Utc::now())
    }

    async fn update_review(
        &mut self,
        review_id: Uuid,
        session_id: Option<&str>,
        content: &ReviewContent,
    ) -> Result<SessionReview> {
        let review = self
            .staged
            .reviews
            .get_mut(&review_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("review {}", review_id)))?;

        if let Some(session_id) = session_id {
            review.session_id = Some(session_id.to_string());
        }
        review.rating = content.rating;
        review.satisfaction = content.satisfaction;
        review.remarks = content.remarks.clone();
        review.updated_at = Utc::now();
        Ok(review.clone())
    }

    async fn delete_review(&mut self, review_id: Uuid) -> Result<bool> {
        Ok(self.staged.reviews.remove(&review_id).is_some())
    }

    async fn list_reviews(&mut self, expert_id: Uuid) -> Result<Vec<SessionReview>> {
        Ok(self
            .staged
            .reviews
            .values()
            .filter(|review| review.expert_id == expert_id)
            .cloned()
            .collect())
    }

    async fn count_recent_reviews(&mut self, expert_id: Uuid, window_days: i32) -> Result<i64> {
        let since = Utc::now() - Duration::days(window_days.into());
        Ok(self
            .staged
            .reviews
            .values()
            .filter(|review| review.expert_id == expert_id && review.created_at >= since)
            .count() as i64)
    }

    async fn update_expert_reputation(
        &mut self,
        expert_id: Uuid,
        update: &ReputationUpdate,
    ) -> Result<()> {
        if self.fail_reputation_updates {
            return Err(DatabaseError::ConnectionError(
                "reputation write failed".to_string(),
            ));
        }

        let expert = self
            .staged
            .experts
            .get_mut(&expert_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("expert {}", expert_id)))?;
        expert.ratings = update.ratings;
        expert.progress_level = update.progress_level;
        expert.badges = update.badges.clone();
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let MemoryTx {
            mut guard, staged, ..
        } = self;
        *guard = staged;
        Ok(())
    }
}
