use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// expert_details table (reputation columns only)
#[derive(Debug, Clone, FromRow)]
pub struct ExpertDetailsRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ratings: Decimal,
    pub progress_level: String,
    pub badges: Vec<String>,
    pub expertise: Vec<String>,
}

/// session_reviews table
#[derive(Debug, Clone, FromRow)]
pub struct SessionReviewRow {
    pub id: Uuid,
    pub expert_id: Uuid,
    pub reviewer_id: Uuid,
    pub session_id: Option<String>,
    pub rating: i32,
    pub satisfaction: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review row joined with the window total (`COUNT(*) OVER ()`) for paging
#[derive(Debug, Clone, FromRow)]
pub struct PagedReviewRow {
    #[sqlx(flatten)]
    pub review: SessionReviewRow,
    pub total_count: i64,
}
