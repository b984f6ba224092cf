use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BadgeSet, PageRequest, ProgressLevel, SessionReview};

/// Body of `POST /reviews/expert/{expertUserId}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewPayload {
    pub session_id: Option<String>,
    pub rating: i32,
    pub satisfaction: String,
    pub remarks: Option<String>,
}

/// Body of `PATCH /reviews/{reviewId}` - absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewPayload {
    pub rating: Option<i32>,
    pub satisfaction: Option<String>,
    pub remarks: Option<String>,
}

/// `?page=&limit=` on list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(params.page, params.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewData {
    pub review: SessionReview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: PageRequest, total: i64) -> Self {
        let total_pages = (total + page.limit - 1) / page.limit;
        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages,
            has_next_page: page.page < total_pages,
            has_prev_page: page.page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub status: &'static str,
    pub data: T,
    pub pagination: Pagination,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: T, page: PageRequest, total: i64) -> Self {
        Self {
            status: "success",
            data,
            pagination: Pagination::new(page, total),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertReviewsData {
    pub reviews: Vec<SessionReview>,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_rating: Decimal,
    pub progress_level: ProgressLevel,
    pub badges: BadgeSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserReviewsData {
    pub reviews: Vec<SessionReview>,
}
