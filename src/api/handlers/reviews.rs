// Review handlers - every route requires a bearer JWT

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::server::AppState;
use crate::db::ReputationStore;
use crate::models::{
    ExpertReviewsData, MessageResponse, PageParams, PaginatedResponse, ReviewData,
    SubmitReviewPayload, SuccessResponse, UpdateReviewPayload, UserReviewsData,
};

/// Create or overwrite the caller's review of an expert
#[tracing::instrument(skip(state, headers, expert_user_id, payload))]
pub async fn submit_review_handler<S: ReputationStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    expert_user_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SubmitReviewPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<ReviewData>>)> {
    let reviewer_id = state.auth.authenticate(&headers)?;
    let Path(expert_user_id) = expert_user_id?;
    let Json(payload) = payload?;

    info!(%reviewer_id, %expert_user_id, "Processing review submission");

    let mutation = state
        .reviews
        .submit_or_update_review(reviewer_id, expert_user_id, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new(ReviewData {
            review: mutation.review,
        })),
    ))
}

/// Update rating, satisfaction or remarks of the caller's own review
#[tracing::instrument(skip(state, headers, review_id, payload))]
pub async fn update_review_handler<S: ReputationStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    review_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateReviewPayload>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse<ReviewData>>> {
    let requester_id = state.auth.authenticate(&headers)?;
    let Path(review_id) = review_id?;
    let Json(payload) = payload?;

    info!(%requester_id, %review_id, "Processing review update");

    let mutation = state
        .reviews
        .update_review(review_id, requester_id, payload)
        .await?;

    Ok(Json(SuccessResponse::new(ReviewData {
        review: mutation.review,
    })))
}

#[tracing::instrument(skip(state, headers, review_id))]
pub async fn delete_review_handler<S: ReputationStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    review_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let requester_id = state.auth.authenticate(&headers)?;
    let Path(review_id) = review_id?;

    info!(%requester_id, %review_id, "Processing review deletion");

    state.reviews.delete_review(review_id, requester_id).await?;

    Ok(Json(MessageResponse::success("Review deleted successfully")))
}

/// Paginated reviews of an expert with the expert's current reputation
#[tracing::instrument(skip(state, headers, expert_id, params))]
pub async fn expert_reviews_handler<S: ReputationStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    expert_id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<PaginatedResponse<ExpertReviewsData>>> {
    state.auth.authenticate(&headers)?;
    let Path(expert_id) = expert_id?;
    let Query(params) = params?;

    let page = state
        .reviews
        .get_expert_reviews(expert_id, params.into())
        .await?;

    let data = ExpertReviewsData {
        reviews: page.reviews.reviews,
        average_rating: page.expert.ratings,
        progress_level: page.expert.progress_level,
        badges: page.expert.badges,
    };
    Ok(Json(PaginatedResponse::new(
        data,
        page.reviews.page,
        page.reviews.total,
    )))
}

/// Paginated reviews written by the caller
#[tracing::instrument(skip(state, headers, params))]
pub async fn user_reviews_handler<S: ReputationStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<PaginatedResponse<UserReviewsData>>> {
    let reviewer_id = state.auth.authenticate(&headers)?;
    let Query(params) = params?;

    let page = state
        .reviews
        .get_user_reviews(reviewer_id, params.into())
        .await?;

    Ok(Json(PaginatedResponse::new(
        UserReviewsData {
            reviews: page.reviews,
        },
        page.page,
        page.total,
    )))
}
