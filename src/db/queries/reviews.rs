use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::errors::{DatabaseError, Result};
use crate::models::{
    NewReview, PageRequest, PagedReviewRow, ReviewContent, ReviewFilter, SessionReview,
    SessionReviewRow,
};

const REVIEW_COLUMNS: &str = "id, expert_id, reviewer_id, session_id, rating, satisfaction, \
                              remarks, created_at, updated_at";

fn into_reviews(rows: Vec<SessionReviewRow>) -> Result<Vec<SessionReview>> {
    rows.into_iter()
        .map(|row| SessionReview::try_from(row).map_err(DatabaseError::from))
        .collect()
}

pub async fn find_review(
    tx: &mut Transaction<'_, Postgres>,
    review_id: Uuid,
) -> Result<Option<SessionReview>> {
    let row = sqlx::query_as::<_, SessionReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM session_reviews WHERE id = $1"
    ))
    .bind(review_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(SessionReview::try_from).transpose().map_err(DatabaseError::from)
}

pub async fn find_review_by_pair(
    tx: &mut Transaction<'_, Postgres>,
    reviewer_id: Uuid,
    expert_id: Uuid,
) -> Result<Option<SessionReview>> {
    let row = sqlx::query_as::<_, SessionReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM session_reviews WHERE reviewer_id = $1 AND expert_id = $2"
    ))
    .bind(reviewer_id)
    .bind(expert_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(SessionReview::try_from).transpose().map_err(DatabaseError::from)
}

/// Insert a new review. A concurrent insert for the same (reviewer, expert)
/// pair surfaces as `IntegrityError` so the caller can retry as an update.
pub async fn insert_review(
    tx: &mut Transaction<'_, Postgres>,
    review: &NewReview,
) -> Result<SessionReview> {
    let result = sqlx::query_as::<_, SessionReviewRow>(&format!(
        r#"
        INSERT INTO session_reviews
            (expert_id, reviewer_id, session_id, rating, satisfaction, remarks)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {REVIEW_COLUMNS}
        "#
    ))
    .bind(review.expert_id)
    .bind(review.reviewer_id)
    .bind(review.session_id.as_deref())
    .bind(review.content.rating)
    .bind(review.content.satisfaction.as_str())
    .bind(review.content.remarks.as_deref())
    .fetch_one(&mut **tx)
    .await;

    let row = match result {
        Ok(row) => row,
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                if db_err.code().as_deref() == Some("23505") {
                    return Err(DatabaseError::IntegrityError(format!(
                        "review by {} for expert {} already exists",
                        review.reviewer_id, review.expert_id
                    )));
                }
            }
            return Err(DatabaseError::QueryError(e));
        }
    };

    info!(
        review_id = %row.id,
        expert_id = %review.expert_id,
        rating = review.content.rating,
        "Inserted review"
    );
    SessionReview::try_from(row).map_err(DatabaseError::from)
}

pub async fn update_review(
    tx: &mut Transaction<'_, Postgres>,
    review_id: Uuid,
    session_id: Option<&str>,
    content: &ReviewContent,
) -> Result<SessionReview> {
    let row = sqlx::query_as::<_, SessionReviewRow>(&format!(
        r#"
        UPDATE session_reviews
        SET session_id = COALESCE($2, session_id),
            rating = $3,
            satisfaction = $4,
            remarks = $5,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {REVIEW_COLUMNS}
        "#
    ))
    .bind(review_id)
    .bind(session_id)
    .bind(content.rating)
    .bind(content.satisfaction.as_str())
    .bind(content.remarks.as_deref())
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| DatabaseError::NotFound(format!("review {}", review_id)))?;

    debug!(%review_id, rating = content.rating, "Updated review");
    SessionReview::try_from(row).map_err(DatabaseError::from)
}

pub async fn delete_review(tx: &mut Transaction<'_, Postgres>, review_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM session_reviews WHERE id = $1")
        .bind(review_id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Every review of an expert, as seen by the current transaction
pub async fn list_reviews_for_expert(
    tx: &mut Transaction<'_, Postgres>,
    expert_id: Uuid,
) -> Result<Vec<SessionReview>> {
    let rows = sqlx::query_as::<_, SessionReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM session_reviews WHERE expert_id = $1"
    ))
    .bind(expert_id)
    .fetch_all(&mut **tx)
    .await?;

    into_reviews(rows)
}

/// Window start is computed from `NOW()`, the same clock that stamps `created_at`
pub async fn count_recent_reviews(
    tx: &mut Transaction<'_, Postgres>,
    expert_id: Uuid,
    window_days: i32,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM session_reviews
        WHERE expert_id = $1 AND created_at >= NOW() - make_interval(days => $2)
        "#,
    )
    .bind(expert_id)
    .bind(window_days)
    .fetch_one(&mut **tx)
    .await?;

    Ok(count)
}

/// Newest-first page of reviews with the total matching row count
#[tracing::instrument(skip(pool))]
pub async fn list_reviews_page(
    pool: &PgPool,
    filter: ReviewFilter,
    page: PageRequest,
) -> Result<(Vec<SessionReview>, i64)> {
    let (column, id) = match filter {
        ReviewFilter::Expert(id) => ("expert_id", id),
        ReviewFilter::Reviewer(id) => ("reviewer_id", id),
    };

    let rows = sqlx::query_as::<_, PagedReviewRow>(&format!(
        r#"
        SELECT {REVIEW_COLUMNS}, COUNT(*) OVER () AS total_count
        FROM session_reviews
        WHERE {column} = $1
        ORDER BY created_at DESC, id
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    // An offset past the end yields no rows, so the window total is lost
    let total = match rows.first() {
        Some(row) => row.total_count,
        None if page.page > 1 => {
            sqlx::query_scalar::<_, i64>(&format!(
                "SELECT COUNT(*) FROM session_reviews WHERE {column} = $1"
            ))
            .bind(id)
            .fetch_one(pool)
            .await?
        }
        None => 0,
    };

    let reviews = into_reviews(rows.into_iter().map(|row| row.review).collect())?;
    Ok((reviews, total))
}
