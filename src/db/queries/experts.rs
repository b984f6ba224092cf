use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::errors::{DatabaseError, Result};
use crate::models::translation::badge_tags;
use crate::models::{ExpertDetails, ExpertDetailsRow, ReputationUpdate};

const EXPERT_COLUMNS: &str = "id, user_id, ratings, progress_level, badges, expertise";

/// Load an expert without taking a lock
#[tracing::instrument(skip(pool))]
pub async fn find_expert(pool: &PgPool, expert_id: Uuid) -> Result<Option<ExpertDetails>> {
    let row = sqlx::query_as::<_, ExpertDetailsRow>(&format!(
        "SELECT {EXPERT_COLUMNS} FROM expert_details WHERE id = $1"
    ))
    .bind(expert_id)
    .fetch_optional(pool)
    .await?;

    row.map(ExpertDetails::try_from).transpose().map_err(DatabaseError::from)
}

/// Load an expert and hold its row lock until the transaction ends
pub async fn lock_expert(
    tx: &mut Transaction<'_, Postgres>,
    expert_id: Uuid,
) -> Result<Option<ExpertDetails>> {
    debug!(%expert_id, "Locking expert row");

    let row = sqlx::query_as::<_, ExpertDetailsRow>(&format!(
        "SELECT {EXPERT_COLUMNS} FROM expert_details WHERE id = $1 FOR UPDATE"
    ))
    .bind(expert_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(ExpertDetails::try_from).transpose().map_err(DatabaseError::from)
}

/// Same as [`lock_expert`], addressed by the owning user
pub async fn lock_expert_by_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Option<ExpertDetails>> {
    debug!(%user_id, "Locking expert row by user");

    let row = sqlx::query_as::<_, ExpertDetailsRow>(&format!(
        "SELECT {EXPERT_COLUMNS} FROM expert_details WHERE user_id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(ExpertDetails::try_from).transpose().map_err(DatabaseError::from)
}

/// Write rating, progress level and badges in one statement
pub async fn update_expert_reputation(
    tx: &mut Transaction<'_, Postgres>,
    expert_id: Uuid,
    update: &ReputationUpdate,
) -> Result<()> {
    let badges = badge_tags(&update.badges);

    let result = sqlx::query(
        r#"
        UPDATE expert_details
        SET ratings = $2,
            progress_level = $3,
            badges = $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(expert_id)
    .bind(update.ratings)
    .bind(update.progress_level.as_str())
    .bind(&badges[..])
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("expert {}", expert_id)));
    }

    info!(
        %expert_id,
        ratings = %update.ratings,
        progress_level = %update.progress_level,
        badge_count = badges.len(),
        "Updated expert reputation"
    );
    Ok(())
}
