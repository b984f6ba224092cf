use sqlx::PgPool;
use tracing::info;

use crate::db::errors::Result;
use crate::models::NewNotification;

pub async fn insert_notification(pool: &PgPool, notification: &NewNotification) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (type, content, recipient_id, sender_id)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(notification.kind.as_str())
    .bind(&notification.content)
    .bind(notification.recipient_id)
    .bind(notification.sender_id)
    .execute(pool)
    .await?;

    info!(
        recipient_id = %notification.recipient_id,
        kind = notification.kind.as_str(),
        "Created notification"
    );
    Ok(())
}
