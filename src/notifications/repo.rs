use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, text, created_at";

#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub text: String,
    pub created_at: OffsetDateTime,
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    kind: &str,
    text: &str,
) -> anyhow::Result<Notification> {
    let notification = sqlx::query_as::<_, Notification>(&format!(
        r#"
        INSERT INTO notifications (user_id, kind, text)
        VALUES ($1, $2, $3)
        RETURNING {NOTIFICATION_COLUMNS}
        "#,
    ))
    .bind(user_id)
    .bind(kind)
    .bind(text)
    .fetch_one(db)
    .await?;
    Ok(notification)
}

pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Notification>> {
    let notifications = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(notifications)
}

pub async fn delete_own(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
