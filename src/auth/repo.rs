use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo::{User, USER_COLUMNS};

/// Loads the user only when id, email and the raw refresh token all match the
/// stored row. A revoked or rotated token matches nothing.
pub async fn find_session(
    db: &PgPool,
    user_id: Uuid,
    email: &str,
    refresh_token: &str,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE id = $1 AND email = $2 AND refresh_token = $3
        "#,
    ))
    .bind(user_id)
    .bind(email)
    .bind(refresh_token)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Overwrites the stored refresh token, implicitly revoking the prior
/// session (single-slot session model).
pub async fn store_refresh_token(db: &PgPool, user_id: Uuid, token: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET refresh_token = $2 WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(token)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Rotation-on-use: a single conditional update keyed on the old value, so
/// two concurrent refreshes with the same token can only rotate once.
pub async fn rotate_refresh_token(
    db: &PgPool,
    user_id: Uuid,
    old_token: &str,
    new_token: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET refresh_token = $3
        WHERE id = $1 AND refresh_token = $2
        "#,
    )
    .bind(user_id)
    .bind(old_token)
    .bind(new_token)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Clearing the slot invalidates every outstanding refresh token at once.
pub async fn clear_refresh_token(db: &PgPool, user_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET refresh_token = NULL WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
