use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

pub const USER_COLUMNS: &str = "id, username, first_name, last_name, birth_date, email, \
     password_hash, is_verified, verify_token, refresh_token, avatar_id, avatar_photo, \
     created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
    pub email: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub verify_token: Option<String>,
    pub refresh_token: Option<String>,
    pub avatar_id: Option<String>,
    pub avatar_photo: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub birth_date: Date,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub verify_token: &'a str,
    pub avatar_id: &'a str,
    pub avatar_photo: &'a str,
}

pub async fn create(db: &PgPool, new_user: NewUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, first_name, last_name, birth_date, email,
                           password_hash, is_verified, verify_token, avatar_id, avatar_photo)
        VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $8, $9)
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(new_user.username)
    .bind(new_user.first_name)
    .bind(new_user.last_name)
    .bind(new_user.birth_date)
    .bind(new_user.email)
    .bind(new_user.password_hash)
    .bind(new_user.verify_token)
    .bind(new_user.avatar_id)
    .bind(new_user.avatar_photo)
    .fetch_one(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_username_and_email(
    db: &PgPool,
    username: &str,
    email: &str,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND email = $2"
    ))
    .bind(username)
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_verify_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE verify_token = $1"
    ))
    .bind(token)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(users)
}

pub async fn update_basic(
    db: &PgPool,
    user_id: Uuid,
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    birth_date: Option<Date>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            username = COALESCE($2, username),
            first_name = COALESCE($3, first_name),
            last_name = COALESCE($4, last_name),
            birth_date = COALESCE($5, birth_date),
            updated_at = now()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(user_id)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(birth_date)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, user_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_avatar(
    db: &PgPool,
    user_id: Uuid,
    avatar_id: &str,
    avatar_photo: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET avatar_id = $2, avatar_photo = $3, updated_at = now() WHERE id = $1",
    )
    .bind(user_id)
    .bind(avatar_id)
    .bind(avatar_photo)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_verify_token(db: &PgPool, user_id: Uuid, token: &str) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE users SET verify_token = $2 WHERE id = $1")
        .bind(user_id)
        .bind(token)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear_verify_token(db: &PgPool, user_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE users SET verify_token = NULL WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_verified(db: &PgPool, user_id: Uuid) -> anyhow::Result<bool> {
    let result =
        sqlx::query("UPDATE users SET is_verified = TRUE, verify_token = NULL WHERE id = $1")
            .bind(user_id)
            .execute(db)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Applies only while the captured address still matches the row: a stale
/// link cannot revert a value the user already changed again.
pub async fn apply_email_change(
    db: &PgPool,
    username: &str,
    current_email: &str,
    new_email: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users SET email = $3, updated_at = now()
        WHERE username = $1 AND email = $2
        "#,
    )
    .bind(username)
    .bind(current_email)
    .bind(new_email)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Same optimistic guard keyed on the current password hash.
pub async fn apply_password_change(
    db: &PgPool,
    username: &str,
    current_password_hash: &str,
    new_password_hash: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET password_hash = $3, updated_at = now()
        WHERE username = $1 AND password_hash = $2
        "#,
    )
    .bind(username)
    .bind(current_password_hash)
    .bind(new_password_hash)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
