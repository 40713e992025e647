use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const REVIEW_COLUMNS: &str =
    "id, user_id, seller_id, rating, comment, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub seller_id: Uuid,
    /// Half-star ratings are allowed, so this is NUMERIC(2,1).
    pub rating: Decimal,
    pub comment: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Review plus the author fields shown alongside it.
#[derive(Debug, FromRow)]
pub struct ReviewWithAuthor {
    #[sqlx(flatten)]
    pub review: Review,
    pub author_username: String,
    pub author_email: String,
    pub author_avatar: Option<String>,
}

fn with_author_query(filter: &str) -> String {
    let columns = REVIEW_COLUMNS
        .split(", ")
        .map(|c| format!("r.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
        SELECT {columns},
               u.username AS author_username,
               u.email AS author_email,
               u.avatar_photo AS author_avatar
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        {filter}
        ORDER BY r.created_at DESC
        "#,
    )
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    seller_id: Uuid,
    rating: Decimal,
    comment: Option<&str>,
) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>(&format!(
        r#"
        INSERT INTO reviews (user_id, seller_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING {REVIEW_COLUMNS}
        "#,
    ))
    .bind(user_id)
    .bind(seller_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Review>> {
    let review = sqlx::query_as::<_, Review>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(review)
}

pub async fn find_with_author(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ReviewWithAuthor>> {
    let review = sqlx::query_as::<_, ReviewWithAuthor>(&with_author_query("WHERE r.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(review)
}

pub async fn list(db: &PgPool, seller_id: Option<Uuid>) -> anyhow::Result<Vec<ReviewWithAuthor>> {
    let reviews = match seller_id {
        Some(seller_id) => {
            sqlx::query_as::<_, ReviewWithAuthor>(&with_author_query("WHERE r.seller_id = $1"))
                .bind(seller_id)
                .fetch_all(db)
                .await?
        }
        None => {
            sqlx::query_as::<_, ReviewWithAuthor>(&with_author_query(""))
                .fetch_all(db)
                .await?
        }
    };
    Ok(reviews)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    rating: Option<Decimal>,
    comment: Option<&str>,
) -> anyhow::Result<Option<Review>> {
    let review = sqlx::query_as::<_, Review>(&format!(
        r#"
        UPDATE reviews SET
            rating = COALESCE($2, rating),
            comment = COALESCE($3, comment),
            updated_at = now()
        WHERE id = $1
        RETURNING {REVIEW_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(rating)
    .bind(comment)
    .fetch_optional(db)
    .await?;
    Ok(review)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
