use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const SELLER_COLUMNS: &str =
    "id, user_id, department, city, address, floor_or_apartment, phone_number, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct Seller {
    pub id: Uuid,
    pub user_id: Uuid,
    pub department: String,
    pub city: String,
    pub address: String,
    pub floor_or_apartment: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    department: &str,
    city: &str,
    address: &str,
    floor_or_apartment: Option<&str>,
    phone_number: Option<&str>,
) -> Result<Seller, sqlx::Error> {
    sqlx::query_as::<_, Seller>(&format!(
        r#"
        INSERT INTO sellers (user_id, department, city, address, floor_or_apartment, phone_number)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {SELLER_COLUMNS}
        "#,
    ))
    .bind(user_id)
    .bind(department)
    .bind(city)
    .bind(address)
    .bind(floor_or_apartment)
    .bind(phone_number)
    .fetch_one(db)
    .await
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Seller>> {
    let sellers = sqlx::query_as::<_, Seller>(&format!(
        "SELECT {SELLER_COLUMNS} FROM sellers ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(sellers)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Seller>> {
    let seller = sqlx::query_as::<_, Seller>(&format!(
        "SELECT {SELLER_COLUMNS} FROM sellers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(seller)
}

pub async fn find_by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Seller>> {
    let sellers = sqlx::query_as::<_, Seller>(&format!(
        "SELECT {SELLER_COLUMNS} FROM sellers WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(db)
    .await?;
    Ok(sellers)
}

pub async fn find_by_user_id(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Seller>> {
    let seller = sqlx::query_as::<_, Seller>(&format!(
        "SELECT {SELLER_COLUMNS} FROM sellers WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(seller)
}

pub async fn find_by_user_ids(db: &PgPool, user_ids: &[Uuid]) -> anyhow::Result<Vec<Seller>> {
    let sellers = sqlx::query_as::<_, Seller>(&format!(
        "SELECT {SELLER_COLUMNS} FROM sellers WHERE user_id = ANY($1)"
    ))
    .bind(user_ids)
    .fetch_all(db)
    .await?;
    Ok(sellers)
}

/// Deletes only when the seller belongs to the caller.
pub async fn delete_own(db: &PgPool, seller_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM sellers WHERE id = $1 AND user_id = $2")
        .bind(seller_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
