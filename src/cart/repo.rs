use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::products::repo::{Product, PRODUCT_COLUMNS};

#[derive(Debug, Clone, FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(FromRow)]
pub struct CartLine {
    pub quantity: i32,
    #[sqlx(flatten)]
    pub product: Product,
}

pub async fn find_item(
    db: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
) -> anyhow::Result<Option<CartItem>> {
    let item = sqlx::query_as::<_, CartItem>(
        r#"
        SELECT id, user_id, product_id, quantity, created_at, updated_at
        FROM carts WHERE user_id = $1 AND product_id = $2
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<CartItem> {
    let item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO carts (user_id, product_id, quantity)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, product_id, quantity, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(db)
    .await?;
    Ok(item)
}

pub async fn set_quantity(
    db: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<Option<CartItem>> {
    let item = sqlx::query_as::<_, CartItem>(
        r#"
        UPDATE carts SET quantity = $3, updated_at = now()
        WHERE user_id = $1 AND product_id = $2
        RETURNING id, user_id, product_id, quantity, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

pub async fn remove(db: &PgPool, user_id: Uuid, product_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM carts WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
    let columns = PRODUCT_COLUMNS
        .split(", ")
        .map(|c| format!("p.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let lines = sqlx::query_as::<_, CartLine>(&format!(
        r#"
        SELECT c.quantity, {columns}
        FROM carts c
        JOIN products p ON p.id = c.product_id
        WHERE c.user_id = $1
        ORDER BY c.created_at DESC
        "#,
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(lines)
}
