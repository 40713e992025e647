use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::products::repo::{Product, PRODUCT_COLUMNS};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn add(db: &PgPool, user_id: Uuid, product_id: Uuid) -> Result<Favorite, sqlx::Error> {
    sqlx::query_as::<_, Favorite>(
        r#"
        INSERT INTO favorites (user_id, product_id)
        VALUES ($1, $2)
        RETURNING id, user_id, product_id, created_at
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(db)
    .await
}

pub async fn remove(db: &PgPool, user_id: Uuid, product_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_products_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Product>> {
    let columns = PRODUCT_COLUMNS
        .split(", ")
        .map(|c| format!("p.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let products = sqlx::query_as::<_, Product>(&format!(
        r#"
        SELECT {columns}
        FROM favorites f
        JOIN products p ON p.id = f.product_id
        WHERE f.user_id = $1
        ORDER BY f.created_at DESC
        "#,
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(products)
}
