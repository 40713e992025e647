use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    history::dto::{HistoryEntry, HistoryPage},
    products::dto::ProductSummary,
    products::repo::{Product, PRODUCT_COLUMNS},
};

#[derive(FromRow)]
struct HistoryRow {
    #[sqlx(flatten)]
    product: Product,
    viewed_at: OffsetDateTime,
}

fn prefixed_columns() -> String {
    PRODUCT_COLUMNS
        .split(", ")
        .map(|c| format!("p.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Repeat views refresh the timestamp instead of stacking rows.
pub async fn record(db: &PgPool, user_id: Uuid, product_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO product_history (user_id, product_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, product_id) DO UPDATE SET viewed_at = now()
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn page_for_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<HistoryPage> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_history WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await?;

    let rows = sqlx::query_as::<_, HistoryRow>(&format!(
        r#"
        SELECT {columns}, h.viewed_at
        FROM product_history h
        JOIN products p ON p.id = h.product_id
        WHERE h.user_id = $1
        ORDER BY h.viewed_at DESC
        LIMIT $2 OFFSET $3
        "#,
        columns = prefixed_columns(),
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(HistoryPage {
        history: rows
            .iter()
            .map(|row| HistoryEntry {
                product: ProductSummary::from(&row.product),
                viewed_at: row.viewed_at,
            })
            .collect(),
        total_results: total,
        total_pages: (total + limit - 1) / limit,
        current_page: offset / limit + 1,
    })
}

/// Products sharing a category with the caller's ten most recent views,
/// minus those views themselves.
pub async fn recommendations_for_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        r#"
        WITH recent AS (
            SELECT product_id
            FROM product_history
            WHERE user_id = $1
            ORDER BY viewed_at DESC
            LIMIT 10
        )
        SELECT {columns}
        FROM products p
        WHERE p.category_id IN (
            SELECT p2.category_id FROM products p2
            JOIN recent r ON p2.id = r.product_id
        )
        AND p.id NOT IN (SELECT product_id FROM recent)
        ORDER BY p.views DESC
        LIMIT $2
        "#,
        columns = prefixed_columns(),
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(products)
}
