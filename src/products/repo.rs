use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

pub const PRODUCT_COLUMNS: &str =
    "id, seller_id, category_id, name, description, price, currency, price_in_uyu, stock, \
     location, condition, views, active_offer, offer_price, offer_price_in_uyu, \
     start_offer_date, end_offer_date, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "currency", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Uyu,
    Usd,
}

#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: Currency,
    /// Materialized UYU price; equals `price` for UYU products, otherwise the
    /// conversion applied at creation/update time.
    pub price_in_uyu: Decimal,
    pub stock: i32,
    pub location: String,
    pub condition: String,
    pub views: i64,
    pub active_offer: bool,
    pub offer_price: Option<Decimal>,
    pub offer_price_in_uyu: Option<Decimal>,
    pub start_offer_date: Option<OffsetDateTime>,
    pub end_offer_date: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Product {
    /// UYU price a buyer pays right now, offer included when one is live.
    pub fn effective_price_in_uyu(&self) -> Decimal {
        if self.active_offer {
            self.offer_price_in_uyu.unwrap_or(self.price_in_uyu)
        } else {
            self.price_in_uyu
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPhoto {
    pub id: Uuid,
    pub product_id: Uuid,
    pub photo_id: String,
    pub url: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

pub struct NewProduct<'a> {
    pub seller_id: Uuid,
    pub category_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
    pub currency: Currency,
    pub price_in_uyu: Decimal,
    pub stock: i32,
    pub location: &'a str,
    pub condition: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductOrder {
    #[serde(rename = "lowerprice")]
    LowerPrice,
    #[serde(rename = "higherprice")]
    HigherPrice,
    #[serde(rename = "mostrelevant")]
    MostRelevant,
}

#[derive(Debug, Default)]
pub struct ProductFilter {
    pub location: Option<String>,
    pub condition: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub order: Option<ProductOrder>,
}

fn apply_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ProductFilter) {
    let mut sep = " WHERE ";
    if let Some(location) = &filter.location {
        qb.push(sep)
            .push("location ILIKE ")
            .push_bind(format!("%{location}%"));
        sep = " AND ";
    }
    if let Some(condition) = &filter.condition {
        qb.push(sep).push("condition = ").push_bind(condition);
        sep = " AND ";
    }
    if let Some(min_price) = filter.min_price {
        qb.push(sep).push("price >= ").push_bind(min_price);
        sep = " AND ";
    }
    if let Some(max_price) = filter.max_price {
        qb.push(sep).push("price <= ").push_bind(max_price);
    }
}

pub async fn list_filtered(
    db: &PgPool,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Product>, i64)> {
    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM products");
    apply_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

    let mut qb = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
    apply_filters(&mut qb, filter);
    qb.push(match filter.order {
        Some(ProductOrder::LowerPrice) => " ORDER BY price_in_uyu ASC",
        Some(ProductOrder::HigherPrice) => " ORDER BY price_in_uyu DESC",
        Some(ProductOrder::MostRelevant) => " ORDER BY views DESC",
        None => " ORDER BY created_at DESC",
    });
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    let products = qb.build_query_as::<Product>().fetch_all(db).await?;

    Ok((products, total))
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

/// Product plus its photo rows inserted atomically; a failed photo insert
/// rolls the product back.
pub async fn create_with_photos(
    db: &PgPool,
    new_product: NewProduct<'_>,
    photos: &[crate::storage::StoredImage],
) -> anyhow::Result<(Product, Vec<ProductPhoto>)> {
    let mut tx = db.begin().await?;

    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products (seller_id, category_id, name, description, price, currency,
                              price_in_uyu, stock, location, condition)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {PRODUCT_COLUMNS}
        "#,
    ))
    .bind(new_product.seller_id)
    .bind(new_product.category_id)
    .bind(new_product.name)
    .bind(new_product.description)
    .bind(new_product.price)
    .bind(new_product.currency)
    .bind(new_product.price_in_uyu)
    .bind(new_product.stock)
    .bind(new_product.location)
    .bind(new_product.condition)
    .fetch_one(&mut *tx)
    .await?;

    let mut rows = Vec::with_capacity(photos.len());
    for photo in photos {
        let row = sqlx::query_as::<_, ProductPhoto>(
            r#"
            INSERT INTO product_photos (product_id, photo_id, url)
            VALUES ($1, $2, $3)
            RETURNING id, product_id, photo_id, url
            "#,
        )
        .bind(product.id)
        .bind(&photo.id)
        .bind(&photo.url)
        .fetch_one(&mut *tx)
        .await?;
        rows.push(row);
    }

    tx.commit().await?;
    Ok((product, rows))
}

pub async fn increment_views(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "UPDATE products SET views = views + 1 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

#[allow(clippy::too_many_arguments)]
pub async fn update_own(
    db: &PgPool,
    id: Uuid,
    seller_id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
    price: Option<Decimal>,
    currency: Option<Currency>,
    price_in_uyu: Option<Decimal>,
    stock: Option<i32>,
    location: Option<&str>,
    condition: Option<&str>,
    category_id: Option<Uuid>,
) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            price = COALESCE($5, price),
            currency = COALESCE($6, currency),
            price_in_uyu = COALESCE($7, price_in_uyu),
            stock = COALESCE($8, stock),
            location = COALESCE($9, location),
            condition = COALESCE($10, condition),
            category_id = COALESCE($11, category_id),
            updated_at = now()
        WHERE id = $1 AND seller_id = $2
        RETURNING {PRODUCT_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(seller_id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(currency)
    .bind(price_in_uyu)
    .bind(stock)
    .bind(location)
    .bind(condition)
    .bind(category_id)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Stores the offer window. `active_offer` stays false: the sweep flips it
/// once the window opens, keeping the invariant in one place.
pub async fn set_offer(
    db: &PgPool,
    id: Uuid,
    offer_price: Decimal,
    offer_price_in_uyu: Decimal,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            active_offer = FALSE,
            offer_price = $2,
            offer_price_in_uyu = $3,
            start_offer_date = $4,
            end_offer_date = $5,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(offer_price)
    .bind(offer_price_in_uyu)
    .bind(start)
    .bind(end)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

// ---- photos ----

pub async fn list_photos(db: &PgPool, product_id: Uuid) -> anyhow::Result<Vec<ProductPhoto>> {
    let photos = sqlx::query_as::<_, ProductPhoto>(
        "SELECT id, product_id, photo_id, url FROM product_photos WHERE product_id = $1 ORDER BY id",
    )
    .bind(product_id)
    .fetch_all(db)
    .await?;
    Ok(photos)
}

pub async fn list_photos_for_products(
    db: &PgPool,
    product_ids: &[Uuid],
) -> anyhow::Result<Vec<ProductPhoto>> {
    let photos = sqlx::query_as::<_, ProductPhoto>(
        "SELECT id, product_id, photo_id, url FROM product_photos WHERE product_id = ANY($1)",
    )
    .bind(product_ids)
    .fetch_all(db)
    .await?;
    Ok(photos)
}

pub async fn find_photo(
    db: &PgPool,
    product_id: Uuid,
    photo_id: &str,
) -> anyhow::Result<Option<ProductPhoto>> {
    let photo = sqlx::query_as::<_, ProductPhoto>(
        "SELECT id, product_id, photo_id, url FROM product_photos WHERE product_id = $1 AND photo_id = $2",
    )
    .bind(product_id)
    .bind(photo_id)
    .fetch_optional(db)
    .await?;
    Ok(photo)
}

pub async fn replace_photo(
    db: &PgPool,
    row_id: Uuid,
    photo_id: &str,
    url: &str,
) -> anyhow::Result<Option<ProductPhoto>> {
    let photo = sqlx::query_as::<_, ProductPhoto>(
        r#"
        UPDATE product_photos SET photo_id = $2, url = $3
        WHERE id = $1
        RETURNING id, product_id, photo_id, url
        "#,
    )
    .bind(row_id)
    .bind(photo_id)
    .bind(url)
    .fetch_optional(db)
    .await?;
    Ok(photo)
}

// ---- categories ----

pub async fn find_category(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(category)
}

pub async fn find_category_by_name(db: &PgPool, name: &str) -> anyhow::Result<Option<Category>> {
    let category =
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(db)
            .await?;
    Ok(category)
}

pub async fn find_categories(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Category>> {
    let categories =
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(db)
            .await?;
    Ok(categories)
}
