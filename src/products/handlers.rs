use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use bytes::Bytes;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{AuthUser, MaybeUser},
    error::ApiError,
    history,
    products::{
        dto::{
            ListProductsQuery, OfferRequest, PhotoReplacedResponse, ProductDetail, ProductPage,
            ProductSummary, UpdateProductRequest,
        },
        offers,
        repo::{self, Currency, NewProduct, Product, ProductFilter},
    },
    sellers,
    state::AppState,
    storage::{is_allowed_image, StoredImage, MAX_IMAGE_BYTES},
};

const MIN_PRODUCT_PHOTOS: usize = 5;
const MAX_PRODUCT_PHOTOS: usize = 40;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/products/:id/photos/:photo_id", patch(replace_photo))
        .route("/products/:id/offer", patch(create_offer))
        .layer(DefaultBodyLimit::max(
            (MAX_PRODUCT_PHOTOS + 1) * MAX_IMAGE_BYTES,
        ))
}

struct UploadedPhoto {
    body: Bytes,
    content_type: String,
}

/// Pulls the repeated image files under `file_field` plus the text fields
/// out of a multipart body.
async fn read_product_multipart(
    mut mp: Multipart,
    file_field: &str,
) -> Result<(Vec<UploadedPhoto>, Vec<(String, String)>), ApiError> {
    let mut photos = Vec::new();
    let mut texts = Vec::new();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == file_field {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            if !is_allowed_image(&content_type) {
                return Err(ApiError::Validation(
                    "Invalid file type. Only JPG and PNG are allowed".into(),
                ));
            }
            let body = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Malformed file field: {e}")))?;
            if body.len() > MAX_IMAGE_BYTES {
                return Err(ApiError::Validation("Image exceeds the 3MB limit".into()));
            }
            photos.push(UploadedPhoto { body, content_type });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(format!("Malformed field {name}: {e}")))?;
            texts.push((name, value));
        }
    }
    Ok((photos, texts))
}

fn take_field(texts: &[(String, String)], name: &str) -> Result<String, ApiError> {
    texts
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
        .ok_or_else(|| ApiError::Validation(format!("Missing field: {name}")))
}

fn parse_currency(s: &str) -> Result<Currency, ApiError> {
    match s {
        "UYU" => Ok(Currency::Uyu),
        "USD" => Ok(Currency::Usd),
        _ => Err(ApiError::Validation(
            "Invalid currency: expected UYU or USD".into(),
        )),
    }
}

async fn price_in_uyu(
    state: &AppState,
    price: Decimal,
    currency: Currency,
) -> Result<Decimal, ApiError> {
    match currency {
        Currency::Uyu => Ok(price.round_dp(2)),
        Currency::Usd => Ok(state.exchange.usd_to_uyu(price).await?),
    }
}

/// Loads the product's seller profile and checks that it belongs to the
/// caller.
async fn owned_product(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
) -> Result<Product, ApiError> {
    let seller = sellers::repo::find_by_user_id(&state.db, user_id)
        .await?
        .ok_or_else(|| {
            ApiError::Unauthorized("You must be a seller to manage products".into())
        })?;
    let product = repo::find_by_id(&state.db, product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    if product.seller_id != seller.id {
        return Err(ApiError::Unauthorized(
            "You do not own this product".into(),
        ));
    }
    Ok(product)
}

async fn load_detail(state: &AppState, product: Product) -> Result<ProductDetail, ApiError> {
    let category = repo::find_category(&state.db, product.category_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("category {} missing", product.category_id))?;
    let seller = sellers::repo::find_by_id(&state.db, product.seller_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("seller {} missing", product.seller_id))?;
    let photos = repo::list_photos(&state.db, product.id).await?;
    Ok(ProductDetail {
        product: ProductSummary::from(&product),
        category,
        seller: sellers::dto::SellerPublic::from(&seller),
        photos,
    })
}

/// Joins the batch-loaded photo, category and seller rows back onto their
/// products. A missing category or seller row means a broken reference and
/// comes back as an error, same as `load_detail`.
fn assemble_details(
    products: Vec<Product>,
    photos: &[repo::ProductPhoto],
    categories: &[repo::Category],
    sellers: &[crate::sellers::repo::Seller],
) -> anyhow::Result<Vec<ProductDetail>> {
    products
        .into_iter()
        .map(|product| {
            let category = categories
                .iter()
                .find(|c| c.id == product.category_id)
                .ok_or_else(|| anyhow::anyhow!("category {} missing", product.category_id))?;
            let seller = sellers
                .iter()
                .find(|s| s.id == product.seller_id)
                .ok_or_else(|| anyhow::anyhow!("seller {} missing", product.seller_id))?;
            Ok(ProductDetail {
                photos: photos
                    .iter()
                    .filter(|ph| ph.product_id == product.id)
                    .cloned()
                    .collect(),
                category: category.clone(),
                seller: seller.into(),
                product: ProductSummary::from(&product),
            })
        })
        .collect()
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<ProductPage>, ApiError> {
    let (Some(limit), Some(offset)) = (query.limit, query.offset) else {
        return Err(ApiError::Validation(
            "Limit and Offset must be numbers".into(),
        ));
    };
    if limit <= 0 || offset < 0 {
        return Err(ApiError::Validation("Invalid limit or offset".into()));
    }

    let filter = ProductFilter {
        location: query.location,
        condition: query.condition,
        min_price: query.min_price,
        max_price: query.max_price,
        order: query.order,
    };
    let (products, total) = repo::list_filtered(&state.db, &filter, limit, offset).await?;

    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let category_ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
    let seller_ids: Vec<Uuid> = products.iter().map(|p| p.seller_id).collect();

    let photos = repo::list_photos_for_products(&state.db, &product_ids).await?;
    let categories = repo::find_categories(&state.db, &category_ids).await?;
    let sellers = sellers::repo::find_by_ids(&state.db, &seller_ids).await?;

    let details = assemble_details(products, &photos, &categories, &sellers)?;

    Ok(Json(ProductPage {
        products: details,
        total_products: total,
        total_pages: (total + limit - 1) / limit,
        current_page: offset / limit + 1,
    }))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductDetail>, ApiError> {
    let product = repo::increment_views(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    if let Some(user_id) = viewer {
        // A failed history write must not break the product page.
        if let Err(e) = history::repo::record(&state.db, user_id, product.id).await {
            warn!(error = %e, user_id = %user_id, "could not record browsing history");
        }
    }

    let detail = load_detail(&state, product).await?;
    Ok(Json(detail))
}

#[instrument(skip(state, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<ProductDetail>), ApiError> {
    let seller = sellers::repo::find_by_user_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Must create your Seller profile".into()))?;

    let (photos, texts) = read_product_multipart(mp, "photos").await?;
    if photos.len() < MIN_PRODUCT_PHOTOS {
        return Err(ApiError::Validation(format!(
            "At least {MIN_PRODUCT_PHOTOS} photos are required"
        )));
    }
    if photos.len() > MAX_PRODUCT_PHOTOS {
        return Err(ApiError::Validation(format!(
            "At most {MAX_PRODUCT_PHOTOS} photos are allowed"
        )));
    }

    let name = take_field(&texts, "name")?;
    let description = texts
        .iter()
        .find(|(n, _)| n == "description")
        .map(|(_, v)| v.clone());
    let category_id: Uuid = take_field(&texts, "categoryId")?
        .parse()
        .map_err(|_| ApiError::Validation("Invalid categoryId".into()))?;
    let price: Decimal = take_field(&texts, "price")?
        .parse()
        .map_err(|_| ApiError::Validation("Invalid price".into()))?;
    let currency = parse_currency(&take_field(&texts, "currency")?)?;
    let stock: i32 = take_field(&texts, "stock")?
        .parse()
        .map_err(|_| ApiError::Validation("Invalid stock".into()))?;
    let location = take_field(&texts, "location")?;
    let condition = take_field(&texts, "condition")?;

    if price <= Decimal::ZERO {
        return Err(ApiError::Validation("Price must be greater than zero".into()));
    }
    if stock < 0 {
        return Err(ApiError::Validation("Stock cannot be negative".into()));
    }
    repo::find_category(&state.db, category_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;

    let uyu = price_in_uyu(&state, price, currency).await?;

    let mut stored: Vec<StoredImage> = Vec::with_capacity(photos.len());
    for photo in photos {
        match state.images.upload(photo.body, &photo.content_type).await {
            Ok(image) => stored.push(image),
            Err(e) => {
                cleanup_images(&state, &stored).await;
                return Err(e.into());
            }
        }
    }

    let created = repo::create_with_photos(
        &state.db,
        NewProduct {
            seller_id: seller.id,
            category_id,
            name: &name,
            description: description.as_deref(),
            price: price.round_dp(2),
            currency,
            price_in_uyu: uyu,
            stock,
            location: &location,
            condition: &condition,
        },
        &stored,
    )
    .await;

    let (product, photos) = match created {
        Ok(pair) => pair,
        Err(e) => {
            cleanup_images(&state, &stored).await;
            return Err(e.into());
        }
    };

    info!(product_id = %product.id, seller_id = %seller.id, "product created");
    let category = repo::find_category(&state.db, product.category_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("category {} missing", product.category_id))?;
    Ok((
        StatusCode::CREATED,
        Json(ProductDetail {
            product: ProductSummary::from(&product),
            category,
            seller: sellers::dto::SellerPublic::from(&seller),
            photos,
        }),
    ))
}

async fn cleanup_images(state: &AppState, stored: &[StoredImage]) {
    for image in stored {
        if let Err(e) = state.images.delete(&image.id).await {
            warn!(error = %e, image_id = %image.id, "could not delete orphaned photo");
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductDetail>, ApiError> {
    let product = owned_product(&state, user_id, id).await?;

    if let Some(price) = payload.price {
        if price <= Decimal::ZERO {
            return Err(ApiError::Validation("Price must be greater than zero".into()));
        }
    }
    if let Some(stock) = payload.stock {
        if stock < 0 {
            return Err(ApiError::Validation("Stock cannot be negative".into()));
        }
    }

    let category_id = match payload.new_category.as_deref() {
        Some(name) => Some(
            repo::find_category_by_name(&state.db, name)
                .await?
                .ok_or_else(|| ApiError::NotFound("Category not found".into()))?
                .id,
        ),
        None => None,
    };

    // Re-derive the UYU price whenever price or currency moves.
    let new_uyu = if payload.price.is_some() || payload.currency.is_some() {
        let price = payload.price.unwrap_or(product.price);
        let currency = payload.currency.unwrap_or(product.currency);
        Some(price_in_uyu(&state, price, currency).await?)
    } else {
        None
    };

    let updated = repo::update_own(
        &state.db,
        id,
        product.seller_id,
        payload.name.as_deref(),
        payload.description.as_deref(),
        payload.price.map(|p| p.round_dp(2)),
        payload.currency,
        new_uyu,
        payload.stock,
        payload.location.as_deref(),
        payload.condition.as_deref(),
        category_id,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    let detail = load_detail(&state, updated).await?;
    Ok(Json(detail))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let product = owned_product(&state, user_id, id).await?;
    let photos = repo::list_photos(&state.db, product.id).await?;

    if !repo::delete(&state.db, product.id).await? {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    for photo in &photos {
        if let Err(e) = state.images.delete(&photo.photo_id).await {
            warn!(error = %e, photo_id = %photo.photo_id, "could not delete product photo");
        }
    }

    info!(product_id = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, mp))]
pub async fn replace_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, photo_id)): Path<(Uuid, String)>,
    mp: Multipart,
) -> Result<Json<PhotoReplacedResponse>, ApiError> {
    let product = owned_product(&state, user_id, id).await?;

    let (mut photos, _) = read_product_multipart(mp, "photoToUpdate").await?;
    let replacement = photos
        .pop()
        .ok_or_else(|| ApiError::Validation("New photo required".into()))?;
    if !photos.is_empty() {
        return Err(ApiError::Validation("Exactly one photo expected".into()));
    }

    let current = repo::find_photo(&state.db, product.id, &photo_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Photo not found".into()))?;

    let stored = state
        .images
        .upload(replacement.body, &replacement.content_type)
        .await?;
    let updated = repo::replace_photo(&state.db, current.id, &stored.id, &stored.url)
        .await?
        .ok_or_else(|| ApiError::NotFound("Photo not found".into()))?;

    if let Err(e) = state.images.delete(&photo_id).await {
        warn!(error = %e, photo_id = %photo_id, "could not delete replaced photo");
    }

    Ok(Json(PhotoReplacedResponse {
        message: "Photo updated successfully",
        photo: updated,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_offer(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OfferRequest>,
) -> Result<Json<offers::OfferQuote>, ApiError> {
    let product = owned_product(&state, user_id, id).await?;

    // The offer price comes in the product's own currency.
    let offer_in_uyu = price_in_uyu(&state, payload.offer_price, product.currency).await?;
    let quote = offers::quote_offer(
        product.price_in_uyu,
        payload.offer_price,
        offer_in_uyu,
        payload.start_offer_date,
        payload.end_offer_date,
        OffsetDateTime::now_utc(),
    )?;

    if !repo::set_offer(
        &state.db,
        product.id,
        quote.original_offer_price,
        quote.offer_price_in_uyu,
        quote.start_offer_date,
        quote.end_offer_date,
    )
    .await?
    {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    info!(product_id = %product.id, "offer scheduled");
    Ok(Json(quote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::repo::Category;
    use crate::sellers::repo::Seller;
    use rust_decimal_macros::dec;

    fn product(seller_id: Uuid, category_id: Uuid) -> Product {
        Product {
            id: Uuid::new_v4(),
            seller_id,
            category_id,
            name: "Guitarra".into(),
            description: None,
            price: dec!(300.00),
            currency: Currency::Uyu,
            price_in_uyu: dec!(300.00),
            stock: 1,
            location: "Salto".into(),
            condition: "new".into(),
            views: 0,
            active_offer: false,
            offer_price: None,
            offer_price_in_uyu: None,
            start_offer_date: None,
            end_offer_date: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn seller(id: Uuid) -> Seller {
        Seller {
            id,
            user_id: Uuid::new_v4(),
            department: "Salto".into(),
            city: "Salto".into(),
            address: "Calle 1".into(),
            floor_or_apartment: None,
            phone_number: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn assembles_products_with_their_rows() {
        let seller_row = seller(Uuid::new_v4());
        let category = Category {
            id: Uuid::new_v4(),
            name: "Otros".into(),
        };
        let product = product(seller_row.id, category.id);
        let product_id = product.id;

        let details = assemble_details(
            vec![product],
            &[],
            &[category.clone()],
            std::slice::from_ref(&seller_row),
        )
        .unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].product.id, product_id);
        assert_eq!(details[0].category.id, category.id);
        assert_eq!(details[0].seller.id, seller_row.id);
    }

    #[test]
    fn missing_seller_row_is_an_error() {
        let category = Category {
            id: Uuid::new_v4(),
            name: "Otros".into(),
        };
        let product = product(Uuid::new_v4(), category.id);

        let err = assemble_details(vec![product], &[], &[category], &[]).unwrap_err();
        assert!(err.to_string().contains("seller"));
    }
}
