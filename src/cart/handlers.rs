use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    cart::{
        dto::{CartItemResponse, CartLineResponse, CartResponse, UpdateCartRequest},
        repo,
    },
    error::ApiError,
    products::{self, dto::ProductSummary, repo::Product},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/cart", get(get_cart)).route(
        "/cart/:product_id",
        post(add_to_cart)
            .patch(update_quantity)
            .delete(remove_from_cart),
    )
}

async fn sellable_product(state: &AppState, product_id: Uuid) -> Result<Product, ApiError> {
    let product = products::repo::find_by_id(&state.db, product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    if product.stock == 0 {
        return Err(ApiError::Validation("This product is out of stock".into()));
    }
    Ok(product)
}

fn check_stock(product: &Product, quantity: i32) -> Result<(), ApiError> {
    if quantity > product.stock {
        return Err(ApiError::Validation(format!(
            "Cannot add more units of this product: Only {} units available",
            product.stock
        )));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn get_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CartResponse>, ApiError> {
    let lines = repo::list_for_user(&state.db, user_id).await?;

    let mut total = Decimal::ZERO;
    let items = lines
        .iter()
        .map(|line| {
            let subtotal =
                line.product.effective_price_in_uyu() * Decimal::from(line.quantity);
            total += subtotal;
            CartLineResponse {
                product: ProductSummary::from(&line.product),
                quantity: line.quantity,
                subtotal_in_uyu: subtotal.round_dp(2),
            }
        })
        .collect();

    Ok(Json(CartResponse {
        items,
        total_in_uyu: total.round_dp(2),
    }))
}

/// Adds one unit, or bumps an existing line by one, never past the stock.
#[instrument(skip(state))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let product = sellable_product(&state, product_id).await?;

    let item = match repo::find_item(&state.db, user_id, product_id).await? {
        None => {
            let item = repo::create(&state.db, user_id, product_id, 1).await?;
            info!(user_id = %user_id, product_id = %product_id, "product added to cart");
            return Ok((StatusCode::CREATED, Json(CartItemResponse::from(&item))).into_response());
        }
        Some(existing) => {
            check_stock(&product, existing.quantity + 1)?;
            repo::set_quantity(&state.db, user_id, product_id, existing.quantity + 1)
                .await?
                .ok_or_else(|| ApiError::NotFound("Product not found in Cart".into()))?
        }
    };

    Ok(Json(CartItemResponse::from(&item)).into_response())
}

#[instrument(skip(state, payload))]
pub async fn update_quantity(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<Response, ApiError> {
    let product = sellable_product(&state, product_id).await?;

    // Zero empties the line instead of leaving a dead row behind.
    if payload.quantity == 0 {
        if !repo::remove(&state.db, user_id, product_id).await? {
            return Err(ApiError::NotFound("Product not found".into()));
        }
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    if payload.quantity < 0 {
        return Err(ApiError::Validation("Cannot add negative units".into()));
    }
    check_stock(&product, payload.quantity)?;

    let item = repo::set_quantity(&state.db, user_id, product_id, payload.quantity)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    Ok(Json(CartItemResponse::from(&item)).into_response())
}

#[instrument(skip(state))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !repo::remove(&state.db, user_id, product_id).await? {
        return Err(ApiError::NotFound("Product not found in Cart".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
