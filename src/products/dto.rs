use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::products::repo::{Category, Currency, Product, ProductOrder, ProductPhoto};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: Currency,
    pub price_in_uyu: Decimal,
    pub stock: i32,
    pub location: String,
    pub condition: String,
    pub views: i64,
    pub active_offer: bool,
    pub offer_price: Option<Decimal>,
    pub offer_price_in_uyu: Option<Decimal>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_offer_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_offer_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            currency: product.currency,
            price_in_uyu: product.price_in_uyu,
            stock: product.stock,
            location: product.location.clone(),
            condition: product.condition.clone(),
            views: product.views,
            active_offer: product.active_offer,
            offer_price: product.offer_price,
            offer_price_in_uyu: product.offer_price_in_uyu,
            start_offer_date: product.start_offer_date,
            end_offer_date: product.end_offer_date,
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductSummary,
    pub category: Category,
    pub seller: crate::sellers::dto::SellerPublic,
    pub photos: Vec<ProductPhoto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<ProductDetail>,
    pub total_products: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub location: Option<String>,
    pub condition: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub order: Option<ProductOrder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<Currency>,
    pub stock: Option<i32>,
    pub location: Option<String>,
    pub condition: Option<String>,
    pub new_category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRequest {
    pub offer_price: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub start_offer_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_offer_date: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoReplacedResponse {
    pub message: &'static str,
    pub photo: ProductPhoto,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn summary_serializes_camel_case() {
        let product = Product {
            id: Uuid::nil(),
            seller_id: Uuid::nil(),
            category_id: Uuid::nil(),
            name: "Bicicleta".into(),
            description: None,
            price: dec!(120.50),
            currency: Currency::Usd,
            price_in_uyu: dec!(4820.00),
            stock: 3,
            location: "Montevideo".into(),
            condition: "used".into(),
            views: 7,
            active_offer: false,
            offer_price: None,
            offer_price_in_uyu: None,
            start_offer_date: None,
            end_offer_date: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(ProductSummary::from(&product)).unwrap();
        assert_eq!(json["priceInUyu"], serde_json::json!("4820.00"));
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["activeOffer"], false);
    }
}
