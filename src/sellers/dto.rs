use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sellers::repo::Seller;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerPublic {
    pub id: Uuid,
    pub department: String,
    pub city: String,
    pub address: String,
    pub floor_or_apartment: Option<String>,
    pub phone_number: Option<String>,
}

impl From<&Seller> for SellerPublic {
    fn from(seller: &Seller) -> Self {
        Self {
            id: seller.id,
            department: seller.department.clone(),
            city: seller.city.clone(),
            address: seller.address.clone(),
            floor_or_apartment: seller.floor_or_apartment.clone(),
            phone_number: seller.phone_number.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSellerRequest {
    pub department: String,
    pub city: String,
    pub address: String,
    pub floor_or_apartment: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerWithUser {
    #[serde(flatten)]
    pub seller: SellerPublic,
    pub user: crate::users::dto::PublicUser,
}
