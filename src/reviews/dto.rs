use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::reviews::repo::ReviewWithAuthor;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar_photo: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPublic {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub rating: Decimal,
    pub comment: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user: ReviewAuthor,
}

impl From<&ReviewWithAuthor> for ReviewPublic {
    fn from(row: &ReviewWithAuthor) -> Self {
        Self {
            id: row.review.id,
            seller_id: row.review.seller_id,
            rating: row.review.rating,
            comment: row.review.comment.clone(),
            created_at: row.review.created_at,
            user: ReviewAuthor {
                id: row.review.user_id,
                username: row.author_username.clone(),
                email: row.author_email.clone(),
                avatar_photo: row.author_avatar.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReviewRequest {
    pub seller_id: Uuid,
    pub rating: Decimal,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<Decimal>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsQuery {
    pub seller_id: Option<Uuid>,
}
