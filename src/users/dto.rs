use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::sellers::dto::SellerPublic;
use crate::users::repo::User;

/// Public projection of a user; never exposes hashes or tokens.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
    pub email: String,
    pub avatar_photo: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            birth_date: user.birth_date,
            email: user.email.clone(),
            avatar_photo: user.avatar_photo.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithSeller {
    #[serde(flatten)]
    pub user: PublicUser,
    pub seller: Option<SellerPublic>,
}

/// Registration response mirrors only what the client submitted, minus the
/// credentials.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub avatar_photo: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBasicData {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct EmailChangeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyExpiredRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUpdatedResponse {
    pub message: String,
    pub new_avatar: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn public_user_hides_credentials() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            username: "ana".into(),
            first_name: "Ana".into(),
            last_name: "Pérez".into(),
            birth_date: date!(1990 - 04 - 02),
            email: "ana@example.com".into(),
            avatar_photo: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("firstName"));
        assert!(json.contains("birthDate"));
        assert!(!json.contains("password"));
        assert!(!json.contains("refresh"));
    }
}
