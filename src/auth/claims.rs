use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Purpose tag baked into every signed token so a token minted for one flow
/// never verifies as another.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    Verify,
    ChangeEmail,
    ChangePassword,
}

/// Implemented by every claim set; `KIND` is checked on verification.
pub trait TokenClaims: Serialize + DeserializeOwned {
    const KIND: TokenKind;
    fn kind(&self) -> TokenKind;
}

/// Stateless bearer claims. Validity is signature plus expiry only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
}

/// Long-lived claims, additionally matched against the value stored on the
/// user row so sessions can be revoked server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyClaims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
}

/// Email change carries the current address; the change applies only while
/// that captured state still matches the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailChangeClaims {
    pub username: String,
    pub current_email: String,
    pub new_email: String,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
}

/// Password change carries hashes only; the plaintext never enters a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChangeClaims {
    pub username: String,
    pub current_password_hash: String,
    pub new_password_hash: String,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
}

macro_rules! impl_token_claims {
    ($ty:ty, $kind:expr) => {
        impl TokenClaims for $ty {
            const KIND: TokenKind = $kind;
            fn kind(&self) -> TokenKind {
                self.kind
            }
        }
    };
}

impl_token_claims!(AccessClaims, TokenKind::Access);
impl_token_claims!(RefreshClaims, TokenKind::Refresh);
impl_token_claims!(VerifyClaims, TokenKind::Verify);
impl_token_claims!(EmailChangeClaims, TokenKind::ChangeEmail);
impl_token_claims!(PasswordChangeClaims, TokenKind::ChangePassword);
