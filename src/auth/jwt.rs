use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::{
    AccessClaims, EmailChangeClaims, PasswordChangeClaims, RefreshClaims, TokenClaims, TokenKind,
    VerifyClaims,
};
use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Malformed,
    #[error("could not sign token")]
    Signing,
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => {
                ApiError::Expired("Invalid session, please log in your account again".into())
            }
            TokenError::Malformed => ApiError::Malformed("Invalid Token structure".into()),
            TokenError::Signing => ApiError::Internal(anyhow::anyhow!("token signing failed")),
        }
    }
}

/// Single source of truth for signing keys and expiry policy.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub verify_ttl: Duration,
    pub change_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

fn window(ttl: Duration) -> (i64, i64) {
    let now = OffsetDateTime::now_utc();
    let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
    (now.unix_timestamp(), exp.unix_timestamp())
}

impl JwtKeys {
    pub fn from_config(jwt: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt.secret.as_bytes()),
            access_ttl: Duration::from_secs((jwt.access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((jwt.refresh_ttl_days as u64) * 24 * 3600),
            verify_ttl: Duration::from_secs((jwt.verify_ttl_hours as u64) * 3600),
            change_ttl: Duration::from_secs((jwt.change_ttl_minutes as u64) * 60),
        }
    }

    pub fn sign<T: TokenClaims>(&self, claims: &T) -> Result<String, TokenError> {
        let token =
            encode(&Header::default(), claims, &self.encoding).map_err(|_| TokenError::Signing)?;
        debug!(kind = ?claims.kind(), "token signed");
        Ok(token)
    }

    /// Verifies signature and expiry, then checks the claim shape: the
    /// payload must deserialize as `T` and carry `T::KIND`.
    pub fn verify<T: TokenClaims>(&self, token: &str) -> Result<T, TokenError> {
        let mut validation = Validation::default();
        validation.validate_aud = false;
        let data = decode::<T>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;
        if data.claims.kind() != T::KIND {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }

    pub fn issue_access(&self, user_id: Uuid) -> Result<String, TokenError> {
        let (iat, exp) = window(self.access_ttl);
        self.sign(&AccessClaims {
            user_id,
            iat,
            exp,
            kind: TokenKind::Access,
        })
    }

    pub fn issue_refresh(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        let (iat, exp) = window(self.refresh_ttl);
        self.sign(&RefreshClaims {
            user_id,
            email: email.to_string(),
            iat,
            exp,
            kind: TokenKind::Refresh,
        })
    }

    pub fn issue_verify(&self, email: &str) -> Result<String, TokenError> {
        let (iat, exp) = window(self.verify_ttl);
        self.sign(&VerifyClaims {
            email: email.to_string(),
            iat,
            exp,
            kind: TokenKind::Verify,
        })
    }

    pub fn issue_email_change(
        &self,
        username: &str,
        current_email: &str,
        new_email: &str,
    ) -> Result<String, TokenError> {
        let (iat, exp) = window(self.change_ttl);
        self.sign(&EmailChangeClaims {
            username: username.to_string(),
            current_email: current_email.to_string(),
            new_email: new_email.to_string(),
            iat,
            exp,
            kind: TokenKind::ChangeEmail,
        })
    }

    pub fn issue_password_change(
        &self,
        username: &str,
        current_password_hash: &str,
        new_password_hash: &str,
    ) -> Result<String, TokenError> {
        let (iat, exp) = window(self.change_ttl);
        self.sign(&PasswordChangeClaims {
            username: username.to_string(),
            current_password_hash: current_password_hash.to_string(),
            new_password_hash: new_password_hash.to_string(),
            iat,
            exp,
            kind: TokenKind::ChangePassword,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No runtime or pool involved: keys come straight from a config.
    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "test-secret".into(),
            access_ttl_minutes: 60,
            refresh_ttl_days: 7,
            verify_ttl_hours: 24,
            change_ttl_minutes: 10,
        })
    }

    #[test]
    fn access_token_roundtrip_carries_exact_claims() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.issue_access(user_id).expect("sign access");
        let claims: AccessClaims = keys.verify(&token).expect("verify access");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn refresh_token_carries_email() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys
            .issue_refresh(user_id, "a@b.com")
            .expect("sign refresh");
        let claims: RefreshClaims = keys.verify(&token).expect("verify refresh");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let keys = make_keys();
        let token = keys
            .issue_refresh(Uuid::new_v4(), "a@b.com")
            .expect("sign refresh");
        let err = keys.verify::<AccessClaims>(&token).unwrap_err();
        assert_eq!(err, TokenError::Malformed);
    }

    #[test]
    fn action_token_kinds_do_not_cross() {
        let keys = make_keys();
        let token = keys.issue_verify("a@b.com").expect("sign verify");
        assert!(keys.verify::<VerifyClaims>(&token).is_ok());
        assert_eq!(
            keys.verify::<EmailChangeClaims>(&token).unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn tampered_token_is_malformed() {
        let keys = make_keys();
        let mut token = keys.issue_access(Uuid::new_v4()).expect("sign access");
        token.push('x');
        assert_eq!(
            keys.verify::<AccessClaims>(&token).unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let keys = make_keys();
        let past = OffsetDateTime::now_utc().unix_timestamp() - 7200;
        let claims = AccessClaims {
            user_id: Uuid::new_v4(),
            iat: past,
            exp: past + 10,
            kind: TokenKind::Access,
        };
        let token = keys.sign(&claims).expect("sign");
        assert_eq!(
            keys.verify::<AccessClaims>(&token).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"other"),
            decoding: DecodingKey::from_secret(b"other"),
            ..keys.clone()
        };
        let token = keys.issue_access(Uuid::new_v4()).expect("sign");
        assert_eq!(
            other.verify::<AccessClaims>(&token).unwrap_err(),
            TokenError::Malformed
        );
    }
}
