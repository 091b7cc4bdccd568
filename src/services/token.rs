// SPDX-License-Identifier: MIT

//! Signed, expiring session tokens.
//!
//! Two token classes, each a time-limited assertion of a user identity:
//! short-lived access tokens authorize secured operations, long-lived
//! refresh tokens only mint new pairs. Each class is signed with its own
//! secret, so a token of one kind can never verify as the other.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

/// Token class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Issues and verifies both token classes.
#[derive(Clone)]
pub struct TokenService {
    access_secret: Vec<u8>,
    access_ttl_secs: i64,
    refresh_secret: Vec<u8>,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_secret: config.refresh_token_secret.clone(),
            refresh_ttl_secs: config.refresh_token_ttl_secs,
        }
    }

    /// Issue a short-lived access token for a user.
    pub fn issue_access(&self, user_id: Uuid) -> Result<String, AppError> {
        issue(user_id, &self.access_secret, self.access_ttl_secs)
    }

    /// Issue a long-lived refresh token for a user.
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, AppError> {
        issue(user_id, &self.refresh_secret, self.refresh_ttl_secs)
    }

    /// Verify a token of the given kind and resolve the user identity.
    ///
    /// Malformed tokens, expired tokens and signature mismatches all fail
    /// the same way: `AppError::Auth`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Uuid, AppError> {
        let secret = match kind {
            TokenKind::Access => &self.access_secret,
            TokenKind::Refresh => &self.refresh_secret,
        };

        let key = DecodingKey::from_secret(secret);
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<Claims>(token, &key, &validation)
            .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))?;

        token_data
            .claims
            .sub
            .parse()
            .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))
    }
}

fn issue(user_id: Uuid, secret: &[u8], ttl_secs: i64) -> Result<String, AppError> {
    let now = chrono::Utc::now().timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now as usize,
        exp: (now + ttl_secs) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Token signing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&Config::test_default())
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let token = tokens.issue_access(user_id).unwrap();
        assert_eq!(tokens.verify(&token, TokenKind::Access).unwrap(), user_id);
    }

    #[test]
    fn test_kind_mixup_is_rejected() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let access = tokens.issue_access(user_id).unwrap();
        assert!(tokens.verify(&access, TokenKind::Refresh).is_err());

        let refresh = tokens.issue_refresh(user_id).unwrap();
        assert!(tokens.verify(&refresh, TokenKind::Access).is_err());
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let tokens = service();
        assert!(tokens.verify("not.a.jwt", TokenKind::Access).is_err());
        assert!(tokens.verify("", TokenKind::Refresh).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let mut config = Config::test_default();
        config.access_token_ttl_secs = -120; // already expired at issue time
        let tokens = TokenService::new(&config);

        let token = tokens.issue_access(Uuid::new_v4()).unwrap();
        assert!(tokens.verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let user_id = Uuid::new_v4();
        let token = service().issue_access(user_id).unwrap();

        let mut other = Config::test_default();
        other.access_token_secret = b"a_completely_different_secret!!!".to_vec();
        assert!(TokenService::new(&other)
            .verify(&token, TokenKind::Access)
            .is_err());
    }
}
