//! JWT token generation and validation.
//!
//! Access and refresh tokens share one claim shape and one signing secret;
//! the `typ` claim keeps them from being used in place of each other.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token (15 minutes), never stored server-side
    Access,
    /// Long-lived refresh token (7 days), stored hashed per email
    Refresh,
}

/// JWT claims carried by both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Random token ID, keeps tokens minted in the same second distinct
    pub jti: String,
    /// Principal email
    pub email: String,
    /// Principal ID in its identity store
    pub id: i64,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// The identity a verified token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalClaims {
    pub email: String,
    pub id: i64,
}

impl From<TokenClaims> for PrincipalClaims {
    fn from(claims: TokenClaims) -> Self {
        Self {
            email: claims.email,
            id: claims.id,
        }
    }
}

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Why a presented token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Signature fine, `exp` in the past
    Expired,
    /// Bad signature, wrong type, or not a JWT at all
    Malformed,
}

/// Errors that can occur while minting tokens.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("system time error")]
    TimeError,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue_access_token(&self, email: &str, id: i64) -> Result<IssuedToken, JwtError> {
        self.issue(TokenType::Access, email, id, unix_now()?)
    }

    pub fn issue_refresh_token(&self, email: &str, id: i64) -> Result<IssuedToken, JwtError> {
        self.issue(TokenType::Refresh, email, id, unix_now()?)
    }

    fn issue(
        &self,
        token_type: TokenType,
        email: &str,
        id: i64,
        now: u64,
    ) -> Result<IssuedToken, JwtError> {
        let duration = match token_type {
            TokenType::Access => ACCESS_TOKEN_DURATION_SECS,
            TokenType::Refresh => REFRESH_TOKEN_DURATION_SECS,
        };

        let claims = TokenClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            id,
            token_type,
            iat: now,
            exp: now + duration,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;

        Ok(IssuedToken { token, duration })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<PrincipalClaims, TokenRejection> {
        self.verify(token, TokenType::Access)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<PrincipalClaims, TokenRejection> {
        self.verify(token, TokenType::Refresh)
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<PrincipalClaims, TokenRejection> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                _ => TokenRejection::Malformed,
            })?;

        if token_data.claims.token_type != expected {
            return Err(TokenRejection::Malformed);
        }

        Ok(token_data.claims.into())
    }
}

/// One-way digest of a token for at-rest storage (hex SHA-256).
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_issue_and_verify_access_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result = config.issue_access_token("a@x.com", 7).unwrap();
        assert_eq!(result.duration, ACCESS_TOKEN_DURATION_SECS);

        let claims = config.verify_access_token(&result.token).unwrap();
        assert_eq!(
            claims,
            PrincipalClaims {
                email: "a@x.com".to_string(),
                id: 7
            }
        );
    }

    #[test]
    fn test_issue_and_verify_refresh_token() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let result = config.issue_refresh_token("a@x.com", 7).unwrap();
        assert_eq!(result.duration, REFRESH_TOKEN_DURATION_SECS);

        let claims = config.verify_refresh_token(&result.token).unwrap();
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.id, 7);
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let access = config.issue_access_token("a@x.com", 7).unwrap();
        let refresh = config.issue_refresh_token("a@x.com", 7).unwrap();

        assert_eq!(
            config.verify_refresh_token(&access.token),
            Err(TokenRejection::Malformed)
        );
        assert_eq!(
            config.verify_access_token(&refresh.token),
            Err(TokenRejection::Malformed)
        );
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        assert_eq!(
            config.verify_access_token("invalid-token"),
            Err(TokenRejection::Malformed)
        );
        assert_eq!(
            config.verify_refresh_token(""),
            Err(TokenRejection::Malformed)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"secret-1");
        let config2 = JwtConfig::new(b"secret-2");

        let result = config1.issue_access_token("a@x.com", 7).unwrap();

        assert_eq!(
            config2.verify_access_token(&result.token),
            Err(TokenRejection::Malformed)
        );
    }

    #[test]
    fn test_access_token_expires_after_fifteen_minutes() {
        let config = JwtConfig::new(b"test-secret");
        let now = unix_now().unwrap();

        // Issued 15 minutes and 1 second ago: past the boundary
        let stale = config
            .issue(
                TokenType::Access,
                "a@x.com",
                7,
                now - ACCESS_TOKEN_DURATION_SECS - 1,
            )
            .unwrap();
        assert_eq!(
            config.verify_access_token(&stale.token),
            Err(TokenRejection::Expired)
        );

        // Issued 14 minutes ago: still inside the window
        let fresh = config
            .issue(TokenType::Access, "a@x.com", 7, now - 14 * 60)
            .unwrap();
        assert!(config.verify_access_token(&fresh.token).is_ok());
    }

    #[test]
    fn test_expired_refresh_token() {
        let config = JwtConfig::new(b"test-secret");
        let now = unix_now().unwrap();

        let stale = config
            .issue(
                TokenType::Refresh,
                "a@x.com",
                7,
                now - REFRESH_TOKEN_DURATION_SECS - 50,
            )
            .unwrap();
        assert_eq!(
            config.verify_refresh_token(&stale.token),
            Err(TokenRejection::Expired)
        );
    }

    #[test]
    fn test_tokens_differ_within_same_second() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let first = config.issue_refresh_token("a@x.com", 7).unwrap();
        let second = config.issue_refresh_token("a@x.com", 7).unwrap();

        assert_ne!(first.token, second.token);
        assert_ne!(hash_token(&first.token), hash_token(&second.token));
    }

    #[test]
    fn test_hash_token_is_deterministic() {
        let token = "some.refresh.token";
        assert_eq!(hash_token(token), hash_token(token));
        assert_eq!(hash_token(token).len(), 64);
        assert_ne!(hash_token(token), token);
    }

    #[test]
    fn test_hash_token_no_collisions() {
        let config = JwtConfig::new(b"test-secret-key-for-testing");

        let hashes: HashSet<String> = (0..2000)
            .map(|i| {
                let token = config.issue_refresh_token("a@x.com", i).unwrap().token;
                hash_token(&token)
            })
            .collect();

        assert_eq!(hashes.len(), 2000);
    }
}
