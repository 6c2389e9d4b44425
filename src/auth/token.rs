//! Token Service
//!
//! Issues the access/refresh pair, verifies signatures and keeps the server-side
//! fingerprint rows that make a refresh token revocable.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::{delete_one, get_one, set_one, Cacher, Table};
use crate::store::Token;

/// Lifetime of an access token.
pub const ACCESS_TTL_SECS: i64 = 15 * 60;
/// Lifetime of a refresh token and of its fingerprint row.
pub const REFRESH_TTL_SECS: i64 = 28 * 24 * 60 * 60;

// == Token Error ==
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("server secret (APP_PEPPER) not set")]
    MissingSecret,

    #[error("access token could not be signed: {0}")]
    AccessSigning(String),

    #[error("refresh token could not be signed: {0}")]
    RefreshSigning(String),

    #[error("refresh token fingerprint could not be saved")]
    StoreFailed,

    #[error("invalid token received")]
    Invalid,

    #[error("token expired")]
    Expired,
}

// == Claims ==
/// Payload of the short-lived access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub nickname: String,
    pub iat: i64,
    pub exp: i64,
}

/// Payload of the refresh token. The owner is only known through its fingerprint row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub iat: i64,
    pub exp: i64,
    /// Random id so two pairs issued in the same second differ
    pub jti: String,
}

/// Signed tokens handed to the client after a successful login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub fingerprint: String,
}

// == Helpers ==
/// Hex SHA-256 of a signed refresh token, used as its row key.
pub fn fingerprint(refresh_token: &str) -> String {
    hex::encode(Sha256::digest(refresh_token.as_bytes()))
}

/// Hex SHA-512 of the passphrase followed by the server pepper.
pub fn hash_passphrase(passphrase: &str, pepper: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(passphrase.as_bytes());
    hasher.update(pepper.as_bytes());
    hex::encode(hasher.finalize())
}

// == Token Service ==
#[derive(Clone)]
pub struct TokenService {
    tokens: Table<Token>,
    secret: Option<String>,
}

impl TokenService {
    /// An empty secret counts as missing.
    pub fn new(tokens: Table<Token>, secret: Option<String>) -> Self {
        Self {
            tokens,
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    pub fn tokens(&self) -> &Table<Token> {
        &self.tokens
    }

    fn secret(&self) -> Result<&[u8], TokenError> {
        self.secret
            .as_deref()
            .map(str::as_bytes)
            .ok_or(TokenError::MissingSecret)
    }

    /// Signs a new pair for `nickname` and saves the refresh fingerprint.
    pub fn issue(&self, nickname: &str) -> Result<TokenPair, TokenError> {
        self.issue_at(nickname, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit clock.
    ///
    /// Nothing is returned unless the fingerprint row was saved: a refresh
    /// token without its row could never be revoked.
    pub fn issue_at(&self, nickname: &str, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        let secret = self.secret()?;
        let iat = now.timestamp();

        let access_claims = AccessClaims {
            nickname: nickname.to_string(),
            iat,
            exp: iat + ACCESS_TTL_SECS,
        };
        let access = sign(&access_claims, secret)
            .map_err(|e| TokenError::AccessSigning(e.to_string()))?;

        let refresh_claims = RefreshClaims {
            iat,
            exp: iat + REFRESH_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
        };
        let refresh = sign(&refresh_claims, secret)
            .map_err(|e| TokenError::RefreshSigning(e.to_string()))?;

        let hash = fingerprint(&refresh);
        let record = Token {
            hash: hash.clone(),
            nickname: nickname.to_string(),
            created_at: now,
            ttl_secs: REFRESH_TTL_SECS,
        };
        if !set_one(self.tokens.as_ref(), &hash, record) {
            return Err(TokenError::StoreFailed);
        }

        info!("issued token pair for {}", nickname);
        Ok(TokenPair {
            access,
            refresh,
            fingerprint: hash,
        })
    }

    /// Signs a fresh access token that never outlives `refresh`.
    pub fn mint_access(
        &self,
        nickname: &str,
        refresh: &RefreshClaims,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let secret = self.secret()?;
        let iat = now.timestamp();
        let claims = AccessClaims {
            nickname: nickname.to_string(),
            iat,
            exp: (iat + ACCESS_TTL_SECS).min(refresh.exp),
        };
        sign(&claims, secret).map_err(|e| TokenError::AccessSigning(e.to_string()))
    }

    pub fn verify_access(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = verify(token, self.secret()?)?;
        check_expiry(claims.exp, now)?;
        Ok(claims)
    }

    pub fn verify_refresh(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = verify(token, self.secret()?)?;
        check_expiry(claims.exp, now)?;
        Ok(claims)
    }

    /// Fingerprint row of a signed refresh token, if it has not been revoked.
    pub fn lookup(&self, refresh_token: &str) -> Option<Token> {
        get_one(self.tokens.as_ref(), &fingerprint(refresh_token))
    }

    /// Deletes the fingerprint row of `refresh_token`.
    pub fn revoke(&self, refresh_token: &str) -> bool {
        self.revoke_fingerprint(&fingerprint(refresh_token))
    }

    pub fn revoke_fingerprint(&self, hash: &str) -> bool {
        debug!("revoking token {}", hash);
        delete_one(self.tokens.as_ref(), hash)
    }

    /// Removes every row past its TTL and returns how many were dropped.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let (rows, _) = self.tokens.peek_range();
        let mut removed = 0;

        for (key, token) in rows {
            if token.is_expired(now) && delete_one(self.tokens.as_ref(), &key) {
                removed += 1;
            }
        }

        if removed > 0 {
            info!("token sweep: removed {} expired tokens", removed);
        }
        removed
    }
}

fn sign<T: Serialize>(claims: &T, secret: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
}

// Signature only; expiry is checked against the caller's clock.
fn verify<T: DeserializeOwned>(token: &str, secret: &[u8]) -> Result<T, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = ["exp".to_string()].into_iter().collect();

    decode::<T>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("token rejected: {}", e);
            TokenError::Invalid
        })
}

fn check_expiry(exp: i64, now: DateTime<Utc>) -> Result<(), TokenError> {
    if exp < now.timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(())
}

impl RefreshClaims {
    /// Seconds left before this refresh token expires.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        Duration::seconds(self.exp - now.timestamp())
    }
}
