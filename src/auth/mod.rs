//! Auth Module
//!
//! Two-tier session model: a short-lived access token and a long-lived refresh
//! token whose SHA-256 fingerprint row in the token table is the only thing
//! that keeps a session alive.

pub mod middleware;
pub mod token;

pub use middleware::{
    cleared_cookie, is_public, require_session, session_cookie, Caller, ACCESS_COOKIE,
    PUBLIC_PATHS, REFRESH_COOKIE,
};
pub use token::{
    fingerprint, hash_passphrase, AccessClaims, RefreshClaims, TokenError, TokenPair,
    TokenService, ACCESS_TTL_SECS, REFRESH_TTL_SECS,
};
