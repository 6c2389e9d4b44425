//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for `POST /api/v1/auth`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthRequest {
    pub nickname: String,
    /// Plain passphrase; hashed with the server pepper before comparison
    pub passphrase: String,
}

impl AuthRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.nickname.trim().is_empty() {
            return Some("Nickname cannot be empty".to_string());
        }
        if self.passphrase.is_empty() {
            return Some("Passphrase cannot be empty".to_string());
        }
        None
    }
}
