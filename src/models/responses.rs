//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::store::User;

/// Response body for a granted login (POST /api/v1/auth)
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub auth_granted: bool,
    /// The logged-in user, passphrase hash stripped
    pub user: User,
}

impl AuthResponse {
    pub fn granted(user: &User) -> Self {
        Self {
            auth_granted: true,
            user: user.public(),
        }
    }
}

/// Response body for GET /api/v1/users/me
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user: User,
}

impl UserResponse {
    pub fn new(user: &User) -> Self {
        Self {
            user: user.public(),
        }
    }
}

/// Plain acknowledgement, e.g. after logout
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for GET /api/v1/dump
#[derive(Debug, Clone, Serialize)]
pub struct DumpResponse {
    /// Success message
    pub message: String,
    /// Aggregate per-table report
    pub report: String,
}

/// Response body for the root endpoint (GET /api/v1)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Crate version
    pub version: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_hides_passphrase() {
        let user = User {
            nickname: "alice".to_string(),
            passphrase_hex: "abc".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(AuthResponse::granted(&user)).unwrap();
        assert_eq!(json["auth_granted"], true);
        assert_eq!(json["user"]["nickname"], "alice");
        assert_eq!(json["user"]["passphrase_hex"], "");
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
