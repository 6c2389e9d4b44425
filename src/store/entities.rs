//! Entities kept in the tables.
//!
//! The store treats them as opaque values; only `User` and `Token` are read by
//! the auth layer.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// == User ==
/// Account record, keyed by nickname.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub nickname: String,
    #[serde(default)]
    pub full_name: String,
    /// Hex SHA-512 of the passphrase salted with the server secret
    #[serde(default)]
    pub passphrase_hex: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub private: bool,
    /// Accounts whose posts show up in this user's flow
    #[serde(default)]
    pub flow_list: HashMap<String, bool>,
    #[serde(default)]
    pub registered_time: DateTime<Utc>,
    #[serde(default)]
    pub last_login_time: DateTime<Utc>,
    #[serde(default)]
    pub last_active_time: DateTime<Utc>,
}

impl User {
    /// Copy safe to send to a client.
    pub fn public(&self) -> Self {
        Self {
            passphrase_hex: String::new(),
            ..self.clone()
        }
    }
}

// == Post ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub nickname: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub figure: String,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
}

// == Poll ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub content: String,
    #[serde(default)]
    pub counter: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub author: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
    /// Nicknames that have already voted
    #[serde(default)]
    pub voted_list: Vec<String>,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
}

// == Request ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    #[default]
    Activation,
    PassphraseReset,
    Follow,
}

/// Pending activation, passphrase-reset or follow request, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub kind: RequestKind,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

// == Device ==
/// Push subscription of one device. Stored per nickname as a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub uuid: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub time_created: DateTime<Utc>,
}

// == Token ==
/// Server-side record of an issued refresh token, keyed by its fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Hex SHA-256 of the signed refresh token
    pub hash: String,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
    /// Validity in seconds since `created_at`
    #[serde(rename = "ttl")]
    pub ttl_secs: i64,
}

impl Token {
    /// Instant after which the record may be swept.
    ///
    /// `None` when `created_at + ttl` falls outside the representable range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Duration::try_seconds(self.ttl_secs)
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
    }

    /// True once `now` is past `created_at + ttl`.
    ///
    /// A TTL that cannot be added to `created_at` counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(true, |at| now > at)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_public_strips_passphrase() {
        let user = User {
            nickname: "alice".to_string(),
            passphrase_hex: "deadbeef".to_string(),
            ..Default::default()
        };

        let public = user.public();
        assert!(public.passphrase_hex.is_empty());
        assert_eq!(public.nickname, "alice");
    }

    #[test]
    fn test_token_expiry_boundary() {
        let created_at = Utc::now();
        let token = Token {
            hash: "fp".to_string(),
            nickname: "alice".to_string(),
            created_at,
            ttl_secs: 60,
        };

        assert!(!token.is_expired(created_at));
        assert!(!token.is_expired(created_at + Duration::seconds(60)));
        assert!(token.is_expired(created_at + Duration::seconds(61)));
    }

    #[test]
    fn test_token_out_of_range_ttl_is_expired() {
        // 28 days counted in nanoseconds, as older snapshots stored it.
        let token = Token {
            hash: "fp".to_string(),
            nickname: "alice".to_string(),
            created_at: Utc::now(),
            ttl_secs: 2_419_200_000_000_000,
        };

        assert_eq!(token.expires_at(), None);
        assert!(token.is_expired(Utc::now()));

        let token = Token {
            ttl_secs: i64::MIN,
            ..token
        };
        assert!(token.is_expired(Utc::now()));
    }

    #[test]
    fn test_token_serializes_ttl_field() {
        let token = Token {
            ttl_secs: 42,
            ..Default::default()
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["ttl"], 42);
    }

    #[test]
    fn test_request_kind_snake_case() {
        let json = serde_json::to_string(&RequestKind::PassphraseReset).unwrap();
        assert_eq!(json, "\"passphrase_reset\"");
    }

    #[test]
    fn test_user_decodes_with_missing_fields() {
        let user: User = serde_json::from_str(r#"{"nickname":"bob"}"#).unwrap();
        assert_eq!(user.nickname, "bob");
        assert!(!user.active);
    }
}
