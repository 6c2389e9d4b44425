//! API Handlers
//!
//! HTTP request handlers for each endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::auth::{
    cleared_cookie, hash_passphrase, session_cookie, Caller, TokenError, TokenService,
    ACCESS_COOKIE, ACCESS_TTL_SECS, REFRESH_COOKIE, REFRESH_TTL_SECS,
};
use crate::cache::{get_one, set_one};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    AuthRequest, AuthResponse, DumpResponse, HealthResponse, MessageResponse, UserResponse,
};
use crate::store::{summarize, Database, User};

/// Header carrying the shared dump token.
pub const DUMP_TOKEN_HEADER: &str = "x-dump-token";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: TokenService,
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates a new AppState; the token service shares the database's token table.
    pub fn new(db: Arc<Database>, config: Arc<Config>) -> Self {
        let tokens = TokenService::new(db.tokens.clone(), config.secret.clone());
        Self { db, tokens, config }
    }

    /// Creates a new AppState with empty tables built from configuration.
    pub fn from_config(config: Config) -> Self {
        let db = Database::new(config.cache_strategy);
        db.mark_ready();
        Self::new(Arc::new(db), Arc::new(config))
    }
}

/// Handler for GET /api/v1
pub async fn root_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for POST /api/v1/auth
///
/// Checks the passphrase, issues a token pair and sets both cookies.
pub async fn auth_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<AuthRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let pepper = state
        .config
        .secret
        .as_deref()
        .ok_or(ApiError::from(TokenError::MissingSecret))?;

    let users = state.db.users.as_ref();
    let hash = hash_passphrase(&req.passphrase, pepper);
    let user = get_one(users, &req.nickname)
        .filter(|user| !user.passphrase_hex.is_empty() && user.passphrase_hex == hash)
        .ok_or_else(|| {
            warn!("failed login for {}", req.nickname);
            ApiError::Unauthorized("user not found or wrong passphrase entered".to_string())
        })?;

    if !user.active {
        return Err(ApiError::Forbidden(
            "user has not been activated yet".to_string(),
        ));
    }

    let now = Utc::now();
    let pair = state.tokens.issue_at(&user.nickname, now)?;

    let user = User {
        last_login_time: now,
        ..user
    };
    set_one(users, &user.nickname, user.clone());
    info!("{} logged in", user.nickname);

    let jar = jar
        .add(session_cookie(ACCESS_COOKIE, pair.access, ACCESS_TTL_SECS))
        .add(session_cookie(REFRESH_COOKIE, pair.refresh, REFRESH_TTL_SECS));

    Ok((jar, Json(AuthResponse::granted(&user))))
}

/// Handler for POST /api/v1/auth/logout
///
/// Deletes the refresh token's fingerprint row when its signature checks out.
/// Both cookies are cleared in any case.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        match state.tokens.verify_refresh(cookie.value(), Utc::now()) {
            Ok(_) | Err(TokenError::Expired) => {
                state.tokens.revoke(cookie.value());
            }
            Err(e) => warn!("logout with unusable refresh token: {}", e),
        }
    }

    let jar = jar
        .add(cleared_cookie(ACCESS_COOKIE))
        .add(cleared_cookie(REFRESH_COOKIE));

    (jar, Json(MessageResponse::new("session ended")))
}

/// Handler for GET /api/v1/users/me
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(Caller(nickname)): Extension<Caller>,
) -> Result<Json<UserResponse>> {
    let user = get_one(state.db.users.as_ref(), &nickname)
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", nickname)))?;

    Ok(Json(UserResponse::new(&user)))
}

/// Handler for GET /api/v1/dump
///
/// Gated by the `X-Dump-Token` header instead of a session.
pub async fn dump_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DumpResponse>> {
    let presented = headers
        .get(DUMP_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if presented.is_empty() {
        return Err(ApiError::Unauthorized("empty dump token".to_string()));
    }
    match state.config.api_token.as_deref() {
        Some(expected) if expected == presented => {}
        _ => return Err(ApiError::Forbidden("invalid dump token".to_string())),
    }

    let db = state.db.clone();
    let dir = state.config.data_dir.clone();
    let reports = tokio::task::spawn_blocking(move || db.dump_all(&dir))
        .await
        .map_err(|e| {
            error!("dump task failed: {}", e);
            ApiError::Internal("dump task failed".to_string())
        })?;

    Ok(Json(DumpResponse {
        message: "data dumped".to_string(),
        report: summarize("dump", &reports),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cacher;

    fn state_with_user(active: bool) -> AppState {
        let state = AppState::from_config(Config {
            secret: Some("pepper".to_string()),
            ..Config::default()
        });
        set_one(
            state.db.users.as_ref(),
            "alice",
            User {
                nickname: "alice".to_string(),
                passphrase_hex: hash_passphrase("hunter2", "pepper"),
                active,
                ..Default::default()
            },
        );
        state
    }

    fn login(nickname: &str, passphrase: &str) -> Json<AuthRequest> {
        Json(AuthRequest {
            nickname: nickname.to_string(),
            passphrase: passphrase.to_string(),
        })
    }

    #[tokio::test]
    async fn test_auth_handler_grants_session() {
        let state = state_with_user(true);

        let (jar, Json(response)) = auth_handler(
            State(state.clone()),
            CookieJar::new(),
            login("alice", "hunter2"),
        )
        .await
        .unwrap();

        assert!(response.auth_granted);
        assert!(response.user.passphrase_hex.is_empty());
        assert!(jar.get(ACCESS_COOKIE).is_some());
        let refresh = jar.get(REFRESH_COOKIE).unwrap().value().to_string();
        assert!(state.tokens.lookup(&refresh).is_some());

        let stored = get_one(state.db.users.as_ref(), "alice").unwrap();
        assert_eq!(stored.last_login_time, response.user.last_login_time);
    }

    #[tokio::test]
    async fn test_auth_handler_wrong_passphrase() {
        let state = state_with_user(true);

        let result = auth_handler(State(state.clone()), CookieJar::new(), login("alice", "nope")).await;

        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
        assert_eq!(state.db.tokens.range().1, 0);
    }

    #[tokio::test]
    async fn test_auth_handler_unknown_user() {
        let state = state_with_user(true);

        let result = auth_handler(State(state), CookieJar::new(), login("bob", "hunter2")).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_auth_handler_inactive_user() {
        let state = state_with_user(false);

        let result = auth_handler(State(state), CookieJar::new(), login("alice", "hunter2")).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_logout_handler_revokes_row() {
        let state = state_with_user(true);
        let pair = state.tokens.issue("alice").unwrap();
        let jar = CookieJar::new().add(session_cookie(REFRESH_COOKIE, pair.refresh.clone(), 60));

        let (jar, _) = logout_handler(State(state.clone()), jar).await;

        assert!(state.tokens.lookup(&pair.refresh).is_none());
        assert_eq!(jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()), Some(String::new()));
    }

    #[tokio::test]
    async fn test_me_handler_unknown_caller() {
        let state = state_with_user(true);

        let result = me_handler(State(state), Extension(Caller("ghost".to_string()))).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_root_handler() {
        let response = root_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
