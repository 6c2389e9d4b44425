//! Session Middleware
//!
//! Every request outside the public allow-list must carry a valid refresh
//! cookie whose fingerprint row still exists. A missing or expired access
//! cookie is re-minted from the refresh token; the refresh token itself is
//! never reissued here.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::auth::token::{TokenError, ACCESS_TTL_SECS};
use crate::cache::{get_one, set_one};
use crate::error::ApiError;
use crate::store::User;

pub const ACCESS_COOKIE: &str = "access-token";
pub const REFRESH_COOKIE: &str = "refresh-token";

/// Max-Age sent when a cookie is cleared.
const CLEARED_MAX_AGE_SECS: i64 = -300;

/// Paths reachable without a session.
pub const PUBLIC_PATHS: &[&str] = &[
    "/api/v1",
    "/api/v1/auth",
    "/api/v1/auth/logout",
    "/api/v1/dump",
    "/api/v1/live",
    "/api/v1/users/activation",
    "/api/v1/users/passphrase/request",
    "/api/v1/users/passphrase/reset",
];

/// Nickname of the authenticated caller, attached as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

// == Cookies ==
/// HttpOnly, Secure cookie scoped to the whole site.
pub fn session_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Empty cookie with a negative Max-Age, making the client drop it.
pub fn cleared_cookie(name: &'static str) -> Cookie<'static> {
    session_cookie(name, String::new(), CLEARED_MAX_AGE_SECS)
}

// == Middleware ==
struct Rejection {
    jar: CookieJar,
    error: ApiError,
}

impl Rejection {
    fn new(jar: CookieJar, error: ApiError) -> Self {
        Self { jar, error }
    }

    /// Rejects and tells the client to forget its refresh cookie.
    fn revoked(jar: CookieJar, reason: &str) -> Self {
        Self::new(
            jar.add(cleared_cookie(REFRESH_COOKIE)),
            ApiError::Unauthorized(reason.to_string()),
        )
    }
}

/// Resolves the caller from the session cookies or rejects the request.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if is_public(req.uri().path()) {
        return next.run(req).await;
    }

    let now = Utc::now();
    match authenticate(&state, jar, now) {
        Ok((nickname, jar)) => {
            note_activity(&state, &nickname, now);
            req.extensions_mut().insert(Caller(nickname));
            (jar, next.run(req).await).into_response()
        }
        Err(Rejection { jar, error }) => {
            warn!("{} {}: {}", req.method(), req.uri().path(), error);
            (jar, error).into_response()
        }
    }
}

fn authenticate(
    state: &AppState,
    jar: CookieJar,
    now: DateTime<Utc>,
) -> Result<(String, CookieJar), Rejection> {
    let tokens = &state.tokens;
    if !tokens.has_secret() {
        return Err(Rejection::new(
            jar,
            ApiError::from(TokenError::MissingSecret),
        ));
    }

    let Some(refresh) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) else {
        return Err(Rejection::new(
            jar,
            ApiError::Unauthorized("no refresh token".to_string()),
        ));
    };
    let refresh_claims = tokens
        .verify_refresh(&refresh, now)
        .map_err(|e| Rejection::new(jar.clone(), ApiError::from(e)))?;

    // A foreign or expired access token is handled like a missing one.
    let access_valid = jar
        .get(ACCESS_COOKIE)
        .map(|cookie| tokens.verify_access(cookie.value(), now).is_ok())
        .unwrap_or(false);

    let row = match tokens.lookup(&refresh) {
        Some(row) => row,
        None => {
            return Err(Rejection::revoked(
                jar,
                "refresh token has been invalidated, redo the auth process",
            ))
        }
    };

    if access_valid {
        return Ok((row.nickname, jar));
    }

    if get_one(state.db.users.as_ref(), &row.nickname).is_none() {
        tokens.revoke_fingerprint(&row.hash);
        return Err(Rejection::revoked(jar, "referenced user could not be found"));
    }

    let access = tokens
        .mint_access(&row.nickname, &refresh_claims, now)
        .map_err(|e| Rejection::new(jar.clone(), ApiError::from(e)))?;
    let max_age = ACCESS_TTL_SECS.min(refresh_claims.remaining(now).num_seconds());
    debug!("new access token generated for {}", row.nickname);

    Ok((
        row.nickname,
        jar.add(session_cookie(ACCESS_COOKIE, access, max_age)),
    ))
}

/// Refreshes the caller's last activity time.
fn note_activity(state: &AppState, nickname: &str, now: DateTime<Utc>) {
    let users = state.db.users.as_ref();
    if let Some(user) = get_one(users, nickname) {
        set_one(
            users,
            nickname,
            User {
                last_active_time: now,
                ..user
            },
        );
    }
}
