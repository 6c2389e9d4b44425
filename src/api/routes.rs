//! API Routes
//!
//! Configures the Axum router with every endpoint and the session middleware.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    auth_handler, dump_handler, logout_handler, me_handler, root_handler, AppState,
};
use crate::auth::require_session;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/v1` - Health check
/// - `POST /api/v1/auth` - Log in, sets both session cookies
/// - `POST /api/v1/auth/logout` - Revoke the session and clear cookies
/// - `GET /api/v1/users/me` - Caller's own user record
/// - `GET /api/v1/dump` - Snapshot every table (token-gated)
///
/// # Middleware
/// - Session: rejects requests outside the public allow-list without a session
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1", get(root_handler))
        .route("/api/v1/auth", post(auth_handler))
        .route("/api/v1/auth/logout", post(logout_handler))
        .route("/api/v1/users/me", get(me_handler))
        .route("/api/v1/dump", get(dump_handler))
        .layer(from_fn_with_state(state.clone(), require_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
