//! API Module
//!
//! HTTP handlers and routing.
//!
//! # Endpoints
//! - `GET /api/v1` - Health check
//! - `POST /api/v1/auth` - Log in
//! - `POST /api/v1/auth/logout` - Log out
//! - `GET /api/v1/users/me` - Caller's user record
//! - `GET /api/v1/dump` - Token-gated snapshot of every table

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
