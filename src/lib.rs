//! Flowkeep - in-memory tables with snapshot persistence and cookie sessions
//!
//! Named key-value tables with interchangeable locking strategies, JSON
//! snapshots on disk, and a two-tier access/refresh token session layer.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use store::Database;
pub use tasks::{spawn_snapshot_task, spawn_token_sweep_task};
