//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::cache::Strategy;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Directory holding one snapshot file per table
    pub data_dir: PathBuf,
    /// Locking strategy every table is built with
    pub cache_strategy: Strategy,
    /// Server secret used to sign tokens and pepper passphrases
    pub secret: Option<String>,
    /// Shared token expected in the `X-Dump-Token` header
    pub api_token: Option<String>,
    /// Restore tables from `data_dir` before serving
    pub load_on_start: bool,
    /// Seconds between periodic snapshots, 0 disables them
    pub dump_interval: u64,
    /// Seconds between expired-token sweeps, 0 disables them
    pub token_sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `DATA_DIR` - Snapshot directory (default: /opt/data)
    /// - `CACHE_STRATEGY` - `mutex`, `rwlock` or `signal` (default: rwlock)
    /// - `APP_PEPPER` - Server secret (no default)
    /// - `API_TOKEN` - Dump endpoint token (no default)
    /// - `LOAD_ON_START` - Restore snapshots at startup (default: true)
    /// - `DUMP_INTERVAL` - Snapshot frequency in seconds (default: 300)
    /// - `TOKEN_SWEEP_INTERVAL` - Token sweep frequency in seconds (default: 3600)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parsed("SERVER_PORT").unwrap_or(defaults.server_port),
            data_dir: env::var("DATA_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cache_strategy: env::var("CACHE_STRATEGY")
                .ok()
                .and_then(|v| match v.parse() {
                    Ok(strategy) => Some(strategy),
                    Err(e) => {
                        warn!("{}, falling back to {}", e, defaults.cache_strategy);
                        None
                    }
                })
                .unwrap_or(defaults.cache_strategy),
            secret: non_empty("APP_PEPPER"),
            api_token: non_empty("API_TOKEN"),
            load_on_start: env::var("LOAD_ON_START")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.load_on_start),
            dump_interval: parsed("DUMP_INTERVAL").unwrap_or(defaults.dump_interval),
            token_sweep_interval: parsed("TOKEN_SWEEP_INTERVAL")
                .unwrap_or(defaults.token_sweep_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            data_dir: PathBuf::from("/opt/data"),
            cache_strategy: Strategy::RwLock,
            secret: None,
            api_token: None,
            load_on_start: true,
            dump_interval: 300,
            token_sweep_interval: 3600,
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
