//! Token Sweep Task
//!
//! Background task that periodically removes expired refresh-token rows.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::TokenService;

/// Spawns a background task that periodically deletes expired token rows.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Returns `None` without spawning when the interval is 0.
///
/// # Example
/// ```ignore
/// let sweep_handle = spawn_token_sweep_task(state.tokens.clone(), 3600);
/// // Later, during shutdown:
/// if let Some(handle) = sweep_handle { handle.abort(); }
/// ```
pub fn spawn_token_sweep_task(tokens: TokenService, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        info!("Token sweep disabled");
        return None;
    }
    let interval = Duration::from_secs(interval_secs);

    Some(tokio::spawn(async move {
        info!(
            "Starting token sweep task with interval of {} seconds",
            interval_secs
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let removed = tokens.sweep_expired(Utc::now());
            if removed == 0 {
                debug!("Token sweep: no expired tokens found");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::REFRESH_TTL_SECS;
    use crate::cache::{Cacher, RwLockCache, Table};
    use crate::store::Token;
    use std::sync::Arc;

    fn service() -> TokenService {
        let tokens: Table<Token> = Arc::new(RwLockCache::new("tokens"));
        TokenService::new(tokens, Some("pepper".to_string()))
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_tokens() {
        let tokens = service();
        let stale = Utc::now() - chrono::Duration::seconds(REFRESH_TTL_SECS + 5);
        let old = tokens.issue_at("alice", stale).unwrap();
        let fresh = tokens.issue("alice").unwrap();

        let handle = spawn_token_sweep_task(tokens.clone(), 1).unwrap();

        // Wait for the sweep to run
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(tokens.lookup(&old.refresh).is_none());
        assert!(tokens.lookup(&fresh.refresh).is_some());
        assert_eq!(tokens.tokens().range().1, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_disabled_with_zero_interval() {
        assert!(spawn_token_sweep_task(service(), 0).is_none());
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let handle = spawn_token_sweep_task(service(), 1).unwrap();

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
