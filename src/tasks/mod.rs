//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Token sweep: Removes expired refresh-token rows
//! - Snapshot: Dumps every table to the data directory

mod cleanup;
mod snapshot;

pub use cleanup::spawn_token_sweep_task;
pub use snapshot::spawn_snapshot_task;
