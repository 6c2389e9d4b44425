//! Snapshot Persistence
//!
//! Writes each table to `<dir>/<name>.json` wrapped in an `{"items": {...}}`
//! envelope and reads it back. A failed primary write is retried once against
//! `<file>.bak`; a load stops at the first item the table refuses to save.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::cache::{set_one, Cacher};

/// Suffix of the fallback file used when the primary write fails.
pub const BACKUP_SUFFIX: &str = ".bak";

// == Snapshot Error ==
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("empty data on input ({})", .0.display())]
    Empty(PathBuf),

    #[error("cannot encode {name}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },

    #[error("cannot decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot load item from file '{}' (key: {key})", .path.display())]
    Save { path: PathBuf, key: String },

    #[error("dump of {0} aborted by a panic")]
    Aborted(String),
}

#[derive(Serialize)]
struct Envelope<'a, V> {
    items: &'a HashMap<String, V>,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    items: HashMap<String, serde_json::Value>,
}

// == Snapshot Report ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOp {
    Dump,
    Load,
}

/// Outcome of dumping or loading one table.
#[derive(Debug)]
pub struct SnapshotReport {
    pub name: String,
    pub op: SnapshotOp,
    /// Items written or loaded
    pub count: usize,
    /// Items that were candidates
    pub total: usize,
    pub error: Option<SnapshotError>,
}

impl SnapshotReport {
    /// Report for a dump whose writer never returned.
    pub fn aborted(name: &str) -> Self {
        Self {
            name: name.to_string(),
            op: SnapshotOp::Dump,
            count: 0,
            total: 0,
            error: Some(SnapshotError::Aborted(name.to_string())),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for SnapshotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            SnapshotOp::Dump => match &self.error {
                None => write!(f, "[{}] dumped: {}", self.name, self.count),
                Some(e) => write!(f, "[{}] dump failed: {} ({})", self.name, self.count, e),
            },
            SnapshotOp::Load => {
                let pct = if self.total == 0 {
                    0.0
                } else {
                    self.count as f64 / self.total as f64 * 100.0
                };
                write!(f, "{}/{} {} ({:.0}%)", self.count, self.total, self.name, pct)?;
                if let Some(e) = &self.error {
                    write!(f, " but err: {}", e)?;
                }
                Ok(())
            }
        }
    }
}

/// Joins per-table reports into one line for operators.
pub fn summarize(verb: &str, reports: &[SnapshotReport]) -> String {
    let parts: Vec<String> = reports.iter().map(|r| r.to_string()).collect();
    format!("{}: {}", verb, parts.join(", "))
}

// == Paths ==
/// File a table is persisted to.
pub fn snapshot_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

/// Fallback file for `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(BACKUP_SUFFIX);
    PathBuf::from(raw)
}

// == Dump ==
/// Serializes every item of `cache` into its snapshot file under `dir`.
pub fn dump_table<C>(cache: &C, dir: &Path) -> SnapshotReport
where
    C: Cacher + ?Sized,
    C::Value: Serialize,
{
    let name = cache.name().to_string();
    // A table that was never written still dumps as empty.
    let (items, total) = cache.peek_range();

    let mut report = SnapshotReport {
        name: name.clone(),
        op: SnapshotOp::Dump,
        count: 0,
        total,
        error: None,
    };

    let data = match serde_json::to_vec(&Envelope { items: &items }) {
        Ok(data) => data,
        Err(source) => {
            report.error = Some(SnapshotError::Encode { name, source });
            return report;
        }
    };

    match write_with_backup(&snapshot_path(dir, &name), &data) {
        Ok(()) => report.count = total,
        Err(e) => report.error = Some(e),
    }
    report
}

fn write_with_backup(path: &Path, data: &[u8]) -> Result<(), SnapshotError> {
    let first = match fs::write(path, data) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    warn!("write error on {}: {}, trying backup file", path.display(), first);

    let backup = backup_path(path);
    fs::write(&backup, data).map_err(|source| {
        error!("backup write failed on {}: {}", backup.display(), source);
        SnapshotError::Write {
            path: backup.clone(),
            source,
        }
    })
}

// == Load ==
/// Reads the snapshot file for `cache` and saves every item through `set_one`.
///
/// Items whose shape does not match the table type, or whose key is empty,
/// are skipped. The first item the table refuses to save aborts the load;
/// items saved before it stay in the table.
pub fn load_table<C>(cache: &C, dir: &Path) -> SnapshotReport
where
    C: Cacher + ?Sized,
    C::Value: DeserializeOwned + PartialEq,
{
    let name = cache.name().to_string();
    let path = snapshot_path(dir, &name);

    let mut report = SnapshotReport {
        name,
        op: SnapshotOp::Load,
        count: 0,
        total: 0,
        error: None,
    };

    let envelope = match read_envelope(&path) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("{}", e);
            report.error = Some(e);
            return report;
        }
    };
    report.total = envelope.items.len();

    for (key, raw) in envelope.items {
        if key.is_empty() {
            continue;
        }

        let value = match serde_json::from_value::<C::Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("skipping {} item '{}': {}", report.name, key, e);
                continue;
            }
        };

        if !set_one(cache, &key, value) {
            let e = SnapshotError::Save {
                path: path.clone(),
                key,
            };
            error!("{}", e);
            report.error = Some(e);
            return report;
        }
        report.count += 1;
    }

    debug!("{}", report);
    report
}

fn read_envelope(path: &Path) -> Result<RawEnvelope, SnapshotError> {
    let raw = fs::read(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(SnapshotError::Empty(path.to_path_buf()));
    }

    serde_json::from_slice(&raw).map_err(|source| SnapshotError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
