//! Store Module
//!
//! The `Database` registry owns one table per entity kind and knows how to
//! snapshot all of them to disk and back.

pub mod entities;
pub mod snapshot;

use std::path::Path;
use std::thread;

use tracing::{error, info};

use crate::cache::{Cacher, Strategy, Table};

pub use entities::{Device, Poll, PollOption, Post, Request, RequestKind, Token, User};
pub use snapshot::{
    backup_path, dump_table, load_table, snapshot_path, summarize, SnapshotError, SnapshotOp,
    SnapshotReport,
};

// == Database ==
/// Every table the service keeps in memory.
pub struct Database {
    pub users: Table<User>,
    pub posts: Table<Post>,
    pub polls: Table<Poll>,
    pub requests: Table<Request>,
    /// Devices subscribed to push notifications, per nickname
    pub subscriptions: Table<Vec<Device>>,
    pub tokens: Table<Token>,
}

impl Database {
    /// Builds empty tables of the given strategy.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            users: strategy.build("users"),
            posts: strategy.build("posts"),
            polls: strategy.build("polls"),
            requests: strategy.build("requests"),
            subscriptions: strategy.build("subscriptions"),
            tokens: strategy.build("tokens"),
        }
    }

    /// Writes every table to `dir`, one thread per table.
    ///
    /// Blocks until all writers are done. Reports come back in table order;
    /// a writer that panics yields a failed report naming its table.
    pub fn dump_all(&self, dir: &Path) -> Vec<SnapshotReport> {
        let reports = thread::scope(|s| {
            let writers = [
                (self.users.name(), s.spawn(|| dump_table(self.users.as_ref(), dir))),
                (self.posts.name(), s.spawn(|| dump_table(self.posts.as_ref(), dir))),
                (self.polls.name(), s.spawn(|| dump_table(self.polls.as_ref(), dir))),
                (self.requests.name(), s.spawn(|| dump_table(self.requests.as_ref(), dir))),
                (
                    self.subscriptions.name(),
                    s.spawn(|| dump_table(self.subscriptions.as_ref(), dir)),
                ),
                (self.tokens.name(), s.spawn(|| dump_table(self.tokens.as_ref(), dir))),
            ];

            writers
                .into_iter()
                .map(|(name, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        let report = SnapshotReport::aborted(name);
                        error!("{}", report);
                        report
                    })
                })
                .collect::<Vec<_>>()
        });

        info!("{}", summarize("dump", &reports));
        reports
    }

    /// Reads every table back from `dir`, one after another, then marks
    /// every table ready whatever was found.
    ///
    /// A missing snapshot file only marks that table's report as failed.
    pub fn load_all(&self, dir: &Path) -> Vec<SnapshotReport> {
        let reports = vec![
            load_table(self.users.as_ref(), dir),
            load_table(self.posts.as_ref(), dir),
            load_table(self.polls.as_ref(), dir),
            load_table(self.requests.as_ref(), dir),
            load_table(self.subscriptions.as_ref(), dir),
            load_table(self.tokens.as_ref(), dir),
        ];
        self.mark_ready();

        info!("{}", summarize("load", &reports));
        reports
    }

    /// Opens every table to readers, including tables nothing was loaded into.
    pub fn mark_ready(&self) {
        self.users.mark_ready();
        self.posts.mark_ready();
        self.polls.mark_ready();
        self.requests.mark_ready();
        self.subscriptions.mark_ready();
        self.tokens.mark_ready();
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(Strategy::default())
    }
}
