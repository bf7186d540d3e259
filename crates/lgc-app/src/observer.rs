//! Synchronous commit observers
//!
//! Observers run inside the mutation lane, once per commit, in commit order.
//! They must not call `Coordinator::dispatch` directly; spawn a task that
//! does instead. For async consumers prefer `Coordinator::watch()`.

use std::fmt;

use crate::state::Snapshot;

/// Handle returned by `Coordinator::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

#[cfg_attr(test, mockall::automock)]
pub trait SnapshotObserver: Send + Sync {
    /// Called after every commit with the new snapshot and its revision
    fn on_commit(&self, snapshot: &Snapshot, revision: u64);
}

/// Adapts a closure into a [`SnapshotObserver`]
pub struct FnObserver<F>(pub F);

impl<F> SnapshotObserver for FnObserver<F>
where
    F: Fn(&Snapshot, u64) + Send + Sync,
{
    fn on_commit(&self, snapshot: &Snapshot, revision: u64) {
        (self.0)(snapshot, revision)
    }
}

impl<F> fmt::Debug for FnObserver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnObserver")
    }
}
