//! Per-kind deduplication of concurrent reloads
//!
//! A guarded batch of operations holds one [`InFlightTicket`] for its kind.
//! While the ticket lives, further batches of that kind are skipped. The flag
//! is cleared when the ticket drops, which also happens on abort and panic.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Reload families that must not run twice concurrently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Templates, sections, tokenizer libs, mode-sets and tag-sets
    Catalogs,
    /// Provider availability detection
    Targets,
    Branches,
    /// Rendering (and optionally sending) a listing
    Listing,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Catalogs => "catalogs",
            Self::Targets => "targets",
            Self::Branches => "branches",
            Self::Listing => "listing",
        };
        f.write_str(name)
    }
}

/// The set of kinds currently in flight
#[derive(Debug, Clone, Default)]
pub struct InFlightGuards {
    active: Arc<Mutex<HashSet<OperationKind>>>,
}

impl InFlightGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `kind` as in flight, or `None` if it already is
    pub fn try_acquire(&self, kind: OperationKind) -> Option<InFlightTicket> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.insert(kind).then(|| InFlightTicket {
            kind,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, kind: OperationKind) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind)
    }
}

/// Holds one kind in flight until dropped
#[derive(Debug)]
pub struct InFlightTicket {
    kind: OperationKind,
    active: Arc<Mutex<HashSet<OperationKind>>>,
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let guards = InFlightGuards::new();
        let ticket = guards.try_acquire(OperationKind::Catalogs);
        assert!(ticket.is_some());
        assert!(guards.try_acquire(OperationKind::Catalogs).is_none());
        assert!(guards.is_active(OperationKind::Catalogs));
    }

    #[test]
    fn test_drop_clears_flag() {
        let guards = InFlightGuards::new();
        let ticket = guards.try_acquire(OperationKind::Branches).unwrap();
        drop(ticket);
        assert!(!guards.is_active(OperationKind::Branches));
        assert!(guards.try_acquire(OperationKind::Branches).is_some());
    }

    #[test]
    fn test_kinds_are_independent() {
        let guards = InFlightGuards::new();
        let _catalogs = guards.try_acquire(OperationKind::Catalogs).unwrap();
        assert!(guards.try_acquire(OperationKind::Targets).is_some());
    }

    #[test]
    fn test_shared_ticket_clears_after_last_holder() {
        let guards = InFlightGuards::new();
        let shared = Arc::new(guards.try_acquire(OperationKind::Listing).unwrap());
        let a = Arc::clone(&shared);
        let b = Arc::clone(&shared);
        drop(shared);
        drop(a);
        assert!(guards.is_active(OperationKind::Listing));
        drop(b);
        assert!(!guards.is_active(OperationKind::Listing));
    }

    #[test]
    fn test_flag_cleared_when_holder_panics() {
        let guards = InFlightGuards::new();
        let clone = guards.clone();
        let result = std::thread::spawn(move || {
            let _ticket = clone.try_acquire(OperationKind::Targets).unwrap();
            panic!("operation blew up");
        })
        .join();
        assert!(result.is_err());
        assert!(!guards.is_active(OperationKind::Targets));
    }
}
