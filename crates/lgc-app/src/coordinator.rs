//! The dispatch loop
//!
//! Every state change goes through [`Coordinator::dispatch`]:
//!
//! 1. take the mutation lane (one mutex for all callers)
//! 2. look up the rule and evaluate its guard
//! 3. apply it, commit the new snapshot and notify observers
//! 4. release the lane, launch async operations on their own tasks
//! 5. dispatch follow-up commands synchronously, in order
//!
//! Async operations re-enter through `dispatch` when they complete.

use std::cell::Cell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tokio::task::AbortHandle;

use lgc_core::prelude::*;

use crate::command::Command;
use crate::in_flight::{InFlightGuards, InFlightTicket, OperationKind};
use crate::observer::{FnObserver, SnapshotObserver, SubscriptionId};
use crate::operation::AsyncOperation;
use crate::registry::{Evaluation, Lookup, Registry};
use crate::state::{PersistentState, Snapshot};
use crate::transition::Transition;

thread_local! {
    static IN_LANE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as holding the mutation lane
struct LaneMarker;

impl LaneMarker {
    fn enter() -> Self {
        IN_LANE.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for LaneMarker {
    fn drop(&mut self) {
        IN_LANE.with(|flag| flag.set(false));
    }
}

struct Lane {
    snapshot: Arc<Snapshot>,
}

type ObserverList = Vec<(SubscriptionId, Arc<dyn SnapshotObserver>)>;

struct Inner {
    registry: Arc<Registry>,
    lane: Mutex<Lane>,
    published: watch::Sender<Arc<Snapshot>>,
    /// Written under the lane, read without it
    revision: AtomicU64,
    observers: RwLock<ObserverList>,
    runtime: Handle,
    in_flight: InFlightGuards,
    pending: AtomicUsize,
    idle: Notify,
    tasks: Mutex<HashMap<u64, AbortHandle>>,
    next_task: AtomicU64,
    next_subscription: AtomicU64,
    closed: AtomicBool,
}

/// Decrements the outstanding-task count when a task ends, however it ends
struct PendingGuard {
    inner: Arc<Inner>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.inner.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Owns the application state; cheap to clone
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    /// Create a coordinator on the current tokio runtime
    pub fn new(registry: impl Into<Arc<Registry>>, initial: PersistentState) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::no_runtime(e.to_string()))?;
        let snapshot = Arc::new(Snapshot::new(initial));
        let (published, _) = watch::channel(Arc::clone(&snapshot));

        Ok(Self {
            inner: Arc::new(Inner {
                registry: registry.into(),
                lane: Mutex::new(Lane { snapshot }),
                published,
                revision: AtomicU64::new(0),
                observers: RwLock::new(Vec::new()),
                runtime,
                in_flight: InFlightGuards::new(),
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
                tasks: Mutex::new(HashMap::new()),
                next_task: AtomicU64::new(0),
                next_subscription: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Current snapshot; stays valid after later commits
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.published.borrow())
    }

    /// Number of commits so far
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    /// Receiver that always holds the latest snapshot
    pub fn watch(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.published.subscribe()
    }

    pub fn subscribe(&self, observer: impl SnapshotObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(observer)));
        id
    }

    pub fn subscribe_fn<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&Snapshot, u64) + Send + Sync + 'static,
    {
        self.subscribe(FnObserver(f))
    }

    /// Returns `false` if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut observers = self
                .inner
                .observers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            observers
                .iter()
                .position(|(sid, _)| *sid == id)
                .map(|index| observers.remove(index))
        };
        removed.is_some()
    }

    pub fn is_in_flight(&self, kind: OperationKind) -> bool {
        self.inner.in_flight.is_active(kind)
    }

    /// Submit a command. Never blocks on async work.
    pub fn dispatch(&self, command: Command) {
        if IN_LANE.with(Cell::get) {
            warn!(
                "'{}' dispatched from inside a commit; deferring",
                command.kind()
            );
            let this = self.clone();
            self.spawn_tracked(async move { this.dispatch(command) });
            return;
        }

        let Some(transition) = self.evaluate_and_commit(&command) else {
            return;
        };
        let Transition {
            operations,
            guarded,
            follow_ups,
            ..
        } = transition;

        for operation in operations {
            self.launch(operation, None);
        }

        if let Some(batch) = guarded {
            match self.inner.in_flight.try_acquire(batch.kind) {
                Some(ticket) => {
                    let ticket = Arc::new(ticket);
                    for operation in batch.operations {
                        self.launch(operation, Some(Arc::clone(&ticket)));
                    }
                }
                None => debug!(
                    "{} already in flight; skipping {} operation(s) from '{}'",
                    batch.kind,
                    batch.operations.len(),
                    command.kind()
                ),
            }
        }

        for follow_up in follow_ups {
            self.dispatch(follow_up);
        }
    }

    /// Resolves once no async operation is outstanding
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Abort every outstanding operation; later launches are skipped
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let handles: Vec<_> = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        info!("coordinator shutting down; aborting {} task(s)", handles.len());
        for handle in handles {
            handle.abort();
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────

    fn lane(&self) -> std::sync::MutexGuard<'_, Lane> {
        // A panicking rule leaves the previous snapshot in place.
        self.inner.lane.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Steps 1-6: under the lane, evaluate the rule and commit its mutations
    fn evaluate_and_commit(&self, command: &Command) -> Option<Transition> {
        let mut lane = self.lane();
        let _marker = LaneMarker::enter();
        let kind = command.kind();

        let evaluation = match self.inner.registry.evaluate(&lane.snapshot, command) {
            Ok(evaluation) => evaluation,
            Err(Lookup::UnknownKind) => {
                warn!("unknown command kind '{}'; dropped", kind);
                return None;
            }
            Err(Lookup::NoRule) => {
                warn!("no rule for '{}'; dropped", kind);
                return None;
            }
        };

        let mut transition = match evaluation {
            Evaluation::Apply(transition) => transition,
            Evaluation::Rejected => {
                debug!("guard rejected '{}'", kind);
                return None;
            }
            Evaluation::Mismatch => {
                error!("payload of '{}' has the wrong type; dropped", kind);
                return None;
            }
        };

        if transition.has_mutations() {
            let next = Arc::new(apply_mutations(&lane.snapshot, &mut transition));
            lane.snapshot = Arc::clone(&next);
            let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;

            self.inner.published.send_replace(Arc::clone(&next));
            self.notify(&next, revision);
            debug!("commit #{} by '{}'", revision, kind);
        } else {
            trace!("'{}' committed nothing", kind);
        }

        Some(transition)
    }

    fn notify(&self, snapshot: &Snapshot, revision: u64) {
        let observers: Vec<_> = self
            .inner
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.on_commit(snapshot, revision);
        }
    }

    fn launch(&self, operation: AsyncOperation, ticket: Option<Arc<InFlightTicket>>) {
        if self.inner.closed.load(Ordering::SeqCst) {
            debug!("coordinator closed; not launching '{}'", operation.label());
            return;
        }
        trace!("launching '{}'", operation.label());

        let this = self.clone();
        self.spawn_tracked(async move {
            let command = operation.run().await;
            // Release the kind before its result re-enters the pipeline.
            drop(ticket);
            this.dispatch(command);
        });
    }

    fn spawn_tracked<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let pending = PendingGuard {
            inner: Arc::clone(&self.inner),
        };
        let handle = self.inner.runtime.spawn(async move {
            let _pending = pending;
            future.await;
        });

        let id = self.inner.next_task.fetch_add(1, Ordering::Relaxed);
        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(id, handle.abort_handle());
    }
}

/// Build the next snapshot: mutated partitions replaced, others shared
fn apply_mutations(current: &Snapshot, transition: &mut Transition) -> Snapshot {
    Snapshot {
        persistent: match transition.persistent.take() {
            Some(mutate) => Arc::new(mutate(&current.persistent)),
            None => Arc::clone(&current.persistent),
        },
        configuration: match transition.configuration.take() {
            Some(mutate) => Arc::new(mutate(&current.configuration)),
            None => Arc::clone(&current.configuration),
        },
        environment: match transition.environment.take() {
            Some(mutate) => Arc::new(mutate(&current.environment)),
            None => Arc::clone(&current.environment),
        },
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("registry", &self.inner.registry)
            .field("pending", &self.inner.pending.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
