//! What a rule asks the coordinator to do
//!
//! A [`Transition`] bundles partition mutations (applied atomically in one
//! commit), async operations to launch after the commit, an optional batch
//! guarded by an [`OperationKind`], and follow-up commands.

use std::fmt;

use crate::command::Command;
use crate::in_flight::OperationKind;
use crate::operation::AsyncOperation;
use crate::state::{ConfigState, EnvState, PersistentState};

/// Pure partition update: old value in, new value out
pub type Mutation<S> = Box<dyn FnOnce(&S) -> S + Send>;

/// Operations launched together under one in-flight ticket
pub struct GuardedBatch {
    pub kind: OperationKind,
    pub operations: Vec<AsyncOperation>,
}

#[derive(Default)]
pub struct Transition {
    pub(crate) persistent: Option<Mutation<PersistentState>>,
    pub(crate) configuration: Option<Mutation<ConfigState>>,
    pub(crate) environment: Option<Mutation<EnvState>>,
    pub(crate) operations: Vec<AsyncOperation>,
    pub(crate) guarded: Option<GuardedBatch>,
    pub(crate) follow_ups: Vec<Command>,
}

/// Chain `next` after an existing mutation, if any
fn compose<S: 'static>(
    current: Option<Mutation<S>>,
    next: impl FnOnce(&S) -> S + Send + 'static,
) -> Mutation<S> {
    match current {
        None => Box::new(next),
        Some(first) => Box::new(move |state: &S| {
            let intermediate = first(state);
            next(&intermediate)
        }),
    }
}

impl Transition {
    /// Nothing to do
    pub fn none() -> Self {
        Self::default()
    }

    pub fn update_persistent(
        mut self,
        f: impl FnOnce(&PersistentState) -> PersistentState + Send + 'static,
    ) -> Self {
        self.persistent = Some(compose(self.persistent.take(), f));
        self
    }

    pub fn update_configuration(
        mut self,
        f: impl FnOnce(&ConfigState) -> ConfigState + Send + 'static,
    ) -> Self {
        self.configuration = Some(compose(self.configuration.take(), f));
        self
    }

    pub fn update_environment(
        mut self,
        f: impl FnOnce(&EnvState) -> EnvState + Send + 'static,
    ) -> Self {
        self.environment = Some(compose(self.environment.take(), f));
        self
    }

    pub fn launch(mut self, operation: AsyncOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn launch_all(mut self, operations: impl IntoIterator<Item = AsyncOperation>) -> Self {
        self.operations.extend(operations);
        self
    }

    /// Launch `operations` only if no batch of `kind` is in flight
    pub fn launch_guarded(
        mut self,
        kind: OperationKind,
        operations: impl IntoIterator<Item = AsyncOperation>,
    ) -> Self {
        match &mut self.guarded {
            Some(batch) if batch.kind == kind => batch.operations.extend(operations),
            Some(batch) => {
                tracing::error!(
                    "transition already guards {}; dropping {} batch",
                    batch.kind,
                    kind
                );
            }
            None => {
                self.guarded = Some(GuardedBatch {
                    kind,
                    operations: operations.into_iter().collect(),
                })
            }
        }
        self
    }

    pub fn follow_up(mut self, command: Command) -> Self {
        self.follow_ups.push(command);
        self
    }

    pub fn has_mutations(&self) -> bool {
        self.persistent.is_some() || self.configuration.is_some() || self.environment.is_some()
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("persistent", &self.persistent.is_some())
            .field("configuration", &self.configuration.is_some())
            .field("environment", &self.environment.is_some())
            .field("operations", &self.operations)
            .field("guarded", &self.guarded.as_ref().map(|b| (b.kind, b.operations.len())))
            .field("follow_ups", &self.follow_ups)
            .finish()
    }
}
