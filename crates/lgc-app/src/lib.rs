//! lgc-app - State coordination for lg-coordinator
//!
//! A single [`Coordinator`] owns an immutable [`Snapshot`] split into three
//! partitions (persistent selections, tool catalogs, session environment).
//! Every change goes through one pipeline:
//!
//! 1. a [`Command`] is dispatched,
//! 2. its rule's guard inspects the current snapshot,
//! 3. the rule's [`Transition`] is applied, published and observed,
//! 4. async operations are launched and follow-ups dispatched.
//!
//! Operations report back by dispatching commands of their own, so the only
//! way state ever changes is through a rule.
//!
//! The domain rules (catalogs, selection, tokenizer, provider, environment,
//! listing) live in [`domain`]; [`registry()`] wires them to [`Services`].

pub mod command;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod in_flight;
pub mod nested;
pub mod observer;
pub mod operation;
pub mod providers;
pub mod registry;
pub mod services;
pub mod state;
pub mod transition;

// Re-export primary types
pub use command::{Command, CommandDescriptor, Payload};
pub use coordinator::Coordinator;
pub use domain::registry;
pub use in_flight::OperationKind;
pub use observer::{FnObserver, SnapshotObserver, SubscriptionId};
pub use operation::AsyncOperation;
pub use registry::{Registry, RegistryBuilder};
pub use services::{Runner, Services};
pub use state::{ConfigState, EnvState, PersistentState, Snapshot};
pub use transition::Transition;

// Re-export tool types used by the binary
pub use lgc_tool::{ProcessRunner, ToolAvailability};
