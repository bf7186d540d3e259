//! Typed commands with a stable string discriminator
//!
//! A [`CommandDescriptor<P>`] names one kind of command and fixes its payload
//! type. Commands are only ever built through a descriptor, so the payload
//! stored in a [`Command`] always has the type the descriptor declared.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Anything that can travel inside a [`Command`]
pub trait Payload: fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: fmt::Debug + Send + Sync + 'static> Payload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An immutable request to change state or trigger work
#[derive(Clone)]
pub struct Command {
    kind: &'static str,
    payload: Arc<dyn Payload>,
}

impl Command {
    /// Discriminator such as `"context/SELECT"`
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Borrow the payload as `P`, or `None` if it has another type
    pub fn payload<P: 'static>(&self) -> Option<&P> {
        Payload::as_any(&*self.payload).downcast_ref::<P>()
    }

    pub(crate) fn payload_type_id(&self) -> std::any::TypeId {
        Payload::as_any(&*self.payload).type_id()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("kind", &self.kind)
            .field("payload", &self.payload)
            .finish()
    }
}

/// Names a command kind and its payload type
pub struct CommandDescriptor<P> {
    kind: &'static str,
    _payload: PhantomData<fn() -> P>,
}

impl<P> CommandDescriptor<P> {
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            _payload: PhantomData,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn matches(&self, command: &Command) -> bool {
        command.kind == self.kind
    }
}

impl<P: Payload> CommandDescriptor<P> {
    pub fn create(&self, payload: P) -> Command {
        Command {
            kind: self.kind,
            payload: Arc::new(payload),
        }
    }

    /// The payload of `command` if it was built by this descriptor
    pub fn payload_of<'a>(&self, command: &'a Command) -> Option<&'a P> {
        if self.matches(command) {
            command.payload::<P>()
        } else {
            None
        }
    }
}

impl CommandDescriptor<()> {
    pub fn command(&self) -> Command {
        self.create(())
    }
}

impl<P> Clone for CommandDescriptor<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for CommandDescriptor<P> {}

impl<P> fmt::Debug for CommandDescriptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandDescriptor({})", self.kind)
    }
}
