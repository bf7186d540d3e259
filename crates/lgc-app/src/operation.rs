//! Async operations: units of external work that resolve to one command

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use lgc_core::prelude::*;

use crate::command::Command;

type Recover = Box<dyn FnOnce(Error) -> Command + Send>;

/// A labelled future that always produces exactly one [`Command`]
///
/// Errors returned by the future, and panics raised while polling it, are
/// both handed to `recover`, so the coordinator always gets a command back.
pub struct AsyncOperation {
    label: String,
    future: BoxFuture<'static, Result<Command>>,
    recover: Recover,
}

impl AsyncOperation {
    pub fn new<F, R>(label: impl Into<String>, future: F, recover: R) -> Self
    where
        F: Future<Output = Result<Command>> + Send + 'static,
        R: FnOnce(Error) -> Command + Send + 'static,
    {
        Self {
            label: label.into(),
            future: future.boxed(),
            recover: Box::new(recover),
        }
    }

    /// An operation whose future cannot fail; `fallback` only runs if it panics
    pub fn infallible<F, R>(label: impl Into<String>, future: F, fallback: R) -> Self
    where
        F: Future<Output = Command> + Send + 'static,
        R: FnOnce() -> Command + Send + 'static,
    {
        Self::new(label, future.map(Ok), move |_| fallback())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Drive the operation to completion
    pub async fn run(self) -> Command {
        let Self {
            label,
            future,
            recover,
        } = self;

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(command)) => command,
            Ok(Err(err)) => {
                if err.is_recoverable() {
                    warn!("operation '{}' failed: {}", label, err);
                } else {
                    error!("operation '{}' failed: {}", label, err);
                }
                recover(err)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("operation '{}' panicked: {}", label, message);
                recover(Error::operation(label, message))
            }
        }
    }
}

impl fmt::Debug for AsyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOperation")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandDescriptor;

    const DONE: CommandDescriptor<String> = CommandDescriptor::new("test/DONE");

    #[tokio::test]
    async fn test_success_yields_command() {
        let op = AsyncOperation::new(
            "ok",
            async { Ok(DONE.create("value".into())) },
            |err| DONE.create(err.to_string()),
        );
        let cmd = op.run().await;
        assert_eq!(DONE.payload_of(&cmd).unwrap(), "value");
    }

    #[tokio::test]
    async fn test_error_is_recovered() {
        let op = AsyncOperation::new(
            "fails",
            async { Err(Error::process("boom")) },
            |err| DONE.create(format!("recovered: {err}")),
        );
        let cmd = op.run().await;
        assert!(DONE.payload_of(&cmd).unwrap().starts_with("recovered:"));
    }

    #[tokio::test]
    async fn test_panic_is_recovered() {
        let op = AsyncOperation::new(
            "panics",
            async {
                if true {
                    panic!("kaboom");
                }
                Ok(DONE.create(String::new()))
            },
            |err| DONE.create(err.to_string()),
        );
        let cmd = op.run().await;
        let payload = DONE.payload_of(&cmd).unwrap();
        assert!(payload.contains("kaboom"), "got {payload}");
        assert!(payload.contains("panics"), "got {payload}");
    }

    #[tokio::test]
    async fn test_infallible_passes_through() {
        let op = AsyncOperation::infallible("plain", async { DONE.create("x".into()) }, || {
            DONE.create("fallback".into())
        });
        assert_eq!(op.label(), "plain");
        assert_eq!(DONE.payload_of(&op.run().await).unwrap(), "x");
    }

    #[test]
    fn test_run_outside_async_context() {
        let op = AsyncOperation::new(
            "blocking",
            async { Err(Error::tool_not_found("lg")) },
            |err| DONE.create(err.to_string()),
        );
        let cmd = tokio_test::block_on(op.run());
        assert!(DONE.payload_of(&cmd).unwrap().contains("lg"));
    }
}
