//! Test utilities for tool-backed code
//!
//! [`ScriptedRunner`] is a [`ToolRunner`] that answers from a table of canned
//! replies keyed by argument prefix, records every invocation, and can hold
//! all calls open until released (for in-flight and ordering tests).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use lgc_core::prelude::*;

use crate::process::{Invocation, ToolOutput, ToolRunner};

/// Canned behaviour for a matching invocation
#[derive(Debug, Clone)]
pub enum Reply {
    Stdout(String),
    NotFound,
    Exit { code: i32, stderr: String },
    Timeout,
    /// Panic inside the runner, simulating a bug in an operation
    Panic(String),
}

#[derive(Debug)]
struct Script {
    replies: Mutex<Vec<(Vec<String>, Reply)>>,
    calls: Mutex<Vec<Invocation>>,
    gate: watch::Sender<bool>,
}

/// Scripted [`ToolRunner`]; clones share the same script and call log
#[derive(Debug, Clone)]
pub struct ScriptedRunner {
    script: Arc<Script>,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            script: Arc::new(Script {
                replies: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                gate,
            }),
        }
    }

    /// Answer invocations whose args start with `prefix`; the longest
    /// matching prefix wins.
    pub fn on(&self, prefix: &[&str], reply: Reply) -> &Self {
        let prefix = prefix.iter().map(|s| s.to_string()).collect();
        self.script.replies.lock().unwrap().push((prefix, reply));
        self
    }

    /// Shorthand for a successful JSON/text reply
    pub fn stdout(&self, prefix: &[&str], stdout: impl Into<String>) -> &Self {
        self.on(prefix, Reply::Stdout(stdout.into()))
    }

    /// Block every subsequent `run` until [`release`](Self::release)
    pub fn hold(&self) {
        self.script.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.script.gate.send_replace(true);
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.script.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls whose args start with `prefix`
    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|inv| starts_with(&inv.args, prefix))
            .count()
    }

    fn lookup(&self, args: &[String]) -> Option<Reply> {
        let replies = self.script.replies.lock().unwrap();
        replies
            .iter()
            .filter(|(prefix, _)| args.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, reply)| reply.clone())
    }
}

fn starts_with(args: &[String], prefix: &[&str]) -> bool {
    args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| a == p)
}

impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: Invocation) -> Result<ToolOutput> {
        self.script.calls.lock().unwrap().push(invocation.clone());

        let mut gate = self.script.gate.subscribe();
        // Sender lives in `self`, so the channel cannot close while waiting.
        let _ = gate.wait_for(|open| *open).await;

        match self.lookup(&invocation.args) {
            Some(Reply::Stdout(stdout)) => Ok(ToolOutput {
                stdout,
                stderr: String::new(),
            }),
            Some(Reply::NotFound) => Err(Error::tool_not_found(invocation.program)),
            Some(Reply::Exit { code, stderr }) => Err(Error::ToolExit {
                program: invocation.program,
                code: Some(code),
                stderr,
            }),
            Some(Reply::Timeout) => Err(Error::ToolTimeout {
                program: invocation.program,
                timeout: Duration::from_millis(1),
            }),
            Some(Reply::Panic(message)) => panic!("{}", message),
            None => Err(Error::ToolExit {
                program: invocation.program,
                code: Some(2),
                stderr: format!("unscripted invocation: {}", invocation.args.join(" ")),
            }),
        }
    }
}
