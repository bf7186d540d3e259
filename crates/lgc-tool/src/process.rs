//! External process invocation
//!
//! Every call into the listing tool or git goes through a [`ToolRunner`]. The
//! production implementation, [`ProcessRunner`], spawns a child with
//! `kill_on_drop(true)` so an aborted async operation never leaks a process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use lgc_core::prelude::*;

/// Default timeout for a single tool invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Payload written to the child's stdin, which is then closed
    pub stdin: Option<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
            cwd: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `program arg1 arg2 ...` for log lines
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external commands
///
/// Implementations map process-level failures onto [`Error::ToolNotFound`],
/// [`Error::ToolTimeout`] and [`Error::ToolExit`].
#[trait_variant::make(ToolRunner: Send)]
pub trait LocalToolRunner {
    async fn run(&self, invocation: Invocation) -> Result<ToolOutput>;
}

/// [`ToolRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: Invocation) -> Result<ToolOutput> {
        let limit = invocation.timeout;
        match timeout(limit, run_process(&invocation)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("'{}' timed out after {:?}", invocation.display(), limit);
                Err(Error::ToolTimeout {
                    program: invocation.program.clone(),
                    timeout: limit,
                })
            }
        }
    }
}

async fn run_process(invocation: &Invocation) -> Result<ToolOutput> {
    debug!("Running: {}", invocation.display());

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &invocation.cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found(&invocation.program)
        } else {
            Error::process(format!("Failed to run {}: {}", invocation.program, e))
        }
    })?;

    // Write stdin on its own task so a child that streams output before
    // draining its input cannot deadlock us.
    let writer = match (child.stdin.take(), invocation.stdin.clone()) {
        (Some(mut stdin), Some(payload)) => Some(tokio::spawn(async move {
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                debug!("stdin write ended early: {}", e);
            }
        })),
        _ => None,
    };

    let output = child.wait_with_output().await?;
    if let Some(writer) = writer {
        if let Err(e) = writer.await {
            debug!("stdin writer for {} did not finish: {}", invocation.program, e);
        }
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !stderr.is_empty() {
        debug!("{} stderr: {}", invocation.program, stderr.trim_end());
    }

    if !output.status.success() {
        return Err(Error::ToolExit {
            program: invocation.program.clone(),
            code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Resolve a program name against `PATH` (absolute paths are checked as-is)
pub fn locate(program: &str) -> Option<PathBuf> {
    which::which(program)
        .inspect_err(|e| trace!("'{}' not resolvable: {}", program, e))
        .ok()
}
