//! Availability probes for external executables
//!
//! A program counts as available when a cheap invocation (usually
//! `--version`) exits successfully. Probing goes through the [`ToolRunner`]
//! seam so tests can script the answer.

use std::time::Duration;

use lgc_core::prelude::*;

use crate::process::{Invocation, ToolRunner};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `program args...` and report whether it exited successfully
pub async fn probe<R: ToolRunner + Sync>(runner: &R, program: &str, args: &[&str]) -> bool {
    let invocation = Invocation::new(program, args.iter().copied()).with_timeout(PROBE_TIMEOUT);
    runner
        .run(invocation)
        .await
        .inspect_err(|e| debug!("probe of '{}' failed: {}", program, e))
        .is_ok()
}

/// Availability of the tools the coordinator shells out to (checked at boot)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolAvailability {
    pub listing_tool: bool,
    pub git: bool,
}

impl ToolAvailability {
    pub async fn check<R: ToolRunner + Sync>(runner: &R, listing_program: &str, git_program: &str) -> Self {
        let (listing_tool, git) = tokio::join!(
            probe(runner, listing_program, &["--version"]),
            probe(runner, git_program, &["--version"]),
        );
        Self { listing_tool, git }
    }

    /// User-facing hint when the listing tool is missing
    pub fn listing_tool_message(&self) -> Option<&'static str> {
        (!self.listing_tool)
            .then_some("listing-generator not found. Install it or set [tool] command in .lgc/config.toml.")
    }

    pub fn git_message(&self) -> Option<&'static str> {
        (!self.git).then_some("git not found. Target branch selection is disabled.")
    }
}
