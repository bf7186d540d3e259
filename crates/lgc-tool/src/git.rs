//! Branch listing through `git`

use std::path::PathBuf;
use std::time::Duration;

use lgc_core::prelude::*;

use crate::process::{Invocation, ToolRunner};

const BRANCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Minimal git front-end used for the target-branch picker
#[derive(Debug, Clone)]
pub struct GitTool<R> {
    runner: R,
    program: String,
    repo: PathBuf,
}

impl<R: ToolRunner + Sync> GitTool<R> {
    pub fn new(runner: R, program: impl Into<String>, repo: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: program.into(),
            repo: repo.into(),
        }
    }

    /// Local and remote branch names, local first, without duplicates
    pub async fn branches(&self) -> Result<Vec<String>> {
        let invocation = Invocation::new(
            &self.program,
            ["branch", "-a", "--format=%(refname:short)"],
        )
        .in_dir(&self.repo)
        .with_timeout(BRANCH_TIMEOUT);

        let output = self.runner.run(invocation).await?;
        let branches = parse_branches(&output.stdout);
        debug!("git reported {} branches", branches.len());
        Ok(branches)
    }
}

fn parse_branches(stdout: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut local = Vec::new();
    let mut remote = Vec::new();

    for line in stdout.lines().map(str::trim) {
        // `origin/HEAD` and detached-head markers are not selectable targets
        if line.is_empty() || line.ends_with("/HEAD") || line == "HEAD" || line.starts_with('(')
        {
            continue;
        }
        if !seen.insert(line.to_string()) {
            continue;
        }
        if line.contains('/') && !is_local_with_slash(line, stdout) {
            remote.push(line.to_string());
        } else {
            local.push(line.to_string());
        }
    }

    local.extend(remote);
    local
}

/// A slashed name is remote when its first segment names a remote: either a
/// `<segment>/HEAD` line exists or it is `origin`/`upstream`.
fn is_local_with_slash(line: &str, stdout: &str) -> bool {
    let Some((prefix, _)) = line.split_once('/') else {
        return true;
    };
    let head_marker = format!("{prefix}/HEAD");
    let prefix_is_remote = stdout.lines().any(|l| l.trim() == head_marker)
        || matches!(prefix, "origin" | "upstream");
    !prefix_is_remote
}
