//! listing-generator CLI wrapper
//!
//! Catalog queries use `listing-generator list <what> ...` and print a single
//! JSON object. Some tool versions print progress noise (venv bootstrap,
//! download messages) before it, so parsing looks for the outermost `{...}`.

use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use lgc_core::prelude::*;
use lgc_core::{Encoder, ModeSet, TagSet};

use crate::process::{locate, Invocation, ToolRunner, DEFAULT_TIMEOUT};

/// Default executable name of the listing tool
pub const DEFAULT_PROGRAM: &str = "listing-generator";

/// What to render: a whole context template or a single section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    Context(String),
    Section(String),
}

impl RenderTarget {
    /// The `ctx:`/`sec:` target spec understood by the tool
    pub fn spec(&self) -> String {
        match self {
            Self::Context(name) => format!("ctx:{name}"),
            Self::Section(name) => format!("sec:{name}"),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Context(name) | Self::Section(name) => name,
        }
    }
}

/// Everything needed for one `render` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub target: RenderTarget,
    /// `(mode_set_id, mode_id)` pairs
    pub modes: Vec<(String, String)>,
    pub tags: Vec<String>,
    pub tokenizer_lib: String,
    pub encoder: String,
    pub ctx_limit: u64,
    /// Free-form task text, passed on stdin
    pub task: Option<String>,
    pub target_branch: Option<String>,
}

impl RenderRequest {
    fn args(&self) -> Vec<String> {
        let mut args = vec!["render".to_string(), self.target.spec()];
        for (set, mode) in &self.modes {
            args.push("--mode".into());
            args.push(format!("{set}:{mode}"));
        }
        if !self.tags.is_empty() {
            args.push("--tags".into());
            args.push(self.tags.join(","));
        }
        if !self.tokenizer_lib.is_empty() {
            args.push("--lib".into());
            args.push(self.tokenizer_lib.clone());
        }
        if !self.encoder.is_empty() {
            args.push("--encoder".into());
            args.push(self.encoder.clone());
        }
        args.push("--ctx-limit".into());
        args.push(self.ctx_limit.to_string());
        if let Some(branch) = self.target_branch.as_deref().filter(|b| !b.is_empty()) {
            args.push("--target-branch".into());
            args.push(branch.to_string());
        }
        if self.task.as_deref().is_some_and(|t| !t.trim().is_empty()) {
            args.push("--task".into());
            args.push("-".into());
        }
        args
    }
}

/// Typed front-end for the listing tool
#[derive(Debug, Clone)]
pub struct ListingTool<R> {
    runner: R,
    program: String,
    project_root: PathBuf,
    timeout: Duration,
}

impl<R: ToolRunner + Sync> ListingTool<R> {
    pub fn new(runner: R, program: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: program.into(),
            project_root: project_root.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether the configured executable resolves on this machine
    pub fn is_installed(&self) -> bool {
        locate(&self.program).is_some()
    }

    fn invocation(&self, args: Vec<String>) -> Invocation {
        Invocation::new(&self.program, args)
            .in_dir(&self.project_root)
            .with_timeout(self.timeout)
    }

    async fn query<T: DeserializeOwned>(&self, args: Vec<String>) -> Result<T> {
        let output = self.runner.run(self.invocation(args)).await?;
        parse_reply(&output.stdout)
    }

    pub async fn list_contexts(&self) -> Result<Vec<String>> {
        let reply: ContextsReply = self.query(list_args(&["contexts"])).await?;
        info!("Loaded {} contexts", reply.contexts.len());
        Ok(reply.contexts)
    }

    pub async fn list_sections(&self) -> Result<Vec<String>> {
        let reply: SectionsReply = self.query(list_args(&["sections"])).await?;
        Ok(reply.sections)
    }

    pub async fn list_mode_sets(&self, context: &str) -> Result<Vec<ModeSet>> {
        let reply: ModeSetsReply = self
            .query(list_args(&["mode-sets", "--context", context]))
            .await?;
        Ok(reply.mode_sets)
    }

    pub async fn list_tag_sets(&self, context: &str) -> Result<Vec<TagSet>> {
        let reply: TagSetsReply = self
            .query(list_args(&["tag-sets", "--context", context]))
            .await?;
        Ok(reply.tag_sets)
    }

    pub async fn list_tokenizer_libs(&self) -> Result<Vec<String>> {
        let reply: TokenizerLibsReply = self.query(list_args(&["tokenizer-libs"])).await?;
        Ok(reply.tokenizer_libs)
    }

    pub async fn list_encoders(&self, lib: &str) -> Result<Vec<Encoder>> {
        let reply: EncodersReply = self.query(list_args(&["encoders", "--lib", lib])).await?;
        if let Some(reported) = reply.lib.as_deref() {
            if reported != lib {
                return Err(Error::protocol(format!(
                    "asked for encoders of '{lib}', tool answered for '{reported}'"
                )));
            }
        }
        Ok(reply.encoders.into_iter().map(EncoderEntry::into_encoder).collect())
    }

    /// Render a listing; returns the tool's stdout verbatim
    pub async fn render(&self, request: &RenderRequest) -> Result<String> {
        let mut invocation = self.invocation(request.args());
        if let Some(task) = request.task.as_deref().filter(|t| !t.trim().is_empty()) {
            invocation = invocation.with_stdin(task);
        }
        info!("Rendering {}", request.target.spec());
        let output = self.runner.run(invocation).await?;
        Ok(output.stdout)
    }
}

fn list_args(rest: &[&str]) -> Vec<String> {
    std::iter::once("list")
        .chain(rest.iter().copied())
        .map(String::from)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON replies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ContextsReply {
    #[serde(default)]
    contexts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SectionsReply {
    #[serde(default)]
    sections: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModeSetsReply {
    #[serde(default, rename = "mode-sets", alias = "mode_sets")]
    mode_sets: Vec<ModeSet>,
}

#[derive(Debug, Deserialize)]
struct TagSetsReply {
    #[serde(default, rename = "tag-sets", alias = "tag_sets")]
    tag_sets: Vec<TagSet>,
}

#[derive(Debug, Deserialize)]
struct TokenizerLibsReply {
    #[serde(default, alias = "tokenizer-libs")]
    tokenizer_libs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EncodersReply {
    #[serde(default)]
    lib: Option<String>,
    #[serde(default)]
    encoders: Vec<EncoderEntry>,
}

/// Older tool versions list encoders as bare names
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EncoderEntry {
    Name(String),
    Full(Encoder),
}

impl EncoderEntry {
    fn into_encoder(self) -> Encoder {
        match self {
            Self::Name(name) => Encoder {
                name,
                cached: false,
            },
            Self::Full(encoder) => encoder,
        }
    }
}

/// Parse the outermost JSON object in `stdout`
fn parse_reply<T: DeserializeOwned>(stdout: &str) -> Result<T> {
    let start = stdout.find('{');
    let end = stdout.rfind('}');

    let json = match (start, end) {
        (Some(start), Some(end)) if end > start => &stdout[start..=end],
        _ => {
            return Err(Error::protocol(format!(
                "no JSON object in tool output ({} bytes)",
                stdout.len()
            )))
        }
    };

    serde_json::from_str(json)
        .map_err(|e| Error::protocol(format!("failed to parse tool output: {e}")))
}
