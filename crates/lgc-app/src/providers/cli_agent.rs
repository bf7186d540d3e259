//! Providers backed by an AI assistant's command-line client
//!
//! The listing is piped on stdin. The selected mode, when the agent declares
//! a `mode_arg`, is passed as `<mode_arg> <mode>`. Provider settings become
//! `--<key> <value>` flags, in key order.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

use lgc_core::prelude::*;
use lgc_tool::{probe, Invocation, ToolRunner};

use super::{Provider, SendOptions};

/// Configured CLI agent (`[[agents]]` in config.toml)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    pub name: String,
    pub command: String,

    /// Fixed arguments placed before any mode/settings flags
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Flag that carries the selected mode (e.g. `--permission-mode`)
    #[serde(default)]
    pub mode_arg: Option<String>,
}

fn default_priority() -> i32 {
    50
}

#[derive(Debug, Clone)]
pub struct CliAgentProvider<R> {
    spec: AgentSpec,
    runner: R,
}

impl<R> CliAgentProvider<R> {
    pub fn new(spec: AgentSpec, runner: R) -> Self {
        Self { spec, runner }
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    fn arguments(&self, options: &SendOptions) -> Vec<String> {
        let mut args = self.spec.args.clone();
        if let (Some(flag), Some(mode)) = (&self.spec.mode_arg, &options.mode) {
            args.push(flag.clone());
            args.push(mode.clone());
        }
        for (key, value) in options.settings.iter() {
            args.push(format!("--{key}"));
            args.push(value.clone());
        }
        args
    }
}

impl<R> Provider for CliAgentProvider<R>
where
    R: ToolRunner + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn priority(&self) -> i32 {
        self.spec.priority
    }

    fn is_available(&self) -> BoxFuture<'_, bool> {
        async move { probe(&self.runner, &self.spec.command, &["--version"]).await }.boxed()
    }

    fn send<'a>(
        &'a self,
        content: &'a str,
        options: &'a SendOptions,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let invocation =
                Invocation::new(&self.spec.command, self.arguments(options)).with_stdin(content);
            debug!("sending listing via {}", invocation.display());
            let output = self.runner.run(invocation).await?;
            let reply = output.stdout.trim();
            Ok(if reply.is_empty() {
                format!("sent to {}", self.spec.name)
            } else {
                reply.to_string()
            })
        }
        .boxed()
    }
}
