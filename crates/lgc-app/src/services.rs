//! External collaborators used by the domain rules' async operations
//!
//! Everything that touches a process or the filesystem hangs off
//! [`Services`], built once from [`Settings`] and shared by `Arc`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lgc_core::prelude::*;
use lgc_tool::{GitTool, ListingTool, ToolRunner};

use crate::config::Settings;
use crate::providers::{CliAgentProvider, FileProvider, ProviderRegistry};

/// Bounds every runner used by the domain rules must satisfy
pub trait Runner: ToolRunner + Clone + Send + Sync + fmt::Debug + 'static {}

impl<T> Runner for T where T: ToolRunner + Clone + Send + Sync + fmt::Debug + 'static {}

#[derive(Debug)]
pub struct Services<R> {
    pub listing: ListingTool<R>,
    pub git: GitTool<R>,
    pub providers: ProviderRegistry,
    pub project_root: PathBuf,
}

impl<R: Runner> Services<R> {
    pub fn new(
        listing: ListingTool<R>,
        git: GitTool<R>,
        providers: ProviderRegistry,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            listing,
            git,
            providers,
            project_root: project_root.into(),
        }
    }

    /// Wire every collaborator from `settings`, all sharing one runner
    pub fn from_settings(runner: R, project_root: &Path, settings: &Settings) -> Arc<Self> {
        let listing = ListingTool::new(runner.clone(), &settings.tool.command, project_root)
            .with_timeout(settings.tool.timeout());
        let git = GitTool::new(runner.clone(), &settings.git.command, project_root);

        let mut providers = ProviderRegistry::new();
        for spec in &settings.agents {
            providers.register(Arc::new(CliAgentProvider::new(spec.clone(), runner.clone())));
        }
        providers.register(Arc::new(FileProvider::new(
            project_root.join(&settings.file_provider.path),
        )));
        debug!("providers by priority: {:?}", providers.ids());

        Arc::new(Self::new(listing, git, providers, project_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::AgentSpec;
    use lgc_tool::test_utils::ScriptedRunner;

    #[test]
    fn test_from_settings_registers_agents_and_file_provider() {
        let mut settings = Settings::default();
        settings.agents.push(AgentSpec {
            id: "claude.cli".into(),
            name: "Claude CLI".into(),
            command: "claude".into(),
            args: vec![],
            priority: 50,
            mode_arg: None,
        });

        let services = Services::from_settings(ScriptedRunner::new(), Path::new("/proj"), &settings);

        assert_eq!(services.providers.ids(), vec!["claude.cli", "file"]);
        assert_eq!(services.listing.program(), "listing-generator");
        assert_eq!(services.project_root, PathBuf::from("/proj"));
    }
}
