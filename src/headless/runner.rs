//! Headless mode runner
//!
//! Boots a coordinator for one project, applies the selections given on the
//! command line, optionally generates or sends a listing, and then either
//! exits or keeps serving line commands from stdin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use lgc_app::config::{self, Settings};
use lgc_app::domain::*;
use lgc_app::{
    Command, Coordinator, ProcessRunner, Services, Snapshot, SubscriptionId, ToolAvailability,
};
use lgc_core::prelude::*;

use super::stdin::{read_stdin_blocking, StdinRequest};
use super::HeadlessEvent;

/// What the headless run should do after boot
#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    pub template: Option<String>,
    pub section: Option<String>,
    /// `(tag_set, tag)` pairs to activate
    pub tags: Vec<(String, String)>,
    /// `(mode_set, mode)` pairs to select
    pub modes: Vec<(String, String)>,
    pub task: Option<String>,
    pub provider: Option<String>,
    pub tokenizer_lib: Option<String>,
    pub encoder: Option<String>,
    pub ctx_limit: Option<u64>,
    pub target_branch: Option<String>,
    pub generate: bool,
    pub send: bool,
    /// Keep reading commands from stdin until EOF or `quit`
    pub interactive: bool,
    /// Only print the `final` event, not every commit
    pub final_only: bool,
    /// Ignore `.lgc/state.local.toml`
    pub fresh: bool,
    /// Write selections back to `.lgc/state.local.toml` on exit
    pub save: bool,
}

/// Run the coordinator without a UI, reporting on stdout
pub async fn run_headless(project_path: &Path, options: HeadlessOptions) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("lg-coordinator starting in HEADLESS mode");
    info!("Project: {}", project_path.display());
    info!("═══════════════════════════════════════════════════════");

    let settings = config::load_settings(project_path);
    report_tool_availability(&settings).await;

    let restored = if options.fresh {
        None
    } else {
        config::load_selections(project_path)
    };
    let initial = config::initial_persistent(&settings, restored);

    let services = Services::from_settings(ProcessRunner, project_path, &settings);
    let coordinator = Coordinator::new(lgc_app::registry(services)?, initial)?;

    HeadlessEvent::started(&project_path.display().to_string()).emit();
    let commits = (!options.final_only).then(|| forward_commits(&coordinator));

    coordinator.dispatch(BOOT.command());
    coordinator.wait_idle().await;

    apply_selections(&coordinator, &options).await;

    if options.send {
        run_and_report(&coordinator, SEND_LISTING.command()).await;
    } else if options.generate {
        run_and_report(&coordinator, GENERATE_LISTING.command()).await;
    }

    if options.interactive {
        serve_stdin(&coordinator).await;
    }

    coordinator.shutdown();
    if let Some(commits) = commits {
        commits.finish(&coordinator).await;
    }

    let snapshot = coordinator.snapshot();
    if options.save {
        if let Err(e) = config::save_selections(project_path, &snapshot.persistent) {
            warn!("Failed to save selections: {}", e);
            HeadlessEvent::error(e.to_string(), false).emit();
        }
    }
    HeadlessEvent::final_state(snapshot, coordinator.revision()).emit();

    info!("lg-coordinator headless mode exiting");
    Ok(())
}

async fn report_tool_availability(settings: &Settings) {
    let availability =
        ToolAvailability::check(&ProcessRunner, &settings.tool.command, &settings.git.command)
            .await;
    if let Some(message) = availability.listing_tool_message() {
        warn!("{}", message);
        HeadlessEvent::tool_missing(&settings.tool.command, message).emit();
    }
    if let Some(message) = availability.git_message() {
        warn!("{}", message);
        HeadlessEvent::tool_missing(&settings.git.command, message).emit();
    }
}

/// Commit events queued by an observer and written by a separate task
///
/// The observer runs inside the coordinator's mutation lane, so it only
/// queues; stdout writes happen off the lane, still in commit order.
struct CommitForwarder {
    subscription: SubscriptionId,
    writer: JoinHandle<()>,
}

fn forward_commits(coordinator: &Coordinator) -> CommitForwarder {
    let (tx, mut rx) = mpsc::unbounded_channel::<HeadlessEvent>();
    let subscription = coordinator.subscribe_fn(move |snapshot: &Snapshot, revision| {
        // The receiver only goes away after unsubscribe
        let _ = tx.send(HeadlessEvent::commit(Arc::new(snapshot.clone()), revision));
    });
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            event.emit();
        }
    });
    CommitForwarder {
        subscription,
        writer,
    }
}

impl CommitForwarder {
    /// Stop queueing and wait until every queued commit is written
    async fn finish(self, coordinator: &Coordinator) {
        // Dropping the observer drops the sender, which ends the writer.
        coordinator.unsubscribe(self.subscription);
        if let Err(e) = self.writer.await {
            error!("commit writer task failed: {}", e);
        }
    }
}

/// Dispatch and wait for everything the command set off
async fn settle(coordinator: &Coordinator, command: Command) {
    coordinator.dispatch(command);
    coordinator.wait_idle().await;
}

/// Apply command-line selections in dependency order: context before its
/// tags and modes, tokenizer lib before its encoder.
async fn apply_selections(coordinator: &Coordinator, options: &HeadlessOptions) {
    if let Some(template) = &options.template {
        settle(coordinator, SELECT_CONTEXT.create(template.clone())).await;
        if coordinator.snapshot().persistent.template != *template {
            HeadlessEvent::error(format!("unknown context '{template}'"), false).emit();
        }
    }
    if let Some(section) = &options.section {
        settle(coordinator, SELECT_SECTION.create(section.clone())).await;
    }
    if let Some(provider) = &options.provider {
        settle(coordinator, SELECT_PROVIDER.create(provider.clone())).await;
    }

    for (tag_set, tag) in &options.tags {
        // Toggling an already active tag would switch it off
        let active = coordinator
            .snapshot()
            .persistent
            .active_tags(tag_set)
            .is_some_and(|tags| tags.contains(tag));
        if !active {
            settle(coordinator, TOGGLE_TAG.create(TagToggle::new(tag_set, tag))).await;
        }
    }
    for (mode_set, mode) in &options.modes {
        settle(coordinator, SELECT_MODE.create(ModeSelection::new(mode_set, mode))).await;
    }

    if let Some(lib) = &options.tokenizer_lib {
        settle(coordinator, SELECT_TOKENIZER_LIB.create(lib.clone())).await;
    }
    if let Some(encoder) = &options.encoder {
        settle(coordinator, SELECT_ENCODER.create(encoder.clone())).await;
    }
    if let Some(limit) = options.ctx_limit {
        settle(coordinator, SET_CTX_LIMIT.create(limit)).await;
    }
    if let Some(branch) = &options.target_branch {
        settle(coordinator, SELECT_BRANCH.create(branch.clone())).await;
    }
    if let Some(task) = &options.task {
        settle(coordinator, SET_TASK_TEXT.create(task.clone())).await;
    }
}

/// Run a generate/send command and report the resulting outcome
async fn run_and_report(coordinator: &Coordinator, command: Command) {
    let before = coordinator.snapshot();
    let is_send = command.kind() == SEND_LISTING.kind();
    settle(coordinator, command).await;
    let after = coordinator.snapshot();

    if Arc::ptr_eq(&before.environment, &after.environment) {
        let message = if after.persistent.render_target().is_none() {
            "nothing to render: select a context or section".to_string()
        } else if is_send && after.persistent.provider.is_empty() {
            "no provider selected".to_string()
        } else {
            "listing request was not processed".to_string()
        };
        HeadlessEvent::error(message, false).emit();
        return;
    }

    if let Some(outcome) = &after.environment.last_listing {
        match HeadlessEvent::listing(outcome) {
            Some(event) => event.emit(),
            None => {
                error!("render failed for '{}'", outcome.context());
                HeadlessEvent::error(format!("render of '{}' failed", outcome.context()), false)
                    .emit();
            }
        }
    }
    if is_send {
        if let Some(delivery) = &after.environment.last_delivery {
            HeadlessEvent::delivery(delivery.clone()).emit();
        }
    }
}

/// Dispatch stdin commands until EOF, `quit` or Ctrl+C
async fn serve_stdin(coordinator: &Coordinator) {
    let (tx, mut rx) = mpsc::channel(16);
    std::thread::spawn(move || read_stdin_blocking(tx));

    loop {
        tokio::select! {
            request = rx.recv() => match request {
                Some(StdinRequest::Dispatch(command)) => {
                    let kind = command.kind();
                    if kind == GENERATE_LISTING.kind() || kind == SEND_LISTING.kind() {
                        run_and_report(coordinator, command).await;
                    } else {
                        settle(coordinator, command).await;
                    }
                }
                Some(StdinRequest::Quit) | None => {
                    info!("Stdin closed or quit requested");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C");
                break;
            }
        }
    }
}

/// Canonical project path (no `\\?\` prefix on Windows)
pub fn resolve_project_path(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    Ok(dunce::canonicalize(&path)?)
}
