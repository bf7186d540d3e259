//! Domain rules driven end to end through a coordinator and a scripted tool

use std::sync::Arc;

use tempfile::TempDir;

use lgc_core::ListingOutcome;
use lgc_tool::test_utils::{Reply, ScriptedRunner};
use lgc_tool::{GitTool, ListingTool};

use super::*;
use crate::coordinator::Coordinator;
use crate::in_flight::OperationKind;
use crate::providers::{AgentSpec, CliAgentProvider, FileProvider, ProviderRegistry};
use crate::state::{PersistentState, MAX_CTX_LIMIT};

const MODE_SETS: &str = r#"{"mode-sets": [
    {"id": "ai-interaction", "modes": [{"id": "ask"}, {"id": "agent"}], "default": "agent"},
    {"id": "dev-stage", "modes": [{"id": "dev"}, {"id": "review"}]}
]}"#;

const TAG_SETS: &str = r#"{"tag-sets": [
    {"id": "lang", "tags": [{"id": "rust"}, {"id": "python"}]}
]}"#;

const ENCODERS: &str = r#"{"lib": "tiktoken", "encoders": [
    {"name": "o200k", "cached": false},
    {"name": "cl100k", "cached": true}
]}"#;

/// A runner answering every catalog query of a healthy project
fn scripted_tool() -> ScriptedRunner {
    let runner = ScriptedRunner::new();
    runner
        .stdout(&["list", "contexts"], r#"{"contexts": ["api-review", "onboarding"]}"#)
        .stdout(&["list", "sections"], r#"{"sections": ["core", "docs"]}"#)
        .stdout(&["list", "tokenizer-libs"], r#"{"tokenizer_libs": ["tiktoken", "hf"]}"#)
        .stdout(&["list", "encoders", "--lib", "tiktoken"], ENCODERS)
        .stdout(&["list", "mode-sets", "--context", "api-review"], MODE_SETS)
        .stdout(&["list", "tag-sets", "--context", "api-review"], TAG_SETS)
        .stdout(&["list", "mode-sets", "--context", "onboarding"], r#"{"mode-sets": []}"#)
        .stdout(&["list", "tag-sets", "--context", "onboarding"], r#"{"tag-sets": []}"#)
        .stdout(&["branch"], "main\nfeature/x\norigin/HEAD\norigin/main\n")
        .stdout(&["--version"], "claude 1.0.0");
    runner
}

fn agent_spec() -> AgentSpec {
    AgentSpec {
        id: "claude.cli".into(),
        name: "Claude CLI".into(),
        command: "claude".into(),
        args: vec!["-p".into()],
        priority: 50,
        mode_arg: Some("--permission-mode".into()),
    }
}

struct Harness {
    coordinator: Coordinator,
    runner: ScriptedRunner,
    dir: TempDir,
}

impl Harness {
    fn new(runner: ScriptedRunner, initial: PersistentState, with_agent: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        let mut providers = ProviderRegistry::new().with(FileProvider::new(root.join("out.md")));
        if with_agent {
            providers.register(Arc::new(CliAgentProvider::new(agent_spec(), runner.clone())));
        }

        let services = Arc::new(Services::new(
            ListingTool::new(runner.clone(), "lg", root),
            GitTool::new(runner.clone(), "git", root),
            providers,
            root,
        ));
        let coordinator = Coordinator::new(registry(services).unwrap(), initial).unwrap();

        Self {
            coordinator,
            runner,
            dir,
        }
    }

    fn healthy() -> Self {
        Self::new(scripted_tool(), PersistentState::default(), true)
    }

    async fn run(&self, command: crate::command::Command) {
        self.coordinator.dispatch(command);
        self.coordinator.wait_idle().await;
    }

    async fn booted() -> Self {
        let harness = Self::healthy();
        harness.run(BOOT.command()).await;
        harness
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_every_domain_command_has_a_rule() {
    let runner = ScriptedRunner::new();
    let services = Arc::new(Services::new(
        ListingTool::new(runner.clone(), "lg", "/proj"),
        GitTool::new(runner, "git", "/proj"),
        ProviderRegistry::new(),
        "/proj",
    ));
    let registry = registry(services).unwrap();

    for kind in [
        BOOT.kind(),
        RELOAD_CATALOGS.kind(),
        MODE_SETS_LOADED.kind(),
        ENSURE_MODE_DEFAULTS.kind(),
        SELECT_CONTEXT.kind(),
        TOGGLE_TAG.kind(),
        SELECT_ENCODER.kind(),
        SET_CTX_LIMIT.kind(),
        ENSURE_PROVIDER_VALID.kind(),
        SET_PROVIDER_SETTING.kind(),
        BRANCHES_LOADED.kind(),
        SET_TASK_TEXT.kind(),
        SEND_LISTING.kind(),
        LISTING_DELIVERED.kind(),
    ] {
        assert!(registry.has_rule(kind), "no rule for {kind}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Boot and catalogs
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_boot_loads_catalogs_and_picks_defaults() {
    let h = Harness::booted().await;
    let s = h.coordinator.snapshot();

    assert_eq!(&*s.configuration.templates, ["api-review", "onboarding"]);
    assert_eq!(s.persistent.section, "core");
    assert_eq!(s.persistent.tokenizer_lib, "tiktoken");
    // Cached encoder preferred over the first one
    assert_eq!(s.persistent.encoder, "cl100k");
    assert!(s.environment.branches.contains(&"main".to_string()));
    assert_eq!(s.persistent.provider, "claude.cli");
    // No context is chosen on the user's behalf
    assert_eq!(s.persistent.template, "");
    assert!(!h.coordinator.is_in_flight(OperationKind::Catalogs));
}

#[tokio::test]
async fn test_boot_clears_context_that_no_longer_exists() {
    let initial = PersistentState {
        template: "deleted".into(),
        ..PersistentState::default()
    };
    let h = Harness::new(scripted_tool(), initial, true);
    h.run(BOOT.command()).await;

    assert_eq!(h.coordinator.snapshot().persistent.template, "");
}

#[tokio::test]
async fn test_failing_tool_degrades_to_empty_catalogs() {
    let runner = ScriptedRunner::new();
    runner.on(&["list"], Reply::NotFound);
    let initial = PersistentState {
        template: "api-review".into(),
        section: "core".into(),
        ..PersistentState::default()
    };
    let h = Harness::new(runner, initial, false);
    h.run(BOOT.command()).await;

    let s = h.coordinator.snapshot();
    assert!(s.configuration.templates.is_empty());
    assert!(s.configuration.sections.is_empty());
    // Empty catalogs never invalidate a restored selection
    assert_eq!(s.persistent.template, "api-review");
    assert_eq!(s.persistent.section, "core");
    assert_eq!(s.current_mode_sets(), Some(&[][..]));
    assert_eq!(s.persistent.provider, "file");
}

#[tokio::test]
async fn test_reload_while_in_flight_is_dropped() {
    let h = Harness::healthy();
    h.runner.hold();
    h.coordinator.dispatch(RELOAD_CATALOGS.command());
    h.coordinator.dispatch(RELOAD_CATALOGS.command());
    assert!(h.coordinator.is_in_flight(OperationKind::Catalogs));

    h.runner.release();
    h.coordinator.wait_idle().await;

    assert_eq!(h.runner.count(&["list", "contexts"]), 1);
    assert!(!h.coordinator.is_in_flight(OperationKind::Catalogs));
}

#[tokio::test]
async fn test_reload_fetches_encoders_of_selected_lib_once() {
    let initial = PersistentState {
        tokenizer_lib: "tiktoken".into(),
        ..PersistentState::default()
    };
    let h = Harness::new(scripted_tool(), initial, true);
    h.runner.hold();
    h.coordinator.dispatch(RELOAD_CATALOGS.command());
    h.coordinator.dispatch(RELOAD_CATALOGS.command());

    h.runner.release();
    h.coordinator.wait_idle().await;

    assert_eq!(h.runner.count(&["list", "contexts"]), 1);
    assert_eq!(h.runner.count(&["list", "encoders"]), 1);
    let s = h.coordinator.snapshot();
    assert_eq!(s.persistent.encoder, "cl100k");
}

#[tokio::test]
async fn test_missing_encoders_are_fetched_outside_a_reload() {
    let initial = PersistentState {
        tokenizer_lib: "tiktoken".into(),
        ..PersistentState::default()
    };
    let h = Harness::new(scripted_tool(), initial, true);
    h.run(ENSURE_TOKENIZER_LIB.command()).await;

    assert_eq!(h.runner.count(&["list", "encoders", "--lib", "tiktoken"]), 1);
    assert_eq!(h.coordinator.snapshot().persistent.encoder, "cl100k");
}

// ─────────────────────────────────────────────────────────────────────────────
// Context, tags, modes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_select_context_loads_dependents_and_fills_modes() {
    let h = Harness::booted().await;
    h.run(SELECT_CONTEXT.create("api-review".into())).await;

    assert_eq!(h.runner.count(&["list", "mode-sets", "--context", "api-review"]), 1);
    assert_eq!(h.runner.count(&["list", "tag-sets", "--context", "api-review"]), 1);
    assert_eq!(h.runner.count(&["list", "sections"]), 2);

    let s = h.coordinator.snapshot();
    assert_eq!(s.persistent.template, "api-review");
    assert_eq!(s.persistent.selected_mode("ai-interaction"), Some("agent"));
    assert_eq!(s.persistent.selected_mode("dev-stage"), Some("dev"));
    assert_eq!(s.current_tag_sets().map(<[_]>::len), Some(1));
}

#[tokio::test]
async fn test_context_without_mode_sets_stores_no_modes() {
    let h = Harness::booted().await;
    h.run(SELECT_CONTEXT.create("onboarding".into())).await;

    let s = h.coordinator.snapshot();
    assert_eq!(s.current_mode_sets(), Some(&[][..]));
    assert!(s.persistent.modes.get("onboarding").is_none());
}

#[tokio::test]
async fn test_unknown_context_is_rejected_once_catalog_loaded() {
    let h = Harness::booted().await;
    let revision = h.coordinator.revision();
    h.run(SELECT_CONTEXT.create("nope".into())).await;

    assert_eq!(h.coordinator.revision(), revision);
    assert_eq!(h.runner.count(&["list", "mode-sets", "--context", "nope"]), 0);
}

#[tokio::test]
async fn test_stale_context_results_are_discarded() {
    let h = Harness::healthy();
    h.runner.hold();
    h.coordinator.dispatch(SELECT_CONTEXT.create("api-review".into()));
    h.coordinator.dispatch(SELECT_CONTEXT.create("onboarding".into()));
    h.runner.release();
    h.coordinator.wait_idle().await;

    let s = h.coordinator.snapshot();
    assert_eq!(s.persistent.template, "onboarding");
    assert_eq!(s.configuration.mode_sets.scope, "onboarding");
    assert_eq!(s.configuration.tag_sets.scope, "onboarding");
    assert!(s.persistent.modes.get("api-review").is_none());
}

#[tokio::test]
async fn test_toggle_tag_twice_prunes_empty_containers() {
    let h = Harness::booted().await;
    h.run(SELECT_CONTEXT.create("api-review".into())).await;

    h.run(TOGGLE_TAG.create(TagToggle::new("lang", "rust"))).await;
    let s = h.coordinator.snapshot();
    assert!(s.persistent.active_tags("lang").unwrap().contains("rust"));
    assert_eq!(s.persistent.current_tags(), vec!["rust".to_string()]);

    h.run(TOGGLE_TAG.create(TagToggle::new("lang", "rust"))).await;
    assert!(h.coordinator.snapshot().persistent.tags.get("api-review").is_none());
}

#[tokio::test]
async fn test_unknown_tag_is_rejected() {
    let h = Harness::booted().await;
    h.run(SELECT_CONTEXT.create("api-review".into())).await;
    let revision = h.coordinator.revision();

    h.run(TOGGLE_TAG.create(TagToggle::new("lang", "cobol"))).await;
    h.run(CLEAR_TAGS.command()).await;

    assert_eq!(h.coordinator.revision(), revision);
}

#[tokio::test]
async fn test_mode_selection_is_kept_per_provider() {
    let h = Harness::booted().await;
    h.run(SELECT_CONTEXT.create("api-review".into())).await;
    h.run(SELECT_MODE.create(ModeSelection::new("ai-interaction", "ask"))).await;
    assert_eq!(
        h.coordinator.snapshot().persistent.selected_mode("ai-interaction"),
        Some("ask")
    );

    // A fresh provider starts from the declared default
    h.run(SELECT_PROVIDER.create("file".into())).await;
    assert_eq!(
        h.coordinator.snapshot().persistent.selected_mode("ai-interaction"),
        Some("agent")
    );

    h.run(SELECT_PROVIDER.create("claude.cli".into())).await;
    assert_eq!(
        h.coordinator.snapshot().persistent.selected_mode("ai-interaction"),
        Some("ask")
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer and provider
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ctx_limit_bounds() {
    let h = Harness::healthy();

    h.run(SET_CTX_LIMIT.create(0)).await;
    h.run(SET_CTX_LIMIT.create(MAX_CTX_LIMIT + 1)).await;
    assert_eq!(h.coordinator.revision(), 0);

    h.run(SET_CTX_LIMIT.create(32_000)).await;
    assert_eq!(h.coordinator.snapshot().persistent.ctx_limit, 32_000);
}

#[tokio::test]
async fn test_switching_lib_clears_encoder_until_loaded() {
    let h = Harness::booted().await;
    h.runner
        .stdout(&["list", "encoders", "--lib", "hf"], r#"{"lib": "hf", "encoders": ["gpt2"]}"#);

    h.run(SELECT_TOKENIZER_LIB.create("hf".into())).await;

    let s = h.coordinator.snapshot();
    assert_eq!(s.persistent.tokenizer_lib, "hf");
    assert_eq!(s.persistent.encoder, "gpt2");
}

#[tokio::test]
async fn test_unavailable_agent_falls_back_to_file_provider() {
    let runner = scripted_tool();
    runner.on(&["--version"], Reply::NotFound);
    let initial = PersistentState {
        provider: "claude.cli".into(),
        ..PersistentState::default()
    };
    let h = Harness::new(runner, initial, true);
    h.run(BOOT.command()).await;

    let s = h.coordinator.snapshot();
    assert_eq!(s.persistent.provider, "file");
    assert!(!s.environment.is_available("claude.cli"));
}

#[tokio::test]
async fn test_provider_setting_set_and_delete() {
    let h = Harness::healthy();
    let setting = |value: Option<&str>| ProviderSetting {
        provider: "claude.cli".into(),
        key: "model".into(),
        value: value.map(String::from),
    };

    h.run(SET_PROVIDER_SETTING.create(setting(Some("opus")))).await;
    assert_eq!(
        h.coordinator.snapshot().persistent.provider_setting("claude.cli", "model"),
        Some("opus")
    );

    h.run(SET_PROVIDER_SETTING.create(setting(None))).await;
    assert!(h.coordinator.snapshot().persistent.provider_settings.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Listing
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generate_requires_a_target() {
    let h = Harness::healthy();
    h.run(GENERATE_LISTING.command()).await;

    assert_eq!(h.coordinator.revision(), 0);
    assert_eq!(h.runner.count(&["render"]), 0);
}

#[tokio::test]
async fn test_generate_records_listing() {
    let h = Harness::booted().await;
    h.runner.stdout(&["render"], "# api-review\n");
    h.run(SELECT_CONTEXT.create("api-review".into())).await;
    h.run(TOGGLE_TAG.create(TagToggle::new("lang", "rust"))).await;
    h.run(GENERATE_LISTING.command()).await;

    let s = h.coordinator.snapshot();
    let listing = s.environment.last_listing.as_ref().unwrap();
    assert_eq!(listing.context(), "api-review");
    assert_eq!(listing.content(), Some("# api-review\n"));

    let render = h
        .runner
        .calls()
        .into_iter()
        .find(|inv| inv.args.first().map(String::as_str) == Some("render"))
        .unwrap();
    assert_eq!(render.args[1], "ctx:api-review");
    assert!(render.args.contains(&"ai-interaction:agent".to_string()));
    assert!(render.args.contains(&"rust".to_string()));
}

#[tokio::test]
async fn test_render_failure_is_recorded() {
    let h = Harness::booted().await;
    h.runner.on(
        &["render"],
        Reply::Exit {
            code: 1,
            stderr: "template error".into(),
        },
    );
    h.run(SELECT_CONTEXT.create("api-review".into())).await;
    h.run(GENERATE_LISTING.command()).await;

    let s = h.coordinator.snapshot();
    assert!(matches!(
        s.environment.last_listing,
        Some(ListingOutcome::Failed { ref context, .. }) if context == "api-review"
    ));
    assert!(!h.coordinator.is_in_flight(OperationKind::Listing));
}

#[tokio::test]
async fn test_send_through_file_provider() {
    let h = Harness::new(scripted_tool(), PersistentState::default(), false);
    h.run(BOOT.command()).await;
    h.runner.stdout(&["render"], "# listing");
    h.run(SELECT_CONTEXT.create("api-review".into())).await;
    h.run(SET_TASK_TEXT.create("fix the flaky test".into())).await;

    h.run(SEND_LISTING.command()).await;

    let s = h.coordinator.snapshot();
    assert_eq!(s.persistent.provider, "file");
    assert!(s.environment.last_delivery.as_ref().unwrap().is_delivered());
    let written = std::fs::read_to_string(h.dir.path().join("out.md")).unwrap();
    assert_eq!(written, "# listing");

    let render = h
        .runner
        .calls()
        .into_iter()
        .find(|inv| inv.args.first().map(String::as_str) == Some("render"))
        .unwrap();
    assert_eq!(render.stdin.as_deref(), Some("fix the flaky test"));
}

#[tokio::test]
async fn test_send_passes_mode_and_settings_to_agent() {
    let h = Harness::booted().await;
    h.runner.stdout(&["render"], "# listing");
    h.runner.stdout(&["-p"], "");
    h.run(SELECT_CONTEXT.create("api-review".into())).await;
    h.run(SET_PROVIDER_SETTING.create(ProviderSetting {
        provider: "claude.cli".into(),
        key: "model".into(),
        value: Some("opus".into()),
    }))
    .await;

    h.run(SEND_LISTING.command()).await;

    let sent = h
        .runner
        .calls()
        .into_iter()
        .find(|inv| inv.program == "claude" && inv.args.first().map(String::as_str) == Some("-p"))
        .unwrap();
    assert_eq!(
        sent.args,
        vec!["-p", "--permission-mode", "agent", "--model", "opus"]
    );
    assert_eq!(sent.stdin.as_deref(), Some("# listing"));
    assert!(h
        .coordinator
        .snapshot()
        .environment
        .last_delivery
        .as_ref()
        .unwrap()
        .is_delivered());
}
