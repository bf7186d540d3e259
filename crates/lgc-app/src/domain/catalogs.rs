//! Catalog loading: boot, reload and the `...Loaded` commands
//!
//! Every loader converts a failure into its `...Loaded` command with an
//! empty catalog, so a broken tool degrades to empty pickers.

use std::sync::Arc;

use lgc_core::prelude::*;

use super::commands::*;
use crate::in_flight::OperationKind;
use crate::operation::AsyncOperation;
use crate::registry::RegistryBuilder;
use crate::services::{Runner, Services};
use crate::state::{ConfigState, Scoped, Snapshot};
use crate::transition::Transition;

// ─────────────────────────────────────────────────────────────────────────────
// Loaders
// ─────────────────────────────────────────────────────────────────────────────

pub(super) fn load_templates<R: Runner>(services: &Arc<Services<R>>) -> AsyncOperation {
    let services = Arc::clone(services);
    AsyncOperation::new(
        "list contexts",
        async move { Ok(TEMPLATES_LOADED.create(services.listing.list_contexts().await?)) },
        |_| TEMPLATES_LOADED.create(Vec::new()),
    )
}

pub(super) fn load_sections<R: Runner>(services: &Arc<Services<R>>) -> AsyncOperation {
    let services = Arc::clone(services);
    AsyncOperation::new(
        "list sections",
        async move { Ok(SECTIONS_LOADED.create(services.listing.list_sections().await?)) },
        |_| SECTIONS_LOADED.create(Vec::new()),
    )
}

pub(super) fn load_tokenizer_libs<R: Runner>(services: &Arc<Services<R>>) -> AsyncOperation {
    let services = Arc::clone(services);
    AsyncOperation::new(
        "list tokenizer-libs",
        async move {
            Ok(TOKENIZER_LIBS_LOADED.create(services.listing.list_tokenizer_libs().await?))
        },
        |_| TOKENIZER_LIBS_LOADED.create(Vec::new()),
    )
}

pub(super) fn load_mode_sets<R: Runner>(services: &Arc<Services<R>>, context: &str) -> AsyncOperation {
    let services = Arc::clone(services);
    let context = context.to_string();
    let fallback = context.clone();
    AsyncOperation::new(
        format!("list mode-sets ({context})"),
        async move {
            let mode_sets = services.listing.list_mode_sets(&context).await?;
            Ok(MODE_SETS_LOADED.create(ModeSetsLoaded { context, mode_sets }))
        },
        move |_| {
            MODE_SETS_LOADED.create(ModeSetsLoaded {
                context: fallback,
                mode_sets: Vec::new(),
            })
        },
    )
}

pub(super) fn load_tag_sets<R: Runner>(services: &Arc<Services<R>>, context: &str) -> AsyncOperation {
    let services = Arc::clone(services);
    let context = context.to_string();
    let fallback = context.clone();
    AsyncOperation::new(
        format!("list tag-sets ({context})"),
        async move {
            let tag_sets = services.listing.list_tag_sets(&context).await?;
            Ok(TAG_SETS_LOADED.create(TagSetsLoaded { context, tag_sets }))
        },
        move |_| {
            TAG_SETS_LOADED.create(TagSetsLoaded {
                context: fallback,
                tag_sets: Vec::new(),
            })
        },
    )
}

pub(super) fn load_encoders<R: Runner>(services: &Arc<Services<R>>, lib: &str) -> AsyncOperation {
    let services = Arc::clone(services);
    let lib = lib.to_string();
    let fallback = lib.clone();
    AsyncOperation::new(
        format!("list encoders ({lib})"),
        async move {
            let encoders = services.listing.list_encoders(&lib).await?;
            Ok(ENCODERS_LOADED.create(EncodersLoaded { lib, encoders }))
        },
        move |_| {
            ENCODERS_LOADED.create(EncodersLoaded {
                lib: fallback,
                encoders: Vec::new(),
            })
        },
    )
}

/// Loads that depend on the selected context
pub(super) fn context_loads<R: Runner>(
    services: &Arc<Services<R>>,
    context: &str,
) -> Vec<AsyncOperation> {
    vec![
        load_sections(services),
        load_mode_sets(services, context),
        load_tag_sets(services, context),
    ]
}

fn reload_operations<R: Runner>(services: &Arc<Services<R>>, snapshot: &Snapshot) -> Vec<AsyncOperation> {
    let persistent = &snapshot.persistent;
    let mut operations = vec![
        load_templates(services),
        load_sections(services),
        load_tokenizer_libs(services),
    ];
    if !persistent.template.is_empty() {
        operations.push(load_mode_sets(services, &persistent.template));
        operations.push(load_tag_sets(services, &persistent.template));
    }
    if !persistent.tokenizer_lib.is_empty() {
        operations.push(load_encoders(services, &persistent.tokenizer_lib));
    }
    operations
}

// ─────────────────────────────────────────────────────────────────────────────
// Rules
// ─────────────────────────────────────────────────────────────────────────────

pub(super) fn register<R: Runner>(
    builder: &mut RegistryBuilder,
    services: &Arc<Services<R>>,
) -> Result<()> {
    builder.rule(
        &BOOT,
        |_, _| true,
        |_, _| {
            Transition::none()
                .follow_up(RELOAD_CATALOGS.command())
                .follow_up(DETECT_TARGETS.command())
                .follow_up(RELOAD_BRANCHES.command())
        },
    )?;

    let svc = Arc::clone(services);
    builder.rule(
        &RELOAD_CATALOGS,
        |_, _| true,
        move |snapshot, _| {
            Transition::none()
                .launch_guarded(OperationKind::Catalogs, reload_operations(&svc, snapshot))
        },
    )?;

    builder.rule(
        &TEMPLATES_LOADED,
        |_, _| true,
        |_, templates| {
            let templates = templates.clone();
            Transition::none()
                .update_configuration(move |c| ConfigState {
                    templates: templates.into(),
                    ..c.clone()
                })
                .follow_up(ENSURE_CONTEXT_VALID.command())
        },
    )?;

    builder.rule(
        &SECTIONS_LOADED,
        |_, _| true,
        |_, sections| {
            let sections = sections.clone();
            Transition::none()
                .update_configuration(move |c| ConfigState {
                    sections: sections.into(),
                    ..c.clone()
                })
                .follow_up(ENSURE_SECTION_VALID.command())
        },
    )?;

    builder.rule(
        &TOKENIZER_LIBS_LOADED,
        |_, _| true,
        |_, libs| {
            let libs = libs.clone();
            Transition::none()
                .update_configuration(move |c| ConfigState {
                    tokenizer_libs: libs.into(),
                    ..c.clone()
                })
                .follow_up(ENSURE_TOKENIZER_LIB.command())
        },
    )?;

    // Results for a context that is no longer selected are stale
    builder.rule(
        &MODE_SETS_LOADED,
        |s, loaded| s.persistent.template == loaded.context,
        |_, loaded| {
            let loaded = loaded.clone();
            Transition::none()
                .update_configuration(move |c| ConfigState {
                    mode_sets: Scoped::new(loaded.context, loaded.mode_sets),
                    ..c.clone()
                })
                .follow_up(ENSURE_MODE_DEFAULTS.command())
        },
    )?;

    builder.rule(
        &TAG_SETS_LOADED,
        |s, loaded| s.persistent.template == loaded.context,
        |_, loaded| {
            let loaded = loaded.clone();
            Transition::none().update_configuration(move |c| ConfigState {
                tag_sets: Scoped::new(loaded.context, loaded.tag_sets),
                ..c.clone()
            })
        },
    )?;

    builder.rule(
        &ENCODERS_LOADED,
        |s, loaded| s.persistent.tokenizer_lib == loaded.lib,
        |_, loaded| {
            let loaded = loaded.clone();
            Transition::none()
                .update_configuration(move |c| ConfigState {
                    encoders: Scoped::new(loaded.lib, loaded.encoders),
                    ..c.clone()
                })
                .follow_up(ENSURE_ENCODER.command())
        },
    )?;

    Ok(())
}
