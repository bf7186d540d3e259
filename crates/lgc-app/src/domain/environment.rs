//! Provider detection, git branches and the free-form task fields

use std::sync::Arc;

use lgc_core::prelude::*;

use super::commands::*;
use crate::in_flight::OperationKind;
use crate::operation::AsyncOperation;
use crate::registry::RegistryBuilder;
use crate::services::{Runner, Services};
use crate::state::{EnvState, PersistentState};
use crate::transition::Transition;

fn detect_targets<R: Runner>(services: &Arc<Services<R>>) -> AsyncOperation {
    let services = Arc::clone(services);
    AsyncOperation::infallible(
        "detect providers",
        async move { TARGETS_DETECTED.create(services.providers.detect().await) },
        || TARGETS_DETECTED.create(Vec::new()),
    )
}

fn load_branches<R: Runner>(services: &Arc<Services<R>>) -> AsyncOperation {
    let services = Arc::clone(services);
    AsyncOperation::new(
        "list branches",
        async move { Ok(BRANCHES_LOADED.create(services.git.branches().await?)) },
        |_| BRANCHES_LOADED.create(Vec::new()),
    )
}

pub(super) fn register<R: Runner>(
    builder: &mut RegistryBuilder,
    services: &Arc<Services<R>>,
) -> Result<()> {
    let svc = Arc::clone(services);
    builder.rule(
        &DETECT_TARGETS,
        |_, _| true,
        move |_, _| Transition::none().launch_guarded(OperationKind::Targets, [detect_targets(&svc)]),
    )?;

    builder.rule(
        &TARGETS_DETECTED,
        |s, targets| *s.environment.targets != **targets,
        |_, targets| {
            let targets = targets.clone();
            Transition::none()
                .update_environment(move |e| EnvState {
                    targets: targets.into(),
                    ..e.clone()
                })
                .follow_up(ENSURE_PROVIDER_VALID.command())
        },
    )?;

    let svc = Arc::clone(services);
    builder.rule(
        &RELOAD_BRANCHES,
        |_, _| true,
        move |_, _| Transition::none().launch_guarded(OperationKind::Branches, [load_branches(&svc)]),
    )?;

    builder.rule(
        &BRANCHES_LOADED,
        |s, branches| *s.environment.branches != **branches,
        |_, branches| {
            let branches = branches.clone();
            Transition::none().update_environment(move |e| EnvState {
                branches: branches.into(),
                ..e.clone()
            })
        },
    )?;

    builder.rule(
        &SELECT_BRANCH,
        |s, branch| s.persistent.target_branch != *branch,
        |_, branch| {
            let target_branch = branch.clone();
            Transition::none().update_persistent(move |p| PersistentState {
                target_branch,
                ..p.clone()
            })
        },
    )?;

    builder.rule(
        &SET_TASK_TEXT,
        |s, text| s.persistent.task_text != *text,
        |_, text| {
            let task_text = text.clone();
            Transition::none().update_persistent(move |p| PersistentState {
                task_text,
                ..p.clone()
            })
        },
    )?;

    Ok(())
}
