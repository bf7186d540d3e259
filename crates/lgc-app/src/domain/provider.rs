//! Integration provider selection and per-provider settings

use lgc_core::prelude::*;

use super::commands::*;
use crate::nested::update_in;
use crate::registry::RegistryBuilder;
use crate::state::PersistentState;
use crate::transition::Transition;

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<()> {
    // Mode selections are stored per provider, so a switch re-checks them
    builder.rule(
        &SELECT_PROVIDER,
        |s, id| {
            let targets = &s.environment.targets;
            s.persistent.provider != *id
                && (id.is_empty()
                    || targets.is_empty()
                    || targets.iter().any(|t| &t.id == id))
        },
        |_, id| {
            let provider = id.clone();
            Transition::none()
                .update_persistent(move |p| PersistentState {
                    provider,
                    ..p.clone()
                })
                .follow_up(ENSURE_MODE_DEFAULTS.command())
        },
    )?;

    builder.rule(
        &ENSURE_PROVIDER_VALID,
        |s, _| {
            let env = &s.environment;
            let current = &s.persistent.provider;
            !env.targets.is_empty()
                && (current.is_empty() || !env.is_available(current))
                && env.best_target().is_some_and(|best| &best.id != current)
        },
        |s, _| {
            let Some(best) = s.environment.best_target() else {
                return Transition::none();
            };
            if !s.persistent.provider.is_empty() {
                info!(
                    "provider '{}' unavailable; switching to '{}'",
                    s.persistent.provider, best.id
                );
            }
            let provider = best.id.clone();
            Transition::none()
                .update_persistent(move |p| PersistentState {
                    provider,
                    ..p.clone()
                })
                .follow_up(ENSURE_MODE_DEFAULTS.command())
        },
    )?;

    builder.rule(
        &SET_PROVIDER_SETTING,
        |s, setting| {
            !setting.provider.is_empty()
                && !setting.key.is_empty()
                && s.persistent.provider_setting(&setting.provider, &setting.key)
                    != setting.value.as_deref()
        },
        |_, setting| {
            let setting = setting.clone();
            Transition::none().update_persistent(move |p| PersistentState {
                provider_settings: update_in(
                    &p.provider_settings,
                    &[setting.provider.as_str(), setting.key.as_str()],
                    |_| setting.value.clone(),
                ),
                ..p.clone()
            })
        },
    )?;

    Ok(())
}
