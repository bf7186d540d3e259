//! Context, section, tag and mode selection

use std::sync::Arc;

use lgc_core::prelude::*;

use super::catalogs::context_loads;
use super::commands::*;
use crate::nested::{remove_in, set_in, toggle_member, update_in};
use crate::registry::RegistryBuilder;
use crate::services::{Runner, Services};
use crate::state::{PersistentState, Snapshot};
use crate::transition::Transition;

/// Mode selections to write for the current context and provider:
/// `Some(mode)` fills a missing or invalid selection, `None` drops one whose
/// mode-set disappeared.
fn mode_default_changes(snapshot: &Snapshot) -> Vec<(String, Option<String>)> {
    let Some(mode_sets) = snapshot.current_mode_sets() else {
        return Vec::new();
    };
    // An empty catalog (including a failed load) leaves selections untouched
    if mode_sets.is_empty() {
        return Vec::new();
    }

    let persistent = &snapshot.persistent;
    let mut changes = Vec::new();
    for set in mode_sets {
        let current = persistent.selected_mode(&set.id);
        if current.is_some_and(|mode| set.contains(mode)) {
            continue;
        }
        match set.initial_mode() {
            Some(initial) => changes.push((set.id.clone(), Some(initial.to_string()))),
            None if current.is_some() => changes.push((set.id.clone(), None)),
            None => {}
        }
    }

    let selected = persistent
        .modes
        .get(&persistent.template)
        .and_then(|providers| providers.get(persistent.provider_key()));
    for set_id in selected.iter().flat_map(|sets| sets.keys()) {
        if !mode_sets.iter().any(|set| &set.id == set_id) {
            changes.push((set_id.clone(), None));
        }
    }
    changes
}

fn tag_is_known(snapshot: &Snapshot, tag_set: &str, tag: &str) -> bool {
    match snapshot.current_tag_sets() {
        Some(sets) if !sets.is_empty() => sets
            .iter()
            .any(|set| set.id == tag_set && set.contains(tag)),
        // Catalog not loaded (yet): accept and let the tool decide
        _ => true,
    }
}

fn mode_is_known(snapshot: &Snapshot, mode_set: &str, mode: &str) -> bool {
    match snapshot.current_mode_sets() {
        Some(sets) if !sets.is_empty() => sets
            .iter()
            .any(|set| set.id == mode_set && set.contains(mode)),
        _ => true,
    }
}

pub(super) fn register<R: Runner>(
    builder: &mut RegistryBuilder,
    services: &Arc<Services<R>>,
) -> Result<()> {
    // ── Context ─────────────────────────────────────────────────────────

    let svc = Arc::clone(services);
    builder.rule(
        &SELECT_CONTEXT,
        |s, name| {
            let templates = &s.configuration.templates;
            s.persistent.template != *name
                && (name.is_empty() || templates.is_empty() || templates.contains(name))
        },
        move |_, name| {
            let template = name.clone();
            let transition = Transition::none().update_persistent(move |p| PersistentState {
                template,
                ..p.clone()
            });
            if name.is_empty() {
                transition
            } else {
                transition.launch_all(context_loads(&svc, name))
            }
        },
    )?;

    builder.rule(
        &ENSURE_CONTEXT_VALID,
        |s, _| {
            let templates = &s.configuration.templates;
            !s.persistent.template.is_empty()
                && !templates.is_empty()
                && !templates.contains(&s.persistent.template)
        },
        |s, _| {
            warn!(
                "context '{}' no longer exists; clearing selection",
                s.persistent.template
            );
            Transition::none().update_persistent(|p| PersistentState {
                template: String::new(),
                ..p.clone()
            })
        },
    )?;

    // ── Section ─────────────────────────────────────────────────────────

    builder.rule(
        &SELECT_SECTION,
        |s, name| {
            let sections = &s.configuration.sections;
            !name.is_empty()
                && s.persistent.section != *name
                && (sections.is_empty() || sections.contains(name))
        },
        |_, name| {
            let section = name.clone();
            Transition::none().update_persistent(move |p| PersistentState {
                section,
                ..p.clone()
            })
        },
    )?;

    // Missing or unknown section falls back to the first one
    builder.rule(
        &ENSURE_SECTION_VALID,
        |s, _| {
            let sections = &s.configuration.sections;
            !sections.is_empty() && !sections.contains(&s.persistent.section)
        },
        |s, _| {
            let first = s.configuration.sections[0].clone();
            debug!("section '{}' invalid; selecting '{}'", s.persistent.section, first);
            Transition::none().update_persistent(move |p| PersistentState {
                section: first,
                ..p.clone()
            })
        },
    )?;

    // ── Tags ────────────────────────────────────────────────────────────

    builder.rule(
        &TOGGLE_TAG,
        |s, toggle| {
            !s.persistent.template.is_empty()
                && !toggle.tag_set.is_empty()
                && !toggle.tag.is_empty()
                && tag_is_known(s, &toggle.tag_set, &toggle.tag)
        },
        |_, toggle| {
            let toggle = toggle.clone();
            Transition::none().update_persistent(move |p| PersistentState {
                tags: update_in(
                    &p.tags,
                    &[p.template.as_str(), toggle.tag_set.as_str()],
                    |set| toggle_member(set, &toggle.tag),
                ),
                ..p.clone()
            })
        },
    )?;

    builder.rule(
        &CLEAR_TAGS,
        |s, _| s.persistent.tags.contains_key(&s.persistent.template),
        |_, _| {
            Transition::none().update_persistent(|p| {
                let mut tags = (*p.tags).clone();
                tags.remove(&p.template);
                PersistentState {
                    tags: Arc::new(tags),
                    ..p.clone()
                }
            })
        },
    )?;

    // ── Modes ───────────────────────────────────────────────────────────

    builder.rule(
        &SELECT_MODE,
        |s, selection| {
            !s.persistent.template.is_empty()
                && s.persistent.selected_mode(&selection.mode_set) != Some(selection.mode.as_str())
                && mode_is_known(s, &selection.mode_set, &selection.mode)
        },
        |_, selection| {
            let selection = selection.clone();
            Transition::none().update_persistent(move |p| PersistentState {
                modes: set_in(
                    &p.modes,
                    &[
                        p.template.as_str(),
                        p.provider_key(),
                        selection.mode_set.as_str(),
                    ],
                    selection.mode,
                ),
                ..p.clone()
            })
        },
    )?;

    builder.rule(
        &ENSURE_MODE_DEFAULTS,
        |s, _| !mode_default_changes(s).is_empty(),
        |s, _| {
            let changes = mode_default_changes(s);
            debug!("adjusting {} mode selection(s)", changes.len());
            Transition::none().update_persistent(move |p| {
                let path_root = [p.template.as_str(), p.provider_key()];
                let modes = changes.iter().fold(p.modes.clone(), |modes, (set, mode)| {
                    let path = [path_root[0], path_root[1], set.as_str()];
                    match mode {
                        Some(mode) => set_in(&modes, &path, mode.clone()),
                        None => remove_in(&modes, &path),
                    }
                });
                PersistentState { modes, ..p.clone() }
            })
        },
    )?;

    Ok(())
}
