//! Tokenizer library, encoder and context-limit rules

use std::sync::Arc;

use lgc_core::prelude::*;
use lgc_core::Encoder;

use super::catalogs::load_encoders;
use super::commands::*;
use crate::in_flight::OperationKind;
use crate::registry::RegistryBuilder;
use crate::services::{Runner, Services};
use crate::state::{PersistentState, Snapshot, MAX_CTX_LIMIT};
use crate::transition::Transition;

/// Cached encoders first, so a fresh pick never triggers a download
fn preferred_encoder(encoders: &[Encoder]) -> Option<&Encoder> {
    encoders
        .iter()
        .find(|e| e.cached)
        .or_else(|| encoders.first())
}

fn encoder_is_invalid(snapshot: &Snapshot) -> bool {
    match snapshot.current_encoders() {
        Some(encoders) if !encoders.is_empty() => {
            let current = &snapshot.persistent.encoder;
            !encoders.iter().any(|e| &e.name == current)
        }
        _ => false,
    }
}

fn select_lib<R: Runner>(services: &Arc<Services<R>>, lib: String) -> Transition {
    let operation = load_encoders(services, &lib);
    Transition::none()
        .update_persistent(move |p| PersistentState {
            tokenizer_lib: lib,
            encoder: String::new(),
            ..p.clone()
        })
        .launch(operation)
}

pub(super) fn register<R: Runner>(
    builder: &mut RegistryBuilder,
    services: &Arc<Services<R>>,
) -> Result<()> {
    let svc = Arc::clone(services);
    builder.rule(
        &ENSURE_TOKENIZER_LIB,
        |s, _| {
            let libs = &s.configuration.tokenizer_libs;
            let lib = &s.persistent.tokenizer_lib;
            let lib_invalid = !libs.is_empty() && !libs.contains(lib);
            let encoders_missing = !lib.is_empty() && s.current_encoders().is_none();
            lib_invalid || encoders_missing
        },
        move |s, _| {
            let libs = &s.configuration.tokenizer_libs;
            let lib = &s.persistent.tokenizer_lib;
            if !libs.is_empty() && !libs.contains(lib) {
                debug!("tokenizer lib '{}' invalid; selecting '{}'", lib, libs[0]);
                select_lib(&svc, libs[0].clone())
            } else {
                // A reload already fetching this lib's encoders holds the guard.
                Transition::none()
                    .launch_guarded(OperationKind::Catalogs, [load_encoders(&svc, lib)])
            }
        },
    )?;

    let svc = Arc::clone(services);
    builder.rule(
        &SELECT_TOKENIZER_LIB,
        |s, lib| {
            let libs = &s.configuration.tokenizer_libs;
            !lib.is_empty()
                && s.persistent.tokenizer_lib != *lib
                && (libs.is_empty() || libs.contains(lib))
        },
        move |_, lib| select_lib(&svc, lib.clone()),
    )?;

    builder.rule(
        &ENSURE_ENCODER,
        |s, _| encoder_is_invalid(s),
        |s, _| {
            let Some(encoder) = s.current_encoders().and_then(preferred_encoder) else {
                return Transition::none();
            };
            let name = encoder.name.clone();
            Transition::none().update_persistent(move |p| PersistentState {
                encoder: name,
                ..p.clone()
            })
        },
    )?;

    builder.rule(
        &SELECT_ENCODER,
        |s, name| {
            !name.is_empty()
                && s.persistent.encoder != *name
                && match s.current_encoders() {
                    Some(encoders) if !encoders.is_empty() => {
                        encoders.iter().any(|e| &e.name == name)
                    }
                    _ => true,
                }
        },
        |_, name| {
            let encoder = name.clone();
            Transition::none().update_persistent(move |p| PersistentState {
                encoder,
                ..p.clone()
            })
        },
    )?;

    builder.rule(
        &SET_CTX_LIMIT,
        |s, limit| (1..=MAX_CTX_LIMIT).contains(limit) && s.persistent.ctx_limit != *limit,
        |_, limit| {
            let ctx_limit = *limit;
            Transition::none().update_persistent(move |p| PersistentState {
                ctx_limit,
                ..p.clone()
            })
        },
    )?;

    Ok(())
}
