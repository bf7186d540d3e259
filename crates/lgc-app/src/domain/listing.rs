//! Rendering a listing and handing it to the selected provider
//!
//! Both operations share the [`OperationKind::Listing`] guard: while a render
//! is running, further generate/send requests are dropped rather than
//! queued.

use std::sync::Arc;

use lgc_core::prelude::*;
use lgc_core::{DeliveryOutcome, ListingOutcome};
use lgc_tool::RenderRequest;

use super::commands::*;
use crate::in_flight::OperationKind;
use crate::operation::AsyncOperation;
use crate::providers::{SendOptions, AI_MODE_SET};
use crate::registry::RegistryBuilder;
use crate::services::{Runner, Services};
use crate::state::{EnvState, PersistentState};
use crate::transition::Transition;

/// Build the `render` call for the current selections
pub fn render_request(persistent: &PersistentState) -> Option<RenderRequest> {
    let target = persistent.render_target()?;
    let task = Some(persistent.task_text.clone()).filter(|t| !t.trim().is_empty());
    let target_branch = Some(persistent.target_branch.clone()).filter(|b| !b.is_empty());
    Some(RenderRequest {
        target,
        modes: persistent.current_modes(),
        tags: persistent.current_tags(),
        tokenizer_lib: persistent.tokenizer_lib.clone(),
        encoder: persistent.encoder.clone(),
        ctx_limit: persistent.ctx_limit,
        task,
        target_branch,
    })
}

fn send_options(persistent: &PersistentState) -> SendOptions {
    SendOptions {
        mode: persistent.selected_mode(AI_MODE_SET).map(str::to_string),
        settings: persistent
            .provider_settings
            .get(&persistent.provider)
            .cloned()
            .unwrap_or_default(),
    }
}

fn generate<R: Runner>(services: &Arc<Services<R>>, request: RenderRequest) -> AsyncOperation {
    let services = Arc::clone(services);
    let name = request.target.name().to_string();
    let fallback = name.clone();
    AsyncOperation::new(
        format!("render {}", request.target.spec()),
        async move {
            let content = services.listing.render(&request).await?;
            Ok(LISTING_GENERATED.create(ListingOutcome::generated(name, content)))
        },
        move |err| LISTING_GENERATED.create(ListingOutcome::failed(fallback, err.to_string())),
    )
}

fn generate_and_send<R: Runner>(
    services: &Arc<Services<R>>,
    request: RenderRequest,
    provider: String,
    options: SendOptions,
) -> AsyncOperation {
    let services = Arc::clone(services);
    let name = request.target.name().to_string();
    let fallback = name.clone();
    let fallback_provider = provider.clone();
    AsyncOperation::new(
        format!("send {} to {}", request.target.spec(), provider),
        async move {
            let listing = match services.listing.render(&request).await {
                Ok(content) => ListingOutcome::generated(name, content),
                Err(err) => {
                    warn!("render for send failed: {}", err);
                    return Ok(LISTING_DELIVERED.create(ListingDelivered {
                        listing: ListingOutcome::failed(name, err.to_string()),
                        delivery: None,
                    }));
                }
            };
            let content = listing.content().unwrap_or_default();
            let delivery = services.providers.send(&provider, content, &options).await;
            Ok(LISTING_DELIVERED.create(ListingDelivered {
                listing,
                delivery: Some(delivery),
            }))
        },
        move |err| {
            LISTING_DELIVERED.create(ListingDelivered {
                listing: ListingOutcome::failed(fallback, err.to_string()),
                delivery: Some(DeliveryOutcome::failed(fallback_provider, err.to_string())),
            })
        },
    )
}

pub(super) fn register<R: Runner>(
    builder: &mut RegistryBuilder,
    services: &Arc<Services<R>>,
) -> Result<()> {
    let svc = Arc::clone(services);
    builder.rule(
        &GENERATE_LISTING,
        |s, _| s.persistent.render_target().is_some(),
        move |s, _| match render_request(&s.persistent) {
            Some(request) => Transition::none()
                .launch_guarded(OperationKind::Listing, [generate(&svc, request)]),
            None => Transition::none(),
        },
    )?;

    // A result for a target that is no longer selected is stale
    builder.rule(
        &LISTING_GENERATED,
        |s, outcome| {
            s.persistent
                .render_target()
                .is_some_and(|target| target.name() == outcome.context())
        },
        |_, outcome| {
            let outcome = outcome.clone();
            Transition::none().update_environment(move |e| EnvState {
                last_listing: Some(outcome),
                ..e.clone()
            })
        },
    )?;

    let svc = Arc::clone(services);
    builder.rule(
        &SEND_LISTING,
        |s, _| s.persistent.render_target().is_some() && !s.persistent.provider.is_empty(),
        move |s, _| {
            let Some(request) = render_request(&s.persistent) else {
                return Transition::none();
            };
            let provider = s.persistent.provider.clone();
            let options = send_options(&s.persistent);
            Transition::none().launch_guarded(
                OperationKind::Listing,
                [generate_and_send(&svc, request, provider, options)],
            )
        },
    )?;

    builder.rule(
        &LISTING_DELIVERED,
        |_, _| true,
        |_, delivered| {
            let delivered = delivered.clone();
            Transition::none().update_environment(move |e| EnvState {
                last_listing: Some(delivered.listing),
                last_delivery: delivered.delivery,
                ..e.clone()
            })
        },
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nested::set_in;
    use lgc_tool::RenderTarget;

    #[test]
    fn test_render_request_none_without_target() {
        assert!(render_request(&PersistentState::default()).is_none());
    }

    #[test]
    fn test_render_request_collects_selections() {
        let mut p = PersistentState {
            template: "review".into(),
            provider: "claude.cli".into(),
            task_text: "  ".into(),
            target_branch: "main".into(),
            ..PersistentState::default()
        };
        p.modes = set_in(&p.modes, &["review", "claude.cli", "ai-interaction"], "agent".into());

        let request = render_request(&p).unwrap();
        assert_eq!(request.target, RenderTarget::Context("review".into()));
        assert_eq!(request.modes, vec![("ai-interaction".into(), "agent".into())]);
        assert_eq!(request.task, None);
        assert_eq!(request.target_branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_send_options_take_ai_mode_and_provider_settings() {
        let mut p = PersistentState {
            template: "review".into(),
            provider: "claude.cli".into(),
            ..PersistentState::default()
        };
        p.modes = set_in(&p.modes, &["review", "claude.cli", AI_MODE_SET], "ask".into());
        p.provider_settings =
            set_in(&p.provider_settings, &["claude.cli", "model"], "opus".into());

        let options = send_options(&p);
        assert_eq!(options.mode.as_deref(), Some("ask"));
        assert_eq!(options.settings.get("model").map(String::as_str), Some("opus"));
    }
}
