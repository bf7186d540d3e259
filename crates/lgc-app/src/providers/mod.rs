//! Integration providers that receive generated listings
//!
//! A provider is an opaque capability: it reports whether it can be used
//! right now and accepts content plus an optional mode. The
//! [`ProviderRegistry`] keeps them ordered by priority (highest first).

pub mod cli_agent;
pub mod file;

use std::fmt;
use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture};

use lgc_core::prelude::*;
use lgc_core::{DeliveryOutcome, IntegrationTarget};

use crate::nested::SharedMap;

pub use cli_agent::{AgentSpec, CliAgentProvider};
pub use file::FileProvider;

/// Mode-set whose selected mode is handed to providers on send
pub const AI_MODE_SET: &str = "ai-interaction";

/// Per-send parameters
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Selected mode of [`AI_MODE_SET`], if any
    pub mode: Option<String>,
    /// `provider_settings[provider]`
    pub settings: SharedMap<String>,
}

pub trait Provider: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Higher wins when choosing a default provider
    fn priority(&self) -> i32;

    fn is_available(&self) -> BoxFuture<'_, bool>;

    /// Deliver `content`; returns a short human-readable detail on success
    fn send<'a>(&'a self, content: &'a str, options: &'a SendOptions)
        -> BoxFuture<'a, Result<String>>;
}

/// Providers ordered by descending priority
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider; a provider with the same id is replaced
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.retain(|p| p.id() != provider.id());
        self.providers.push(provider);
        self.providers
            .sort_by(|a, b| b.priority().cmp(&a.priority()).then_with(|| a.id().cmp(b.id())));
    }

    pub fn with(mut self, provider: impl Provider + 'static) -> Self {
        self.register(Arc::new(provider));
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.id() == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Probe every provider concurrently
    pub async fn detect(&self) -> Vec<IntegrationTarget> {
        let probes = self.providers.iter().map(|provider| async move {
            IntegrationTarget {
                id: provider.id().to_string(),
                name: provider.name().to_string(),
                priority: provider.priority(),
                available: provider.is_available().await,
            }
        });
        let targets = join_all(probes).await;
        info!(
            "detected {}/{} available providers",
            targets.iter().filter(|t| t.available).count(),
            targets.len()
        );
        targets
    }

    /// Send through `id`, folding every failure into the outcome
    pub async fn send(&self, id: &str, content: &str, options: &SendOptions) -> DeliveryOutcome {
        let Some(provider) = self.get(id) else {
            return DeliveryOutcome::failed(id, Error::unknown_provider(id).to_string());
        };
        if !provider.is_available().await {
            warn!("provider '{}' is not available; nothing sent", id);
            return DeliveryOutcome::failed(id, Error::provider_unavailable(id).to_string());
        }
        match provider.send(content, options).await {
            Ok(detail) => {
                info!("delivered {} chars to '{}'", content.chars().count(), id);
                DeliveryOutcome::delivered(id, detail)
            }
            Err(err) => {
                warn!("delivery to '{}' failed: {}", id, err);
                DeliveryOutcome::failed(id, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct FakeProvider {
        id: &'static str,
        priority: i32,
        available: bool,
        sent: Mutex<Vec<(String, Option<String>)>>,
    }

    impl FakeProvider {
        fn new(id: &'static str, priority: i32, available: bool) -> Self {
            Self {
                id,
                priority,
                available,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl Provider for FakeProvider {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn is_available(&self) -> BoxFuture<'_, bool> {
            let available = self.available;
            async move { available }.boxed()
        }

        fn send<'a>(
            &'a self,
            content: &'a str,
            options: &'a SendOptions,
        ) -> BoxFuture<'a, Result<String>> {
            async move {
                self.sent
                    .lock()
                    .unwrap()
                    .push((content.to_string(), options.mode.clone()));
                Ok("ok".to_string())
            }
            .boxed()
        }
    }

    #[test]
    fn test_registry_orders_by_priority() {
        let registry = ProviderRegistry::new()
            .with(FakeProvider::new("low", 0, true))
            .with(FakeProvider::new("high", 80, true))
            .with(FakeProvider::new("mid", 40, true));
        assert_eq!(registry.ids(), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let registry = ProviderRegistry::new()
            .with(FakeProvider::new("a", 10, false))
            .with(FakeProvider::new("a", 20, true));
        assert_eq!(registry.ids(), vec!["a"]);
        assert_eq!(registry.get("a").map(|p| p.priority()), Some(20));
    }

    #[tokio::test]
    async fn test_detect_reports_availability() {
        let registry = ProviderRegistry::new()
            .with(FakeProvider::new("on", 10, true))
            .with(FakeProvider::new("off", 50, false));
        let targets = registry.detect().await;
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].id, "off");
        assert!(!targets[0].available);
        assert!(targets[1].available);
    }

    #[tokio::test]
    async fn test_send_folds_errors_into_outcome() {
        let off = Arc::new(FakeProvider::new("off", 10, false));
        let mut registry = ProviderRegistry::new();
        registry.register(off.clone());

        let unknown = registry.send("nope", "x", &SendOptions::default()).await;
        assert!(!unknown.is_delivered());

        let failed = registry.send("off", "x", &SendOptions::default()).await;
        assert_eq!(
            failed,
            DeliveryOutcome::failed("off", "Provider 'off' is not available")
        );
        assert!(off.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_passes_mode() {
        let provider = Arc::new(FakeProvider::new("on", 10, true));
        let mut registry = ProviderRegistry::new();
        registry.register(provider.clone());

        let options = SendOptions {
            mode: Some("agent".into()),
            ..SendOptions::default()
        };
        let outcome = registry.send("on", "listing", &options).await;
        assert!(outcome.is_delivered());
        assert_eq!(
            *provider.sent.lock().unwrap(),
            vec![("listing".to_string(), Some("agent".to_string()))]
        );
    }
}
