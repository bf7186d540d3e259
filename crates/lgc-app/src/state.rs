//! Application state: one immutable [`Snapshot`] made of three partitions
//!
//! - [`PersistentState`]: user selections, durable across sessions
//! - [`ConfigState`]: catalogs reported by the listing tool
//! - [`EnvState`]: session-only runtime facts
//!
//! Snapshots are never mutated in place. The coordinator builds a new one on
//! every commit, reusing the `Arc` of each partition the commit did not touch.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lgc_core::{
    DeliveryOutcome, Encoder, IntegrationTarget, ListingOutcome, ModeSet, TagSet,
};
use lgc_tool::RenderTarget;

use crate::nested::{get_in, SharedMap, SharedSet};

/// Default token budget passed to `render --ctx-limit`
pub const DEFAULT_CTX_LIMIT: u64 = 128_000;

/// Upper bound accepted for the token budget
pub const MAX_CTX_LIMIT: u64 = 2_000_000;

/// Provider key used for mode selections made before any provider is chosen
pub const NO_PROVIDER_KEY: &str = "default";

/// `context -> provider -> mode_set_id -> mode_id`
pub type ModesByContext = SharedMap<SharedMap<SharedMap<String>>>;

/// `context -> tag_set_id -> {tag_id}`
pub type TagsByContext = SharedMap<SharedMap<SharedSet>>;

/// `provider_id -> key -> value`
pub type ProviderSettings = SharedMap<SharedMap<String>>;

/// A catalog list shared between snapshots until replaced
pub type Catalog<T> = Arc<[T]>;

// ─────────────────────────────────────────────────────────────────────────────
// Persistent partition
// ─────────────────────────────────────────────────────────────────────────────

/// User selections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentState {
    /// Selected context template (`""` = none)
    pub template: String,
    /// Selected section (`""` = none)
    pub section: String,
    pub tokenizer_lib: String,
    pub encoder: String,
    pub ctx_limit: u64,
    pub task_text: String,
    pub target_branch: String,
    /// Selected integration provider id (`""` = none)
    pub provider: String,
    pub modes: ModesByContext,
    pub tags: TagsByContext,
    pub provider_settings: ProviderSettings,
}

impl Default for PersistentState {
    fn default() -> Self {
        Self {
            template: String::new(),
            section: String::new(),
            tokenizer_lib: String::new(),
            encoder: String::new(),
            ctx_limit: DEFAULT_CTX_LIMIT,
            task_text: String::new(),
            target_branch: String::new(),
            provider: String::new(),
            modes: ModesByContext::default(),
            tags: TagsByContext::default(),
            provider_settings: ProviderSettings::default(),
        }
    }
}

impl PersistentState {
    /// Key under which mode selections for the current provider are stored
    pub fn provider_key(&self) -> &str {
        if self.provider.is_empty() {
            NO_PROVIDER_KEY
        } else {
            &self.provider
        }
    }

    /// Selected mode of `mode_set` for the current context and provider
    pub fn selected_mode(&self, mode_set: &str) -> Option<&str> {
        get_in(
            &self.modes,
            &[self.template.as_str(), self.provider_key(), mode_set],
        )
        .map(String::as_str)
    }

    /// All `(mode_set, mode)` pairs for the current context and provider
    pub fn current_modes(&self) -> Vec<(String, String)> {
        self.modes
            .get(&self.template)
            .and_then(|providers| providers.get(self.provider_key()))
            .map(|sets| {
                sets.iter()
                    .map(|(set, mode)| (set.clone(), mode.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Active tags of `tag_set` in the current context
    pub fn active_tags(&self, tag_set: &str) -> Option<&SharedSet> {
        get_in(&self.tags, &[self.template.as_str(), tag_set])
    }

    /// Every active tag of the current context, flattened and sorted
    pub fn current_tags(&self) -> Vec<String> {
        let mut all = BTreeSet::new();
        if let Some(sets) = self.tags.get(&self.template) {
            for set in sets.values() {
                all.extend(set.iter().cloned());
            }
        }
        all.into_iter().collect()
    }

    pub fn provider_setting(&self, provider: &str, key: &str) -> Option<&str> {
        get_in(&self.provider_settings, &[provider, key]).map(String::as_str)
    }

    /// What `render` should produce: the context wins over a lone section
    pub fn render_target(&self) -> Option<RenderTarget> {
        if !self.template.is_empty() {
            Some(RenderTarget::Context(self.template.clone()))
        } else if !self.section.is_empty() {
            Some(RenderTarget::Section(self.section.clone()))
        } else {
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration partition
// ─────────────────────────────────────────────────────────────────────────────

/// A catalog that only makes sense for one context or library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scoped<T> {
    /// The context or tokenizer library this catalog was loaded for
    pub scope: String,
    pub items: Catalog<T>,
}

impl<T> Default for Scoped<T> {
    fn default() -> Self {
        Self {
            scope: String::new(),
            items: Arc::from(Vec::new()),
        }
    }
}

impl<T> Scoped<T> {
    pub fn new(scope: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            scope: scope.into(),
            items: items.into(),
        }
    }

    /// Items, but only if loaded for `scope`
    pub fn for_scope(&self, scope: &str) -> Option<&[T]> {
        (self.scope == scope).then_some(&*self.items)
    }
}

/// Catalogs fetched from the listing tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigState {
    pub templates: Catalog<String>,
    pub sections: Catalog<String>,
    pub mode_sets: Scoped<ModeSet>,
    pub tag_sets: Scoped<TagSet>,
    pub tokenizer_libs: Catalog<String>,
    pub encoders: Scoped<Encoder>,
}

impl Default for ConfigState {
    fn default() -> Self {
        Self {
            templates: Arc::from(Vec::new()),
            sections: Arc::from(Vec::new()),
            mode_sets: Scoped::default(),
            tag_sets: Scoped::default(),
            tokenizer_libs: Arc::from(Vec::new()),
            encoders: Scoped::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment partition
// ─────────────────────────────────────────────────────────────────────────────

/// Session-only runtime facts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvState {
    pub targets: Catalog<IntegrationTarget>,
    pub branches: Catalog<String>,
    pub last_listing: Option<ListingOutcome>,
    pub last_delivery: Option<DeliveryOutcome>,
}

impl Default for EnvState {
    fn default() -> Self {
        Self {
            targets: Arc::from(Vec::new()),
            branches: Arc::from(Vec::new()),
            last_listing: None,
            last_delivery: None,
        }
    }
}

impl EnvState {
    /// Highest-priority available target
    pub fn best_target(&self) -> Option<&IntegrationTarget> {
        self.targets
            .iter()
            .filter(|t| t.available)
            .max_by_key(|t| t.priority)
    }

    pub fn is_available(&self, provider: &str) -> bool {
        self.targets
            .iter()
            .any(|t| t.id == provider && t.available)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// The complete state at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub persistent: Arc<PersistentState>,
    pub configuration: Arc<ConfigState>,
    pub environment: Arc<EnvState>,
}

impl Snapshot {
    pub fn new(persistent: PersistentState) -> Self {
        Self {
            persistent: Arc::new(persistent),
            ..Self::default()
        }
    }

    pub fn is_template_valid(&self) -> bool {
        let template = &self.persistent.template;
        !template.is_empty() && self.configuration.templates.contains(template)
    }

    pub fn is_section_valid(&self) -> bool {
        let section = &self.persistent.section;
        !section.is_empty() && self.configuration.sections.contains(section)
    }

    /// Mode-sets of the current context, if they have been loaded for it
    pub fn current_mode_sets(&self) -> Option<&[ModeSet]> {
        self.configuration
            .mode_sets
            .for_scope(&self.persistent.template)
    }

    /// Tag-sets of the current context, if they have been loaded for it
    pub fn current_tag_sets(&self) -> Option<&[TagSet]> {
        self.configuration
            .tag_sets
            .for_scope(&self.persistent.template)
    }

    /// Encoders of the selected library, if they have been loaded for it
    pub fn current_encoders(&self) -> Option<&[Encoder]> {
        self.configuration
            .encoders
            .for_scope(&self.persistent.tokenizer_lib)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nested::{set_in, update_in, toggle_member};

    #[test]
    fn test_default_ctx_limit() {
        assert_eq!(PersistentState::default().ctx_limit, DEFAULT_CTX_LIMIT);
    }

    #[test]
    fn test_provider_key_falls_back() {
        let mut p = PersistentState::default();
        assert_eq!(p.provider_key(), NO_PROVIDER_KEY);
        p.provider = "claude.cli".into();
        assert_eq!(p.provider_key(), "claude.cli");
    }

    #[test]
    fn test_selected_and_current_modes() {
        let mut p = PersistentState {
            template: "api".into(),
            provider: "claude.cli".into(),
            ..PersistentState::default()
        };
        p.modes = set_in(&p.modes, &["api", "claude.cli", "ai"], "agent".into());
        p.modes = set_in(&p.modes, &["api", "other", "ai"], "ask".into());

        assert_eq!(p.selected_mode("ai"), Some("agent"));
        assert_eq!(
            p.current_modes(),
            vec![("ai".to_string(), "agent".to_string())]
        );
    }

    #[test]
    fn test_current_tags_flattens_sets() {
        let mut p = PersistentState {
            template: "api".into(),
            ..PersistentState::default()
        };
        p.tags = update_in(&p.tags, &["api", "scope"], |s| toggle_member(s, "backend"));
        p.tags = update_in(&p.tags, &["api", "lang"], |s| toggle_member(s, "rust"));
        p.tags = update_in(&p.tags, &["docs", "lang"], |s| toggle_member(s, "go"));
        assert_eq!(p.current_tags(), vec!["backend", "rust"]);
        assert!(p.active_tags("scope").unwrap().contains("backend"));
    }

    #[test]
    fn test_render_target_prefers_context() {
        let mut p = PersistentState {
            section: "core".into(),
            ..PersistentState::default()
        };
        assert_eq!(p.render_target(), Some(RenderTarget::Section("core".into())));
        p.template = "api".into();
        assert_eq!(p.render_target(), Some(RenderTarget::Context("api".into())));
        assert_eq!(PersistentState::default().render_target(), None);
    }

    #[test]
    fn test_scoped_catalog_checks_scope() {
        let scoped = Scoped::new("api", vec![1, 2]);
        assert_eq!(scoped.for_scope("api"), Some(&[1, 2][..]));
        assert_eq!(scoped.for_scope("docs"), None);
    }

    #[test]
    fn test_best_target_ignores_unavailable() {
        let env = EnvState {
            targets: Arc::from(vec![
                IntegrationTarget {
                    id: "a".into(),
                    name: "A".into(),
                    priority: 90,
                    available: false,
                },
                IntegrationTarget {
                    id: "b".into(),
                    name: "B".into(),
                    priority: 10,
                    available: true,
                },
            ]),
            ..EnvState::default()
        };
        assert_eq!(env.best_target().map(|t| t.id.as_str()), Some("b"));
        assert!(!env.is_available("a"));
    }

    #[test]
    fn test_persistent_state_roundtrips_through_json() {
        let mut p = PersistentState {
            template: "api".into(),
            ..PersistentState::default()
        };
        p.tags = update_in(&p.tags, &["api", "scope"], |s| toggle_member(s, "backend"));
        let json = serde_json::to_string(&p).unwrap();
        let back: PersistentState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_persistent_state_missing_fields_use_defaults() {
        let p: PersistentState = serde_json::from_str(r#"{"template":"api"}"#).unwrap();
        assert_eq!(p.template, "api");
        assert_eq!(p.ctx_limit, DEFAULT_CTX_LIMIT);
    }
}
