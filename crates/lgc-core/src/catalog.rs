//! Catalog records reported by the listing tool, plus runtime outcome types
//!
//! These are plain data: they are parsed from the tool's JSON output by
//! `lgc-tool` and stored verbatim inside the coordinator's snapshots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single selectable mode within a mode-set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// A named group of mutually exclusive modes (e.g. "ai-interaction")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSet {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub modes: Vec<Mode>,

    /// Mode the tool recommends when nothing is selected yet
    #[serde(default, rename = "default")]
    pub default_mode: Option<String>,
}

impl ModeSet {
    pub fn contains(&self, mode_id: &str) -> bool {
        self.modes.iter().any(|m| m.id == mode_id)
    }

    /// The mode to pre-select: the declared default if it exists in the set,
    /// otherwise the first mode. `None` for an empty set.
    pub fn initial_mode(&self) -> Option<&str> {
        self.default_mode
            .as_deref()
            .filter(|id| self.contains(id))
            .or_else(|| self.modes.first().map(|m| m.id.as_str()))
    }
}

/// A single tag within a tag-set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// A named group of independently toggleable tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl TagSet {
    pub fn contains(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }
}

/// A tokenizer encoder offered by a tokenizer library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoder {
    pub name: String,

    /// Whether the encoder's vocabulary is already downloaded
    #[serde(default)]
    pub cached: bool,
}

/// An integration target (AI assistant, file sink, ...) that can receive listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationTarget {
    pub id: String,
    pub name: String,
    /// Higher wins when picking a default provider
    pub priority: i32,
    pub available: bool,
}

/// Outcome of the last listing render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ListingOutcome {
    Generated {
        context: String,
        #[serde(skip)]
        content: Arc<str>,
        chars: usize,
        generated_at: DateTime<Utc>,
    },
    Failed {
        context: String,
        error: String,
    },
}

impl ListingOutcome {
    pub fn generated(context: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        Self::Generated {
            context: context.into(),
            chars: content.chars().count(),
            content,
            generated_at: Utc::now(),
        }
    }

    pub fn failed(context: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed {
            context: context.into(),
            error: error.into(),
        }
    }

    pub fn context(&self) -> &str {
        match self {
            Self::Generated { context, .. } | Self::Failed { context, .. } => context,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Generated { content, .. } => Some(content),
            Self::Failed { .. } => None,
        }
    }
}

/// Outcome of handing a listing to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered { provider: String, detail: String },
    Failed { provider: String, error: String },
}

impl DeliveryOutcome {
    pub fn delivered(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Delivered {
            provider: provider.into(),
            detail: detail.into(),
        }
    }

    pub fn failed(provider: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed {
            provider: provider.into(),
            error: error.into(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(id: &str) -> Mode {
        Mode {
            id: id.to_string(),
            title: id.to_uppercase(),
            description: None,
        }
    }

    #[test]
    fn test_initial_mode_prefers_declared_default() {
        let set = ModeSet {
            id: "ai".into(),
            title: "AI".into(),
            modes: vec![mode("ask"), mode("agent")],
            default_mode: Some("agent".into()),
        };
        assert_eq!(set.initial_mode(), Some("agent"));
    }

    #[test]
    fn test_initial_mode_ignores_unknown_default() {
        let set = ModeSet {
            id: "ai".into(),
            title: "AI".into(),
            modes: vec![mode("ask"), mode("agent")],
            default_mode: Some("missing".into()),
        };
        assert_eq!(set.initial_mode(), Some("ask"));
    }

    #[test]
    fn test_initial_mode_empty_set() {
        let set = ModeSet {
            id: "ai".into(),
            title: String::new(),
            modes: vec![],
            default_mode: None,
        };
        assert_eq!(set.initial_mode(), None);
    }

    #[test]
    fn test_mode_set_deserializes_default_key() {
        let json = r#"{"id":"dev","modes":[{"id":"plan"},{"id":"code"}],"default":"code"}"#;
        let set: ModeSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.default_mode.as_deref(), Some("code"));
        assert_eq!(set.modes[0].title, "");
    }

    #[test]
    fn test_listing_outcome_counts_chars() {
        let outcome = ListingOutcome::generated("api-review", "héllo");
        match outcome {
            ListingOutcome::Generated { chars, .. } => assert_eq!(chars, 5),
            _ => panic!("expected generated outcome"),
        }
    }

    #[test]
    fn test_listing_outcome_serializes_without_content() {
        let outcome = ListingOutcome::generated("ctx", "secret body");
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(r#""status":"generated""#));
        assert!(!json.contains("secret body"));
    }
}
