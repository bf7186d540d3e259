//! Command descriptors and payloads of the domain rule sets

use lgc_core::{DeliveryOutcome, Encoder, IntegrationTarget, ListingOutcome, ModeSet, TagSet};

use crate::command::CommandDescriptor;

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSetsLoaded {
    /// Context the catalog was requested for
    pub context: String,
    pub mode_sets: Vec<ModeSet>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSetsLoaded {
    pub context: String,
    pub tag_sets: Vec<TagSet>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodersLoaded {
    /// Tokenizer library the encoders belong to
    pub lib: String,
    pub encoders: Vec<Encoder>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToggle {
    pub tag_set: String,
    pub tag: String,
}

impl TagToggle {
    pub fn new(tag_set: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            tag_set: tag_set.into(),
            tag: tag.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSelection {
    pub mode_set: String,
    pub mode: String,
}

impl ModeSelection {
    pub fn new(mode_set: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            mode_set: mode_set.into(),
            mode: mode.into(),
        }
    }
}

/// `value: None` deletes the setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSetting {
    pub provider: String,
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDelivered {
    pub listing: ListingOutcome,
    /// `None` when rendering failed and nothing was sent
    pub delivery: Option<DeliveryOutcome>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Initial loads: catalogs, provider detection, branches
pub const BOOT: CommandDescriptor<()> = CommandDescriptor::new("app/BOOT");

// Catalogs
pub const RELOAD_CATALOGS: CommandDescriptor<()> = CommandDescriptor::new("catalogs/RELOAD");
pub const TEMPLATES_LOADED: CommandDescriptor<Vec<String>> =
    CommandDescriptor::new("catalogs/TEMPLATES_LOADED");
pub const SECTIONS_LOADED: CommandDescriptor<Vec<String>> =
    CommandDescriptor::new("catalogs/SECTIONS_LOADED");
pub const TOKENIZER_LIBS_LOADED: CommandDescriptor<Vec<String>> =
    CommandDescriptor::new("catalogs/TOKENIZER_LIBS_LOADED");
pub const MODE_SETS_LOADED: CommandDescriptor<ModeSetsLoaded> =
    CommandDescriptor::new("catalogs/MODE_SETS_LOADED");
pub const TAG_SETS_LOADED: CommandDescriptor<TagSetsLoaded> =
    CommandDescriptor::new("catalogs/TAG_SETS_LOADED");
pub const ENCODERS_LOADED: CommandDescriptor<EncodersLoaded> =
    CommandDescriptor::new("tokenizer/ENCODERS_LOADED");

// Context and section
pub const SELECT_CONTEXT: CommandDescriptor<String> = CommandDescriptor::new("context/SELECT");
pub const ENSURE_CONTEXT_VALID: CommandDescriptor<()> =
    CommandDescriptor::new("context/ENSURE_VALID");
pub const SELECT_SECTION: CommandDescriptor<String> = CommandDescriptor::new("section/SELECT");
pub const ENSURE_SECTION_VALID: CommandDescriptor<()> =
    CommandDescriptor::new("section/ENSURE_VALID");

// Tags and modes
pub const TOGGLE_TAG: CommandDescriptor<TagToggle> = CommandDescriptor::new("tags/TOGGLE");
pub const CLEAR_TAGS: CommandDescriptor<()> = CommandDescriptor::new("tags/CLEAR");
pub const SELECT_MODE: CommandDescriptor<ModeSelection> = CommandDescriptor::new("modes/SELECT");
pub const ENSURE_MODE_DEFAULTS: CommandDescriptor<()> =
    CommandDescriptor::new("modes/ENSURE_DEFAULTS");

// Tokenizer
pub const SELECT_TOKENIZER_LIB: CommandDescriptor<String> =
    CommandDescriptor::new("tokenizer/SELECT_LIB");
pub const ENSURE_TOKENIZER_LIB: CommandDescriptor<()> =
    CommandDescriptor::new("tokenizer/ENSURE_LIB");
pub const SELECT_ENCODER: CommandDescriptor<String> =
    CommandDescriptor::new("tokenizer/SELECT_ENCODER");
pub const ENSURE_ENCODER: CommandDescriptor<()> = CommandDescriptor::new("tokenizer/ENSURE_ENCODER");
pub const SET_CTX_LIMIT: CommandDescriptor<u64> = CommandDescriptor::new("tokenizer/SET_LIMIT");

// Provider
pub const SELECT_PROVIDER: CommandDescriptor<String> = CommandDescriptor::new("provider/SELECT");
pub const ENSURE_PROVIDER_VALID: CommandDescriptor<()> =
    CommandDescriptor::new("provider/ENSURE_VALID");
pub const SET_PROVIDER_SETTING: CommandDescriptor<ProviderSetting> =
    CommandDescriptor::new("provider/SET_SETTING");

// Environment
pub const DETECT_TARGETS: CommandDescriptor<()> = CommandDescriptor::new("env/DETECT_TARGETS");
pub const TARGETS_DETECTED: CommandDescriptor<Vec<IntegrationTarget>> =
    CommandDescriptor::new("env/TARGETS_DETECTED");
pub const RELOAD_BRANCHES: CommandDescriptor<()> = CommandDescriptor::new("env/RELOAD_BRANCHES");
pub const BRANCHES_LOADED: CommandDescriptor<Vec<String>> =
    CommandDescriptor::new("env/BRANCHES_LOADED");
pub const SELECT_BRANCH: CommandDescriptor<String> = CommandDescriptor::new("branch/SELECT");
pub const SET_TASK_TEXT: CommandDescriptor<String> = CommandDescriptor::new("task/SET_TEXT");

// Listing
pub const GENERATE_LISTING: CommandDescriptor<()> = CommandDescriptor::new("listing/GENERATE");
pub const LISTING_GENERATED: CommandDescriptor<ListingOutcome> =
    CommandDescriptor::new("listing/GENERATED");
pub const SEND_LISTING: CommandDescriptor<()> = CommandDescriptor::new("listing/SEND");
pub const LISTING_DELIVERED: CommandDescriptor<ListingDelivered> =
    CommandDescriptor::new("listing/DELIVERED");
