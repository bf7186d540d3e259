//! Settings loading and selection persistence
//!
//! Lookup order for `config.toml`:
//! 1. `<project>/.lgc/config.toml`
//! 2. `<config_dir>/lg-coordinator/config.toml`
//! 3. built-in defaults
//!
//! Persistent selections live in `<project>/.lgc/state.local.toml`.

use std::path::{Path, PathBuf};

use lgc_core::prelude::*;

use super::types::Settings;
use crate::state::{PersistentState, MAX_CTX_LIMIT};

pub const LGC_DIR: &str = ".lgc";
const CONFIG_FILENAME: &str = "config.toml";
const STATE_FILENAME: &str = "state.local.toml";
const APP_DIR: &str = "lg-coordinator";

/// `<config_dir>/lg-coordinator/config.toml`, if the platform has one
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

pub fn project_config_path(project_path: &Path) -> PathBuf {
    project_path.join(LGC_DIR).join(CONFIG_FILENAME)
}

/// Parse one settings file strictly
pub fn read_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let settings = toml::from_str(&content)?;
    Ok(settings)
}

/// Load settings for `project_path`, falling back to defaults on any problem
pub fn load_settings(project_path: &Path) -> Settings {
    let candidates = std::iter::once(project_config_path(project_path)).chain(global_config_path());

    for path in candidates {
        match read_settings(&path) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", path);
                return settings;
            }
            Err(Error::ConfigNotFound { .. }) => {
                debug!("No config file at {:?}", path);
            }
            Err(e) => {
                warn!("Failed to load {:?}: {}; using defaults", path, e);
                return Settings::default();
            }
        }
    }

    Settings::default()
}

/// Create `.lgc/config.toml` with commented defaults if it does not exist
pub fn init_config_dir(project_path: &Path) -> Result<PathBuf> {
    let lgc_dir = project_path.join(LGC_DIR);
    std::fs::create_dir_all(&lgc_dir)
        .with_context(|| format!("Failed to create {}", lgc_dir.display()))?;

    let config_path = lgc_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        info!("Created {:?}", config_path);
    }
    Ok(config_path)
}

const DEFAULT_CONFIG: &str = r#"# lg-coordinator configuration

[tool]
command = "listing-generator"
timeout_secs = 60

[git]
command = "git"

[defaults]
ctx_limit = 128000
# tokenizer_lib = "tiktoken"
# encoder = "cl100k_base"

# [[agents]]
# id = "claude.cli"
# name = "Claude CLI"
# command = "claude"
# args = ["-p"]
# priority = 50
# mode_arg = "--permission-mode"

[file_provider]
path = ".lgc/last-listing.md"
"#;

// ─────────────────────────────────────────────────────────────────────────────
// Persistent selections
// ─────────────────────────────────────────────────────────────────────────────

/// Restore the persistent partition saved by [`save_selections`]
pub fn load_selections(project_path: &Path) -> Option<PersistentState> {
    let path = project_path.join(LGC_DIR).join(STATE_FILENAME);
    if !path.exists() {
        debug!("No saved selections at {:?}", path);
        return None;
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(state) => {
                debug!("Restored selections from {:?}", path);
                Some(state)
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            None
        }
    }
}

/// Save the persistent partition (temp file + rename)
pub fn save_selections(project_path: &Path, state: &PersistentState) -> Result<()> {
    let lgc_dir = project_path.join(LGC_DIR);
    std::fs::create_dir_all(&lgc_dir)
        .with_context(|| format!("Failed to create {}", lgc_dir.display()))?;

    let content = toml::to_string_pretty(state)
        .map_err(|e| Error::config(format!("Failed to serialize selections: {}", e)))?;
    let full_content = format!("# Saved selections (not tracked in git)\n\n{}", content);

    let temp_path = lgc_dir.join(".state.local.toml.tmp");
    std::fs::write(&temp_path, full_content).context("Failed to write selections temp file")?;
    std::fs::rename(&temp_path, lgc_dir.join(STATE_FILENAME))
        .context("Failed to replace saved selections")?;

    debug!("Saved selections to {:?}", lgc_dir.join(STATE_FILENAME));
    Ok(())
}

/// Starting persistent state: saved selections if any, else configured defaults
pub fn initial_persistent(settings: &Settings, restored: Option<PersistentState>) -> PersistentState {
    let mut state = restored.unwrap_or_else(|| {
        let defaults = &settings.defaults;
        PersistentState {
            ctx_limit: defaults.ctx_limit,
            tokenizer_lib: defaults.tokenizer_lib.clone().unwrap_or_default(),
            encoder: defaults.encoder.clone().unwrap_or_default(),
            ..PersistentState::default()
        }
    });
    if !(1..=MAX_CTX_LIMIT).contains(&state.ctx_limit) {
        warn!(
            "ctx_limit {} out of range; using {}",
            state.ctx_limit,
            settings.defaults.ctx_limit.clamp(1, MAX_CTX_LIMIT)
        );
        state.ctx_limit = settings.defaults.ctx_limit.clamp(1, MAX_CTX_LIMIT);
    }
    state
}
