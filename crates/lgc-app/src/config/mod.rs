//! Configuration for lg-coordinator
//!
//! Supports:
//! - `.lgc/config.toml` - tool, git, defaults, agents, file provider
//! - `<config_dir>/lg-coordinator/config.toml` - user-wide fallback
//! - `.lgc/state.local.toml` - saved persistent selections

pub mod settings;
pub mod types;

pub use settings::{
    global_config_path, init_config_dir, initial_persistent, load_selections, load_settings,
    project_config_path, read_settings, save_selections, LGC_DIR,
};
pub use types::*;
