//! File logging for the coordinator
//!
//! Stdout belongs to the headless NDJSON stream, so every log line goes to a
//! daily file instead:
//!
//! ```text
//! <data_local_dir>/lg-coordinator/logs/lgc.log.2026-10-19
//! ```
//!
//! The filter comes from `LGC_LOG` (same syntax as `RUST_LOG`). Without it,
//! the coordinator crates log at `info` and everything else at `warn`:
//!
//! ```bash
//! LGC_LOG=debug lgc .
//! LGC_LOG=lgc_app::coordinator=trace,lgc_tool=debug lgc . --generate
//! ```

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "LGC_LOG";

const DEFAULT_FILTER: &str = "lg_coordinator=info,lgc_app=info,lgc_tool=info,warn";

const LOG_FILE_PREFIX: &str = "lgc.log";

/// Install the global subscriber. Fails if one is already installed.
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_timer(fmt::time::ChronoLocal::new("%H:%M:%S%.3f".to_string())),
        )
        .try_init()
        .map_err(|e| Error::config(format!("logging already initialized: {e}")))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        dir = %log_dir.display(),
        "lg-coordinator logging started"
    );
    Ok(())
}

/// `<data_local_dir>/lg-coordinator/logs`, or `./lg-coordinator/logs` on
/// platforms without one
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lg-coordinator")
        .join("logs")
}
