//! Headless mode - NDJSON event output
//!
//! The coordinator's commits are written to stdout as newline-delimited JSON
//! so editor integrations and scripts can follow state without a UI.
//!
//! # Event Format
//!
//! Each line is one event with an `"event"` tag and a millisecond timestamp:
//!
//! ```json
//! {"event":"started","project":"/work/api","timestamp":1704700001000}
//! {"event":"commit","revision":3,"snapshot":{...},"timestamp":1704700001200}
//! {"event":"final","revision":9,"snapshot":{...},"timestamp":1704700002000}
//! ```

pub mod runner;
pub mod stdin;

use std::io::{self, Write};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::error;

use lgc_app::Snapshot;
use lgc_core::{DeliveryOutcome, ListingOutcome};

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Coordinator booted for a project
    Started { project: String, timestamp: i64 },

    /// An external tool is missing; the coordinator keeps running degraded
    ToolMissing {
        tool: String,
        message: String,
        timestamp: i64,
    },

    /// A snapshot was committed
    Commit {
        revision: u64,
        snapshot: Arc<Snapshot>,
        timestamp: i64,
    },

    /// A rendered listing (content included, unlike in snapshots)
    Listing {
        context: String,
        chars: usize,
        content: String,
        timestamp: i64,
    },

    /// Outcome of a send
    Delivery {
        #[serde(flatten)]
        outcome: DeliveryOutcome,
        timestamp: i64,
    },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },

    /// Last snapshot before exit
    Final {
        revision: u64,
        snapshot: Arc<Snapshot>,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as one JSON line
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }
        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn started(project: &str) -> Self {
        Self::Started {
            project: project.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn tool_missing(tool: &str, message: &str) -> Self {
        Self::ToolMissing {
            tool: tool.to_string(),
            message: message.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn commit(snapshot: Arc<Snapshot>, revision: u64) -> Self {
        Self::Commit {
            revision,
            snapshot,
            timestamp: Self::now(),
        }
    }

    /// `None` for a failed render
    pub fn listing(outcome: &ListingOutcome) -> Option<Self> {
        let content = outcome.content()?;
        Some(Self::Listing {
            context: outcome.context().to_string(),
            chars: content.chars().count(),
            content: content.to_string(),
            timestamp: Self::now(),
        })
    }

    pub fn delivery(outcome: DeliveryOutcome) -> Self {
        Self::Delivery {
            outcome,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }

    pub fn final_state(snapshot: Arc<Snapshot>, revision: u64) -> Self {
        Self::Final {
            revision,
            snapshot,
            timestamp: Self::now(),
        }
    }
}
