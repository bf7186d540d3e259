//! # lgc-tool - External Tool Boundary
//!
//! Runs the `listing-generator` CLI and `git`, and turns their output into
//! typed catalog records from [`lgc_core`]. Nothing here knows about
//! commands or snapshots; async operations in `lgc-app` call into this crate
//! and convert its results (or errors) into commands.
//!
//! ## Public API
//!
//! ### Process Execution
//! - [`Invocation`] - Program, args, optional stdin, working dir, timeout
//! - [`ToolRunner`] - Async seam for running invocations
//! - [`ProcessRunner`] - `tokio::process` implementation
//! - [`locate()`] - Resolve a program against `PATH`
//!
//! ### Listing Tool
//! - [`ListingTool`] - `list ...` catalog queries and `render`
//! - [`RenderRequest`], [`RenderTarget`] - Parameters of a render call
//!
//! ### Git
//! - [`GitTool`] - Branch listing for the target-branch picker
//!
//! ### Availability
//! - [`probe()`] - Does a program run successfully?
//! - [`ToolAvailability`] - Boot-time check of the listing tool and git

pub mod availability;
pub mod git;
pub mod listing;
pub mod process;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Public API re-exports
pub use availability::{probe, ToolAvailability};
pub use git::GitTool;
pub use listing::{ListingTool, RenderRequest, RenderTarget, DEFAULT_PROGRAM};
pub use process::{
    locate, Invocation, LocalToolRunner, ProcessRunner, ToolOutput, ToolRunner, DEFAULT_TIMEOUT,
};
