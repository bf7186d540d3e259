//! lg-coordinator library
//!
//! Headless front-end over the `lgc-app` coordinator: boots the catalogs,
//! applies selections given on the command line or stdin, and reports every
//! commit as NDJSON on stdout.

pub mod headless;

pub use headless::runner::{run_headless, HeadlessOptions};
