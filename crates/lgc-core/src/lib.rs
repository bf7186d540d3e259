//! # lgc-core - Core Domain Types
//!
//! Foundation crate for lg-coordinator. Provides catalog records, error
//! handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing, toml).
//!
//! ## Public API
//!
//! ### Catalog Records (`catalog`)
//! - [`ModeSet`], [`Mode`] - Mutually exclusive modes reported by the listing tool
//! - [`TagSet`], [`Tag`] - Toggleable tags reported by the listing tool
//! - [`Encoder`] - Tokenizer encoder offered by a tokenizer library
//! - [`IntegrationTarget`] - A detected provider that can receive listings
//! - [`ListingOutcome`], [`DeliveryOutcome`] - Results of render/send operations
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use lgc_core::prelude::*;
//! ```

pub mod catalog;
pub mod error;
pub mod logging;
pub mod prelude;

// Re-export commonly used types at crate root for convenience
pub use catalog::{
    DeliveryOutcome, Encoder, IntegrationTarget, ListingOutcome, Mode, ModeSet, Tag, TagSet,
};
pub use error::{Error, Result, ResultExt};
