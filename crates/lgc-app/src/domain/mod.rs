//! Domain rule sets
//!
//! Each submodule registers the rules for one area of the state:
//!
//! - `catalogs` - boot, catalog reloads and their `...Loaded` results
//! - `selection` - context, section, tags and modes
//! - `tokenizer` - tokenizer library, encoder and context limit
//! - `provider` - integration provider and its settings
//! - `environment` - provider detection, git branches, task text
//! - `listing` - render and send
//!
//! [`registry()`] assembles them into one immutable [`Registry`].

use std::sync::Arc;

use lgc_core::prelude::*;

use crate::registry::{Registry, RegistryBuilder};
use crate::services::{Runner, Services};

mod catalogs;
pub mod commands;
mod environment;
mod listing;
mod provider;
mod selection;
mod tokenizer;

#[cfg(test)]
mod tests;

pub use commands::*;
pub use listing::render_request;

/// Build the registry of every domain rule, wired to `services`
pub fn registry<R: Runner>(services: Arc<Services<R>>) -> Result<Registry> {
    let mut builder = RegistryBuilder::new();
    catalogs::register(&mut builder, &services)?;
    selection::register(&mut builder, &services)?;
    tokenizer::register(&mut builder, &services)?;
    provider::register(&mut builder)?;
    environment::register(&mut builder, &services)?;
    listing::register(&mut builder, &services)?;

    let registry = builder.build();
    debug!("domain registry built: {:?}", registry);
    Ok(registry)
}
