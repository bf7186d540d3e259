//! Prelude for common imports used throughout all lg-coordinator crates

pub use crate::error::{Error, Result, ResultExt};
pub use tracing::{debug, error, info, instrument, trace, warn};
