//! ChatSearch Core: error taxonomy, configuration, wire types, trigger rules.

pub mod config;
pub mod error;
pub mod trigger;
pub mod types;

pub use config::{BackendConfig, ChatSearchConfig};
pub use error::{Error, Result};
pub use types::*;
