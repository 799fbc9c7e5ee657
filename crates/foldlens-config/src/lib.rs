//! # Foldlens Config
//!
//! TOML + environment configuration for the foldlens service.
//!
//! Files support `${VAR}` expansion; `FOLDLENS_*` environment overrides are
//! applied on top of whatever the file sets.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
