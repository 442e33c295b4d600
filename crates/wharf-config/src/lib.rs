//! # Wharf Config
//!
//! Parsing of `.ci.yaml` workflow definitions into the task table the
//! engine executes.

mod error;
mod loader;
mod schema;
mod template;

pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFINITION_FILE};
pub use schema::Config;
pub use template::{expand, TemplateVars};
