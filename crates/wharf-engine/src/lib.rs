//! Command execution engine for wharf.
//!
//! This crate provides:
//! - `command`: composable command trees and POSIX-safe shell serialization
//! - `local`: one-shot subprocess execution with live merged output
//! - `session`: interactive shell sessions inside compose services
//! - `workflow`: fail-fast execution of ordered task sequences

mod command;
mod compose;
mod error;
mod local;
mod output;
mod session;
mod workflow;

pub use command::{CommandNode, shell_quote};
pub use compose::ComposeEnv;
pub use error::{CONFIG_EXIT_CODE, EngineError};
pub use local::LocalRunner;
pub use output::OutputSink;
pub use session::{Session, SessionRunner};
pub use workflow::{Task, WorkflowRunner};
