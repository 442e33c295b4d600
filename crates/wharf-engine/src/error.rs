//! Engine errors.

use thiserror::Error;

/// Process exit code the binary reports for configuration problems.
///
/// Unix truncates exit codes to 0..=255, so the negative sentinel the
/// engine's callers might expect is not expressible; 125 stays clear of
/// ordinary tool exit codes and of the shell's 126/127 conventions.
pub const CONFIG_EXIT_CODE: i32 = 125;

/// Errors raised by the execution engine.
///
/// A nonzero exit code from a task is not an error: executors report it
/// through the `Ok` channel so the orchestrator can apply its fail-fast
/// policy and the caller can distinguish "the tool failed" from "the engine
/// could not run the tool".
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Shell operator '{0}' in a plain command task")]
    OperatorInPlainTask(String),

    #[error("User provisioning failed in service '{service}' (exit code {code})")]
    Provisioning { service: String, code: i32 },

    #[error("Session transport failed: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Process exit code the binary reports for this error.
    ///
    /// Spawn failures use the shell's 127 (command not found) convention,
    /// unresolved identifiers the configuration sentinel, and everything else
    /// a generic 1. Real task exit codes travel through the `Ok` channel and
    /// never reach this mapping.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Spawn { .. } => 127,
            EngineError::UnknownWorkflow(_)
            | EngineError::UnknownTask(_)
            | EngineError::OperatorInPlainTask(_) => CONFIG_EXIT_CODE,
            EngineError::Provisioning { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}
