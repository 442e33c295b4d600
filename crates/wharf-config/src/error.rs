//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Definition file not found: {0}")]
    NotFound(String),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("Unknown tag: !{0}")]
    UnknownTag(String),

    #[error("Invalid task '{task}': {message}")]
    InvalidTask { task: String, message: String },

    #[error("Invalid command entry: {0}")]
    InvalidCommand(String),

    #[error("Unknown template variable: {0}")]
    UnknownVariable(String),

    #[error("Template syntax error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = ConfigError::NotFound(".ci.yaml".to_string());
        assert!(err.to_string().contains(".ci.yaml"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_unknown_tag_error() {
        let err = ConfigError::UnknownTag("shell".to_string());
        assert_eq!(err.to_string(), "Unknown tag: !shell");
    }

    #[test]
    fn test_invalid_task_error() {
        let err = ConfigError::InvalidTask {
            task: "build".to_string(),
            message: "missing 'image'".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("build"));
        assert!(display.contains("missing 'image'"));
    }

    #[test]
    fn test_unknown_variable_error() {
        let err = ConfigError::UnknownVariable("NOPE".to_string());
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::from(io_err);
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_debug() {
        let err = ConfigError::NotFound("test.yaml".to_string());
        let debug = format!("{:?}", err);
        assert!(debug.contains("NotFound"));
    }
}
