//! Definition file discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::schema::{parse_config, Config};
use crate::template::TemplateVars;

/// Name of the workflow definition file.
pub const DEFINITION_FILE: &str = ".ci.yaml";

/// Finds and loads `.ci.yaml` definition files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Walk upward from `start` to the nearest directory containing a
    /// definition file and return that file's path.
    pub fn discover(start: &Path) -> Result<PathBuf, ConfigError> {
        let mut dir = start.canonicalize()?;
        loop {
            let candidate = dir.join(DEFINITION_FILE);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !dir.pop() {
                return Err(ConfigError::NotFound(DEFINITION_FILE.to_string()));
            }
        }
    }

    /// Load a definition file.
    pub fn load(path: &Path, vars: &TemplateVars) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content, vars)
    }

    /// Load a definition from a string.
    pub fn load_str(content: &str, vars: &TemplateVars) -> Result<Config, ConfigError> {
        parse_config(content, vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars() -> TemplateVars {
        TemplateVars::new(1000, 2000, HashMap::new())
    }

    const DEFINITION: &str = "\
workflows:
  ci: [build]
tasks:
  build:
    - [make, all]
";

    #[test]
    fn test_discover_in_start_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFINITION_FILE), DEFINITION).unwrap();
        let found = ConfigLoader::discover(dir.path()).unwrap();
        assert_eq!(
            found,
            dir.path().canonicalize().unwrap().join(DEFINITION_FILE)
        );
    }

    #[test]
    fn test_discover_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFINITION_FILE), DEFINITION).unwrap();
        let nested = dir.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();
        let found = ConfigLoader::discover(&nested).unwrap();
        assert_eq!(
            found,
            dir.path().canonicalize().unwrap().join(DEFINITION_FILE)
        );
    }

    #[test]
    fn test_discover_missing_definition() {
        let dir = tempfile::tempdir().unwrap();
        match ConfigLoader::discover(dir.path()) {
            Err(ConfigError::NotFound(name)) => assert_eq!(name, DEFINITION_FILE),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEFINITION.as_bytes()).unwrap();
        let config = ConfigLoader::load(file.path(), &vars()).unwrap();
        assert_eq!(config.workflows["ci"], vec!["build"]);
        assert!(config.tasks.contains_key("build"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/.ci.yaml"), &vars());
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let result = ConfigLoader::load_str("workflows: [unclosed", &vars());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
