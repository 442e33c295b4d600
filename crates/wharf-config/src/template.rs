//! `{NAME}` template expansion for definition files.

use std::collections::HashMap;

use nix::unistd::{getgid, getuid};

use crate::error::ConfigError;

/// Values available to `!env` templates: the invoking user's numeric
/// identity plus the process environment. Environment variables shadow
/// the `UID`/`GID` built-ins when both are present.
#[derive(Debug, Clone)]
pub struct TemplateVars {
    uid: String,
    gid: String,
    env: HashMap<String, String>,
}

impl TemplateVars {
    /// Capture the current process identity and environment.
    pub fn capture() -> Self {
        Self {
            uid: getuid().to_string(),
            gid: getgid().to_string(),
            env: std::env::vars().collect(),
        }
    }

    /// Build a fixed variable set, mainly for tests.
    pub fn new(uid: u32, gid: u32, env: HashMap<String, String>) -> Self {
        Self {
            uid: uid.to_string(),
            gid: gid.to_string(),
            env,
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str).or(match name {
            "UID" => Some(self.uid.as_str()),
            "GID" => Some(self.gid.as_str()),
            _ => None,
        })
    }
}

/// Expand `{NAME}` placeholders in `template` against `vars`.
///
/// `{{` and `}}` produce literal braces. An unknown name or unbalanced
/// brace is a configuration error; expansion happens at parse time, so
/// these surface before anything runs.
pub fn expand(template: &str, vars: &TemplateVars) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(ConfigError::Template(format!(
                                "unclosed '{{' in \"{template}\""
                            )));
                        }
                    }
                }
                match vars.lookup(&name) {
                    Some(value) => out.push_str(value),
                    None => return Err(ConfigError::UnknownVariable(name)),
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(ConfigError::Template(format!(
                        "single '}}' in \"{template}\""
                    )));
                }
            }
            c => out.push(c),
        }
    }
    Ok(out)
}
