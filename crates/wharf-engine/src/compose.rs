//! Argv construction for a docker-compose project.

use std::path::{Path, PathBuf};

use nix::unistd::{getgid, getuid};

/// A docker-compose project anchored at the directory that holds the
/// workflow definition file.
///
/// All compose invocations run with this directory as their working
/// directory so that compose picks up the project's own
/// `docker-compose.yaml`.
#[derive(Debug, Clone)]
pub struct ComposeEnv {
    root: PathBuf,
}

impl ComposeEnv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory every compose command must run from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Argv that starts `service` in the background. Compose reuses a
    /// container that is already running, so calling this repeatedly is
    /// safe.
    pub fn up_argv(&self, service: &str) -> Vec<String> {
        ["docker", "compose", "up", "-d", service]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Argv that runs `command` inside the running `service` container.
    ///
    /// `-T` disables TTY allocation; stdio to the container is always a
    /// pipe. With `as_host_user` the command runs as the invoking user's
    /// numeric uid:gid instead of the image default.
    pub fn exec_argv(&self, service: &str, as_host_user: bool, command: &[String]) -> Vec<String> {
        let mut argv: Vec<String> = ["docker", "compose", "exec", "-T"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if as_host_user {
            argv.push("--user".to_string());
            argv.push(format!("{}:{}", getuid(), getgid()));
        }
        argv.push(service.to_string());
        argv.extend(command.iter().cloned());
        argv
    }
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;
