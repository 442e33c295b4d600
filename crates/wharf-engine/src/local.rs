//! Local subprocess execution.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::EngineError;
use crate::output::OutputSink;

/// Runs one flat command as a child process, streaming its merged output.
pub struct LocalRunner {
    sink: OutputSink,
}

impl LocalRunner {
    pub fn new(sink: OutputSink) -> Self {
        Self { sink }
    }

    /// Spawn `argv` and stream merged stdout/stderr until it exits.
    ///
    /// `env` is overlaid on the inherited environment for the child only;
    /// the engine's own environment is never touched. Output is forwarded
    /// line by line as it arrives, never buffered whole. Returns the child's
    /// exit code; failure to start at all is [`EngineError::Spawn`].
    pub async fn run(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<i32, EngineError> {
        let (program, args) = argv.split_first().ok_or_else(|| EngineError::Spawn {
            program: "(empty command)".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
        })?;
        debug!("Running {:?}", argv);

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            // Shells maintain PWD themselves; plain children inherit a stale
            // one unless it is overridden along with the directory.
            command.current_dir(dir).env("PWD", dir);
        }
        command.envs(env);

        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| EngineError::Spawn {
            program: program.clone(),
            source: std::io::Error::other("stdout not captured"),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| EngineError::Spawn {
            program: program.clone(),
            source: std::io::Error::other("stderr not captured"),
        })?;

        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(1024);
        spawn_line_reader(stdout, tx.clone());
        spawn_line_reader(stderr, tx);

        while let Some(chunk) = rx.recv().await {
            self.sink.write_chunk(&chunk)?;
        }

        let status = child.wait().await?;
        Ok(exit_code(&status))
    }
}

/// Read `stream` line by line (raw bytes, newline included) into `tx`.
fn spawn_line_reader<R>(stream: R, tx: mpsc::Sender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        loop {
            let mut chunk = Vec::new();
            match reader.read_until(b'\n', &mut chunk).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(chunk).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

/// Exit code of a finished child, reporting signal deaths the way shells do.
pub(crate) fn exit_code(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
