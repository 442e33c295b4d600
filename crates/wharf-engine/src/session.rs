//! Interactive shell sessions inside compose containers.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use nix::unistd::{getgid, getuid, Gid, Uid};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::command::CommandNode;
use crate::compose::ComposeEnv;
use crate::error::EngineError;
use crate::local::{exit_code, LocalRunner};
use crate::output::OutputSink;

/// Account created inside session containers when running as the host user.
pub(crate) const SESSION_USER: &str = "wharf";

enum SessionInput {
    Line(String),
    Interrupt,
}

enum SessionOutput {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

/// A live shell with piped stdio, fed line by line.
///
/// The shell runs in its own process group so a terminal Ctrl-C does not
/// reach it directly; interrupts are forwarded as a `0x03` byte on its
/// stdin instead.
pub struct Session {
    child: Child,
    input: mpsc::UnboundedSender<SessionInput>,
    output: mpsc::Receiver<SessionOutput>,
}

impl Session {
    /// Spawn `argv` from `cwd` and wire up the stdio pumps.
    pub fn open(argv: &[String], cwd: &Path) -> Result<Self, EngineError> {
        let (program, args) = argv.split_first().ok_or_else(|| EngineError::Spawn {
            program: "(empty command)".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
        })?;

        let mut command = std::process::Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut command = Command::from(command);
        command.kill_on_drop(true);
        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Session("stdin pipe missing".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Session("stdout pipe missing".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Session("stderr pipe missing".to_string()))?;

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        spawn_writer(stdin, input_rx);

        let (output_tx, output_rx) = mpsc::channel(1024);
        spawn_reader(output_tx.clone(), stdout, SessionOutput::Stdout);
        spawn_reader(output_tx, stderr, SessionOutput::Stderr);

        Ok(Self {
            child,
            input: input_tx,
            output: output_rx,
        })
    }

    /// Queue script lines for the shell.
    ///
    /// A closed channel means the shell already exited; the failure shows
    /// up in the exit code, so send errors are dropped here.
    pub fn feed_script<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            let _ = self.input.send(SessionInput::Line(line.into()));
        }
    }

    /// Inject an interrupt byte into the shell's stdin.
    pub fn send_interrupt(&self) {
        let _ = self.input.send(SessionInput::Interrupt);
    }

    /// Drain output into `sink` until the shell exits and return its exit
    /// code. Ctrl-C received while draining is forwarded to the shell.
    ///
    /// The first stdout line is expected to be the `echo $$` readiness
    /// banner; when it parses as a PID it is logged instead of printed.
    /// Anything else is forwarded untouched.
    pub async fn stream_to_end(self, sink: &OutputSink) -> Result<i32, EngineError> {
        let Session {
            mut child,
            input,
            mut output,
        } = self;

        let interrupts = input.clone();
        let watcher = tokio::spawn(async move {
            loop {
                if signal::ctrl_c().await.is_err() {
                    break;
                }
                warn!("Interrupt received, forwarding to the session shell");
                if interrupts.send(SessionInput::Interrupt).is_err() {
                    break;
                }
            }
        });

        let mut banner_pending = true;
        while let Some(message) = output.recv().await {
            match message {
                SessionOutput::Stdout(chunk) => {
                    if banner_pending {
                        banner_pending = false;
                        let line = String::from_utf8_lossy(&chunk);
                        let line = line.trim_end();
                        if !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()) {
                            debug!(pid = %line, "Session shell is up");
                            continue;
                        }
                    }
                    sink.write_chunk(&chunk)?;
                }
                SessionOutput::Stderr(chunk) => sink.write_chunk(&chunk)?,
            }
        }

        watcher.abort();
        drop(input);
        let status = child.wait().await?;
        Ok(exit_code(&status))
    }
}

fn spawn_writer(mut stdin: ChildStdin, mut rx: mpsc::UnboundedReceiver<SessionInput>) {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let result = match message {
                SessionInput::Line(line) => {
                    let mut bytes = line.into_bytes();
                    bytes.push(b'\n');
                    stdin.write_all(&bytes).await
                }
                SessionInput::Interrupt => stdin.write_all(&[0x03]).await,
            };
            // Write failures mean the shell hung up; its exit code tells
            // the rest of the story.
            if result.is_err() || stdin.flush().await.is_err() {
                break;
            }
        }
    });
}

fn spawn_reader<R>(tx: mpsc::Sender<SessionOutput>, stream: R, wrap: fn(Vec<u8>) -> SessionOutput)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        loop {
            let mut chunk = Vec::new();
            match reader.read_until(b'\n', &mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(wrap(chunk)).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Lines fed to a session shell for one task.
///
/// The PID banner signals readiness, `set -e` makes the script fail fast
/// (`-x` echoes commands when verbose), and the trailing `exit` ends the
/// shell so its exit code is the script's.
fn session_script(commands: &[CommandNode], verbose: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(commands.len() + 3);
    lines.push("echo $$".to_string());
    lines.push(if verbose { "set -ex" } else { "set -e" }.to_string());
    for command in commands {
        lines.push(command.serialize());
    }
    lines.push("exit".to_string());
    lines
}

/// Script that makes the invoking host user exist inside a container,
/// with passwordless sudo. The getent guards keep repeated runs against a
/// long-lived container from failing; the sudoers entry is simply
/// overwritten each time.
fn bootstrap_script(uid: Uid, gid: Gid) -> String {
    format!(
        "getent group {gid} >/dev/null || groupadd -g {gid} {user}\n\
         getent passwd {uid} >/dev/null || useradd -u {uid} -g {gid} -m -s /bin/bash {user}\n\
         printf '%s ALL=(ALL) NOPASSWD:ALL\\n' \"$(getent passwd {uid} | cut -d: -f1)\" > /etc/sudoers.d/{user}\n",
        uid = uid,
        gid = gid,
        user = SESSION_USER,
    )
}

/// Runs session tasks: brings the host user into the container, opens a
/// shell there and feeds it the task's commands.
pub struct SessionRunner {
    sink: OutputSink,
    verbose: bool,
}

impl SessionRunner {
    pub fn new(sink: OutputSink, verbose: bool) -> Self {
        Self { sink, verbose }
    }

    /// Run `commands` in a fresh shell inside the `image` service.
    ///
    /// With `default_user` the shell runs as whatever user the image
    /// ships with and no provisioning happens. Otherwise the host uid:gid
    /// is provisioned first and the shell runs as that user.
    pub async fn run(
        &self,
        compose: &ComposeEnv,
        image: &str,
        commands: &[CommandNode],
        default_user: bool,
    ) -> Result<i32, EngineError> {
        if !default_user {
            self.provision_user(compose, image).await?;
        }

        let shell = vec!["bash".to_string()];
        let argv = compose.exec_argv(image, !default_user, &shell);
        let session = Session::open(&argv, compose.root())?;
        session.feed_script(session_script(commands, self.verbose));
        session.stream_to_end(&self.sink).await
    }

    async fn provision_user(&self, compose: &ComposeEnv, service: &str) -> Result<(), EngineError> {
        debug!(service, "Provisioning host user in container");
        let script = bootstrap_script(getuid(), getgid());
        let argv = compose.exec_argv(
            service,
            false,
            &["sh".to_string(), "-c".to_string(), script],
        );
        let runner = LocalRunner::new(self.sink.clone());
        let code = runner
            .run(&argv, Some(compose.root()), &HashMap::new())
            .await?;
        if code != 0 {
            return Err(EngineError::Provisioning {
                service: service.to_string(),
                code,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
