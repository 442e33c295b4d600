//! Workflow orchestration over the local and session runners.

use std::collections::{BTreeMap, HashMap};

use tracing::{info, warn};

use crate::command::CommandNode;
use crate::compose::ComposeEnv;
use crate::error::EngineError;
use crate::local::LocalRunner;
use crate::output::OutputSink;
use crate::session::SessionRunner;

/// A named unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Plain commands, each spawned directly without a shell.
    Commands(Vec<CommandNode>),
    /// Commands run in one interactive shell inside a compose service.
    Session {
        image: String,
        commands: Vec<CommandNode>,
        default_user: bool,
    },
}

/// Executes workflows task by task, stopping at the first failure.
pub struct WorkflowRunner {
    workflows: BTreeMap<String, Vec<String>>,
    tasks: BTreeMap<String, Task>,
    compose: ComposeEnv,
    sink: OutputSink,
    verbose: bool,
}

impl WorkflowRunner {
    pub fn new(
        workflows: BTreeMap<String, Vec<String>>,
        tasks: BTreeMap<String, Task>,
        compose: ComposeEnv,
    ) -> Self {
        Self {
            workflows,
            tasks,
            compose,
            sink: OutputSink::Stdout,
            verbose: false,
        }
    }

    /// Echo session commands before they run.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Redirect subprocess output, mainly for tests.
    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }

    /// Run every task of `workflow_id` in order.
    ///
    /// Returns the first nonzero task exit code, or 0 when all tasks
    /// succeed. Task identifiers resolve lazily, so an unknown one aborts
    /// the workflow only when its turn comes; whatever ran before it
    /// stays run.
    pub async fn execute(&self, workflow_id: &str) -> Result<i32, EngineError> {
        let task_ids = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| EngineError::UnknownWorkflow(workflow_id.to_string()))?;

        info!("Running workflow '{}'", workflow_id);
        for task_id in task_ids {
            let code = self.run_task(task_id).await?;
            if code != 0 {
                warn!("Task '{}' failed with exit code {}", task_id, code);
                return Ok(code);
            }
        }
        Ok(0)
    }

    async fn run_task(&self, task_id: &str) -> Result<i32, EngineError> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| EngineError::UnknownTask(task_id.to_string()))?;

        info!("Running task '{}'", task_id);
        match task {
            Task::Commands(commands) => self.run_commands(commands).await,
            Task::Session {
                image,
                commands,
                default_user,
            } => {
                let code = self.ensure_up(image).await?;
                if code != 0 {
                    return Ok(code);
                }
                SessionRunner::new(self.sink.clone(), self.verbose)
                    .run(&self.compose, image, commands, *default_user)
                    .await
            }
        }
    }

    async fn run_commands(&self, commands: &[CommandNode]) -> Result<i32, EngineError> {
        let runner = LocalRunner::new(self.sink.clone());
        for command in commands {
            let argv = command.flatten_argv()?;
            let code = runner
                .run(&argv, Some(self.compose.root()), &HashMap::new())
                .await?;
            if code != 0 {
                return Ok(code);
            }
        }
        Ok(0)
    }

    /// Start the backing service. Compose reuses a running container, so
    /// repeated calls are harmless.
    async fn ensure_up(&self, service: &str) -> Result<i32, EngineError> {
        info!("Ensuring service '{}' is up", service);
        let runner = LocalRunner::new(self.sink.clone());
        runner
            .run(
                &self.compose.up_argv(service),
                Some(self.compose.root()),
                &HashMap::new(),
            )
            .await
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
