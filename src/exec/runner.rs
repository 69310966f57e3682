// src/exec/runner.rs

//! Launch and supervise one deployment process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::RunnerSection;
use crate::errors::{Result, StackrunError};
use crate::event::{EventSender, EventStream, RunError};
use crate::fs::{DirectoryRemover, RealDirectoryRemover};

use super::classify::{ClassifierHandles, OutputClassifier, PromptEcho, StdoutEcho};
use super::input::{AnswerSource, PromptReply};
use super::launcher::{CommandLauncher, ExitFuture, LaunchedProcess, ProcessLauncher};

pub const DEFAULT_PROMPT_PREFIX: &str = "MFA token for";

/// One invocation of the deployment tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub working_dir: PathBuf,
    pub argv: Vec<String>,
    /// Removed once the run is over, whatever the outcome.
    pub scratch_dir: Option<PathBuf>,
    pub execution_name: String,
}

impl RunRequest {
    pub fn new(working_dir: impl Into<PathBuf>, argv: Vec<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            argv,
            scratch_dir: None,
            execution_name: String::new(),
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_execution_name(mut self, name: impl Into<String>) -> Self {
        self.execution_name = name.into();
        self
    }
}

/// Removes the scratch directory when dropped, so every exit path of a run
/// (launch failure, normal completion, a panicking supervisor) cleans up
/// exactly once.
struct ScratchCleanup {
    remover: Arc<dyn DirectoryRemover>,
    dir: Option<PathBuf>,
    execution_name: String,
}

impl Drop for ScratchCleanup {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match self.remover.remove_all(&dir) {
            Ok(()) => debug!(execution = %self.execution_name, dir = ?dir, "removed scratch directory"),
            Err(e) => error!(
                execution = %self.execution_name,
                dir = ?dir,
                error = %e,
                "tried to delete scratch directory but failed"
            ),
        }
    }
}

/// Starts deployment processes and turns each into an [`EventStream`].
pub struct ProcessRunner {
    launcher: Arc<dyn ProcessLauncher>,
    remover: Arc<dyn DirectoryRemover>,
    echo: Arc<dyn PromptEcho>,
    answers: Option<AnswerSource>,
    prompt_prefix: String,
    event_buffer: usize,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("launcher", &self.launcher)
            .field("remover", &self.remover)
            .field("forward_stdin", &self.answers.is_some())
            .field("prompt_prefix", &self.prompt_prefix)
            .field("event_buffer", &self.event_buffer)
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, remover: Arc<dyn DirectoryRemover>) -> Self {
        Self {
            launcher,
            remover,
            echo: Arc::new(StdoutEcho),
            answers: Some(AnswerSource::host_stdin()),
            prompt_prefix: DEFAULT_PROMPT_PREFIX.to_string(),
            event_buffer: 1,
        }
    }

    /// Production runner wired from the `[runner]` config section.
    pub fn from_config(cfg: &RunnerSection) -> Self {
        let launcher = CommandLauncher::for_tool(cfg.program.clone(), cfg.tool_alias.clone());
        let mut runner = Self::new(Arc::new(launcher), Arc::new(RealDirectoryRemover))
            .with_prompt_prefix(cfg.prompt_prefix.clone())
            .with_event_buffer(cfg.event_buffer);
        if !cfg.forward_stdin {
            runner = runner.with_answers(None);
        }
        runner
    }

    pub fn with_prompt_echo(mut self, echo: Arc<dyn PromptEcho>) -> Self {
        self.echo = echo;
        self
    }

    /// Where prompt answers come from; `None` closes child stdin right after
    /// launch. Runs started by this runner share the source.
    pub fn with_answers(mut self, answers: Option<AnswerSource>) -> Self {
        self.answers = answers;
        self
    }

    pub fn with_prompt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prompt_prefix = prefix.into();
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    /// Start the process described by `req`.
    ///
    /// On launch failure the scratch directory is removed before returning
    /// and no stream exists. Otherwise the returned stream yields one event
    /// per stderr line, then (only if the process failed) a terminal event
    /// carrying the error, and then closes. Closing without a terminal event
    /// means success.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self, req: RunRequest) -> Result<EventStream> {
        let RunRequest {
            working_dir,
            argv,
            scratch_dir,
            execution_name,
        } = req;

        let cleanup = ScratchCleanup {
            remover: Arc::clone(&self.remover),
            dir: scratch_dir.filter(|d| !d.as_os_str().is_empty()),
            execution_name: execution_name.clone(),
        };

        info!(
            execution = %execution_name,
            dir = ?working_dir,
            ?argv,
            "starting deployment process"
        );

        let process = self
            .launcher
            .launch(&working_dir, &argv)
            .map_err(|e| launch_error(&working_dir, e))?;

        let LaunchedProcess {
            stdin,
            stdout,
            stderr,
            exit,
        } = process;

        let reply = match &self.answers {
            Some(answers) => Some(PromptReply::new(stdin, answers.clone())),
            None => {
                drop(stdin);
                None
            }
        };

        let (tx, rx) = mpsc::channel(self.event_buffer);
        let handles = OutputClassifier::new(
            execution_name.clone(),
            self.prompt_prefix.clone(),
            Arc::clone(&self.echo),
        )
        .with_reply(reply)
        .spawn(stdout, stderr, tx.clone());

        tokio::spawn(supervise(handles, exit, tx, cleanup));

        Ok(rx)
    }
}

fn launch_error(working_dir: &Path, err: anyhow::Error) -> StackrunError {
    error!(dir = ?working_dir, error = %err, "failed to launch deployment process");
    StackrunError::LaunchError(format!("{err:#}"))
}

/// Wait for both readers, then for the process; report failure; clean up;
/// close the stream (by dropping the last sender).
async fn supervise(
    handles: ClassifierHandles,
    exit: ExitFuture,
    tx: EventSender,
    cleanup: ScratchCleanup,
) {
    let last = handles.drained().await;

    let failure = match exit.await {
        Ok(outcome) if outcome.success() => None,
        Ok(outcome) => Some(RunError::Exited { code: outcome.code }),
        Err(e) => Some(RunError::Wait(e.to_string())),
    };

    match failure {
        None => info!(execution = %last.execution_name, "deployment process succeeded"),
        Some(err) => {
            warn!(execution = %last.execution_name, error = %err, "deployment process failed");
            let mut terminal = last;
            terminal.err = Some(err);
            if tx.send(terminal).await.is_err() {
                debug!("event receiver dropped before the terminal event");
            }
        }
    }

    drop(cleanup);
    drop(tx);
}
