// src/exec/launcher.rs

//! Pluggable process launcher.
//!
//! [`ProcessRunner`](super::ProcessRunner) never calls `tokio::process`
//! directly; it asks a [`ProcessLauncher`] for a started child with its three
//! standard streams attached. Production code uses [`CommandLauncher`]; tests
//! can provide an implementation backed by in-memory pipes.

use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Command;
use tracing::debug;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
pub type ExitFuture = Pin<Box<dyn Future<Output = std::io::Result<ExitOutcome>> + Send>>;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// A started child process with all three standard streams piped.
pub struct LaunchedProcess {
    pub stdin: BoxedWriter,
    pub stdout: BoxedReader,
    pub stderr: BoxedReader,
    /// Resolves once the child has exited.
    pub exit: ExitFuture,
}

impl Debug for LaunchedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedProcess").finish_non_exhaustive()
    }
}

/// Trait abstracting how a deployment process is started.
pub trait ProcessLauncher: Send + Sync + Debug {
    /// Start `argv` in `working_dir`.
    ///
    /// An error means nothing is running: either the process could not be
    /// started or one of its pipes could not be attached.
    fn launch(&self, working_dir: &Path, argv: &[String]) -> Result<LaunchedProcess>;
}

/// Launches `<program> <prefix...> <argv...>` with `tokio::process`.
///
/// The default shape is `npm run cdk -- <argv...>`: the deployment tool is
/// reached through a package-manager script alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLauncher {
    program: String,
    prefix: Vec<String>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>, prefix: Vec<String>) -> Self {
        Self {
            program: program.into(),
            prefix,
        }
    }

    /// `<program> run <tool_alias> -- ...`
    pub fn for_tool(program: impl Into<String>, tool_alias: impl Into<String>) -> Self {
        Self::new(
            program,
            vec!["run".to_string(), tool_alias.into(), "--".to_string()],
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to `program` for the caller-supplied `argv`.
    pub fn full_args(&self, argv: &[String]) -> Vec<String> {
        self.prefix.iter().chain(argv.iter()).cloned().collect()
    }
}

impl Default for CommandLauncher {
    fn default() -> Self {
        Self::for_tool("npm", "cdk")
    }
}

impl ProcessLauncher for CommandLauncher {
    fn launch(&self, working_dir: &Path, argv: &[String]) -> Result<LaunchedProcess> {
        let args = self.full_args(argv);
        debug!(program = %self.program, ?args, dir = ?working_dir, "launching process");

        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| {
                format!("couldn't execute '{}' in {:?}", self.program, working_dir)
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("child stdin pipe unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("child stdout pipe unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("child stderr pipe unavailable"))?;

        Ok(LaunchedProcess {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            exit: Box::pin(async move { child.wait().await.map(ExitOutcome::from) }),
        })
    }
}
