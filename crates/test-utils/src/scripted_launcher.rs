#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use stackrun::exec::{ExitOutcome, LaunchedProcess, ProcessLauncher};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

const PIPE_CAPACITY: usize = 64;

/// How a scripted child ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedExit {
    Code(i32),
    Signal,
    WaitError(String),
}

/// A single recorded call to [`ProcessLauncher::launch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCall {
    pub working_dir: PathBuf,
    pub argv: Vec<String>,
}

/// A fake launcher that:
/// - records every launch (working dir + argv)
/// - plays scripted stdout/stderr through in-memory pipes
/// - captures whatever is written to the child's stdin
/// - exits with the scripted outcome once both pipes are written out.
#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    stdout: String,
    stderr_lines: Vec<String>,
    line_delay: Duration,
    exit: ScriptedExit,
    fail_launch: bool,
    calls: Arc<Mutex<Vec<LaunchCall>>>,
    stdin: Arc<Mutex<Vec<u8>>>,
    stdin_closed: Arc<AtomicBool>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self {
            stdout: String::new(),
            stderr_lines: Vec::new(),
            line_delay: Duration::ZERO,
            exit: ScriptedExit::Code(0),
            fail_launch: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            stdin: Arc::new(Mutex::new(Vec::new())),
            stdin_closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raw bytes written to stdout; no newline is added.
    pub fn with_stdout(mut self, text: &str) -> Self {
        self.stdout = text.to_string();
        self
    }

    /// Lines written to stderr, each followed by `\n`.
    pub fn with_stderr_lines(mut self, lines: &[&str]) -> Self {
        self.stderr_lines = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = delay;
        self
    }

    pub fn with_exit(mut self, exit: ScriptedExit) -> Self {
        self.exit = exit;
        self
    }

    pub fn exiting_with(self, code: i32) -> Self {
        self.with_exit(ScriptedExit::Code(code))
    }

    pub fn failing_to_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn calls(&self) -> Vec<LaunchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stdin_received(&self) -> Vec<u8> {
        self.stdin.lock().unwrap().clone()
    }

    /// Resolves once the child's stdin has been closed by the parent.
    pub async fn wait_for_stdin_closed(&self) {
        while !self.stdin_closed.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl Default for ScriptedLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for ScriptedLauncher {
    fn launch(&self, working_dir: &Path, argv: &[String]) -> Result<LaunchedProcess> {
        self.calls.lock().unwrap().push(LaunchCall {
            working_dir: working_dir.to_path_buf(),
            argv: argv.to_vec(),
        });

        if self.fail_launch {
            return Err(anyhow!("scripted launch failure in {:?}", working_dir));
        }

        let (stdout_child, stdout_parent) = tokio::io::duplex(PIPE_CAPACITY);
        let (stderr_child, stderr_parent) = tokio::io::duplex(PIPE_CAPACITY);
        let (stdin_parent, stdin_child) = tokio::io::duplex(PIPE_CAPACITY);

        let stdout_text = self.stdout.clone().into_bytes();
        let stdout_task = tokio::spawn(write_all_then_close(
            stdout_child,
            vec![stdout_text],
            Duration::ZERO,
        ));

        let stderr_chunks = self
            .stderr_lines
            .iter()
            .map(|l| format!("{l}\n").into_bytes())
            .collect();
        let stderr_task =
            tokio::spawn(write_all_then_close(stderr_child, stderr_chunks, self.line_delay));

        self.stdin_closed.store(false, Ordering::SeqCst);
        tokio::spawn(capture_stdin(
            stdin_child,
            Arc::clone(&self.stdin),
            Arc::clone(&self.stdin_closed),
        ));

        let exit = self.exit.clone();
        let exit_future = Box::pin(async move {
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            match exit {
                ScriptedExit::Code(code) => Ok(ExitOutcome::from_code(code)),
                ScriptedExit::Signal => Ok(ExitOutcome { code: None }),
                ScriptedExit::WaitError(msg) => Err(std::io::Error::other(msg)),
            }
        });

        Ok(LaunchedProcess {
            stdin: Box::new(stdin_parent),
            stdout: Box::new(stdout_parent),
            stderr: Box::new(stderr_parent),
            exit: exit_future,
        })
    }
}

async fn write_all_then_close(mut pipe: DuplexStream, chunks: Vec<Vec<u8>>, delay: Duration) {
    for chunk in chunks {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if pipe.write_all(&chunk).await.is_err() {
            return;
        }
    }
    let _ = pipe.shutdown().await;
}

async fn capture_stdin(
    mut pipe: DuplexStream,
    sink: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 256];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink.lock().unwrap().extend_from_slice(&buf[..n]),
        }
    }
    closed.store(true, Ordering::SeqCst);
}

/// Prompt sink that remembers everything it was asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingEcho {
    prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingEcho {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl stackrun::exec::PromptEcho for RecordingEcho {
    fn echo(&self, prompt: &str) {
        self.prompts.lock().unwrap().push(prompt.to_string());
    }
}
