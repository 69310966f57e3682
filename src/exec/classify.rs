// src/exec/classify.rs

//! Turns a child's stdout/stderr into progress events.
//!
//! - stdout carries chatter and interactive prompts. Lines are logged at
//!   debug; prompts are echoed to the operator and, when a [`PromptReply`] is
//!   attached, answered with one line read for this run alone.
//! - Both pipes are decoded lossily: a byte that is not UTF-8 never stops a
//!   reader.
//! - stderr carries progress. Every line is folded into the run's
//!   [`ProgressEvent`] and a copy is sent on the event stream. The send waits
//!   for capacity, so a slow consumer throttles the reader and, through the
//!   OS pipe, the child.

use std::io::Write;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::event::{EventSender, ProgressEvent};

use super::input::{PromptReply, decode_line};

/// `... | <current>/<total> | <description>` as printed by the deployment
/// tool. The marker starts at the beginning of the line or right after a `|`.
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\|)\s*([0-9]+)/([0-9]+)\s*\|(.*)$").expect("progress regex is valid")
});

/// Sink for interactive prompts found on stdout.
pub trait PromptEcho: Send + Sync {
    fn echo(&self, prompt: &str);
}

/// Writes prompts to the host's stdout, padded with blank lines so an active
/// progress spinner does not overwrite them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutEcho;

impl PromptEcho for StdoutEcho {
    fn echo(&self, prompt: &str) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\n{prompt}\n\n");
        let _ = out.flush();
    }
}

/// Fold one stderr line into `event`.
///
/// The line is always appended to `outputs`. Step counters and description
/// change only when the line carries a progress marker; a counter that does
/// not fit in a `u64` is left as it was.
pub fn apply_line(event: &mut ProgressEvent, line: &str) {
    event.outputs.push(line.to_string());
    event.last_output = line.to_string();

    let Some(caps) = PROGRESS_RE.captures(line) else {
        return;
    };

    match caps[1].parse::<u64>() {
        Ok(current) => event.current_step = current,
        Err(e) => debug!(value = &caps[1], error = %e, "unable to parse current step"),
    }
    match caps[2].parse::<u64>() {
        Ok(total) => event.total_steps = total,
        Err(e) => debug!(value = &caps[2], error = %e, "unable to parse total steps"),
    }
    // Only the single separator space after the `|` is dropped.
    let description = &caps[3];
    event.step_description = description
        .strip_prefix(' ')
        .unwrap_or(description)
        .to_string();
}

/// Join handles of the two reader tasks of one run.
#[derive(Debug)]
pub struct ClassifierHandles {
    execution_name: String,
    stdout: JoinHandle<()>,
    stderr: JoinHandle<ProgressEvent>,
}

impl ClassifierHandles {
    /// Wait until both readers have drained their pipes.
    ///
    /// Returns the final accumulated event.
    pub async fn drained(self) -> ProgressEvent {
        if let Err(e) = self.stdout.await {
            error!(execution = %self.execution_name, error = %e, "stdout reader task failed");
        }
        match self.stderr.await {
            Ok(event) => event,
            Err(e) => {
                error!(execution = %self.execution_name, error = %e, "stderr reader task failed");
                ProgressEvent::new(self.execution_name)
            }
        }
    }
}

/// Per-run output classifier.
pub struct OutputClassifier {
    execution_name: String,
    prompt_prefix: String,
    echo: Arc<dyn PromptEcho>,
    reply: Option<PromptReply>,
}

impl OutputClassifier {
    pub fn new(
        execution_name: impl Into<String>,
        prompt_prefix: impl Into<String>,
        echo: Arc<dyn PromptEcho>,
    ) -> Self {
        Self {
            execution_name: execution_name.into(),
            prompt_prefix: prompt_prefix.into(),
            echo,
            reply: None,
        }
    }

    /// Answer the first prompt through `reply`. Without one, prompts are
    /// only echoed.
    pub fn with_reply(mut self, reply: Option<PromptReply>) -> Self {
        self.reply = reply;
        self
    }

    /// Spawn one reader task per pipe. Events go to `tx`.
    pub fn spawn<O, E>(self, stdout: O, stderr: E, tx: EventSender) -> ClassifierHandles
    where
        O: AsyncRead + Send + Unpin + 'static,
        E: AsyncRead + Send + Unpin + 'static,
    {
        let execution_name = self.execution_name.clone();
        let stdout_handle = tokio::spawn(classify_stdout(
            stdout,
            self.execution_name.clone(),
            self.prompt_prefix,
            self.echo,
            self.reply,
        ));
        let stderr_handle = tokio::spawn(classify_stderr(stderr, self.execution_name, tx));

        ClassifierHandles {
            execution_name,
            stdout: stdout_handle,
            stderr: stderr_handle,
        }
    }
}

async fn classify_stdout<R>(
    mut reader: R,
    execution_name: String,
    prompt_prefix: String,
    echo: Arc<dyn PromptEcho>,
    mut reply: Option<PromptReply>,
) where
    R: AsyncRead + Unpin,
{
    // Prompts are partial lines (no trailing newline), so `lines()` would
    // hold them back until the operator had already answered. Split by hand.
    let mut chunk = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!(execution = %execution_name, error = %e, "error while reading stdout");
                break;
            }
        };
        pending.extend_from_slice(&chunk[..n]);

        while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = pending.drain(..=pos).collect();
            let line = decode_line(&raw);
            debug!(execution = %execution_name, "stdout: {}", line);
            if line.starts_with(&prompt_prefix) {
                echo.echo(&line);
            }
        }

        let partial = String::from_utf8_lossy(&pending).into_owned();
        if partial.starts_with(&prompt_prefix) && partial.ends_with(": ") {
            debug!(execution = %execution_name, "stdout prompt: {}", partial);
            echo.echo(&partial);
            pending.clear();
            if let Some(reply) = reply.take() {
                reply.answer(&execution_name).await;
            }
        }
    }

    if !pending.is_empty() {
        debug!(
            execution = %execution_name,
            "stdout: {}",
            String::from_utf8_lossy(&pending)
        );
    }
}

async fn classify_stderr<R>(reader: R, execution_name: String, tx: EventSender) -> ProgressEvent
where
    R: AsyncRead + Unpin,
{
    let mut current = ProgressEvent::new(execution_name);
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();
    let mut receiver_gone = false;

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                apply_line(&mut current, &decode_line(&raw));
                if receiver_gone {
                    continue;
                }
                if tx.send(current.clone()).await.is_err() {
                    // Keep draining so the child never blocks on a full pipe.
                    warn!(
                        execution = %current.execution_name,
                        "event receiver dropped; continuing to drain stderr"
                    );
                    receiver_gone = true;
                }
            }
            Err(e) => {
                error!(
                    execution = %current.execution_name,
                    error = %e,
                    "error while reading stderr"
                );
                break;
            }
        }
    }

    current
}
