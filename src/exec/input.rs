// src/exec/input.rs

//! Answers to interactive prompts.
//!
//! The deployment tool occasionally asks the operator for input (MFA codes).
//! The classifier surfaces the prompt; the answer comes from an
//! [`AnswerSource`]. The source is only read when a prompt was actually seen,
//! so a run without prompts never touches the host's stdin.
//!
//! Clones share one reader and one lock: with several concurrent runs, each
//! prompt takes exactly one line, and that line goes to the child that asked.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::launcher::{BoxedReader, BoxedWriter};

type OpenFn = dyn Fn() -> BoxedReader + Send + Sync;

/// Shared, lazily opened line source for prompt answers.
#[derive(Clone)]
pub struct AnswerSource {
    open: Arc<OpenFn>,
    reader: Arc<Mutex<Option<BufReader<BoxedReader>>>>,
}

impl fmt::Debug for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerSource").finish_non_exhaustive()
    }
}

impl AnswerSource {
    /// `open` is called at most once, when the first answer is needed.
    pub fn new<F>(open: F) -> Self
    where
        F: Fn() -> BoxedReader + Send + Sync + 'static,
    {
        Self {
            open: Arc::new(open),
            reader: Arc::new(Mutex::new(None)),
        }
    }

    /// Answers typed by the operator on the host's stdin.
    pub fn host_stdin() -> Self {
        Self::new(|| -> BoxedReader { Box::new(tokio::io::stdin()) })
    }

    /// Whether the underlying reader has been opened yet.
    pub async fn is_open(&self) -> bool {
        self.reader.lock().await.is_some()
    }

    /// Next line without its line ending; `None` at end of input.
    pub async fn next_answer(&self) -> io::Result<Option<String>> {
        let mut guard = self.reader.lock().await;
        let reader = guard.get_or_insert_with(|| BufReader::new((self.open)()));

        let mut raw = Vec::new();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            return Ok(None);
        }
        Ok(Some(decode_line(&raw)))
    }
}

/// Lossy UTF-8 decoding of one line, without the trailing `\n` / `\r\n`.
pub(crate) fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// The child's stdin together with where its single answer comes from.
pub struct PromptReply {
    stdin: BoxedWriter,
    answers: AnswerSource,
}

impl fmt::Debug for PromptReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptReply").finish_non_exhaustive()
    }
}

impl PromptReply {
    pub fn new(stdin: BoxedWriter, answers: AnswerSource) -> Self {
        Self { stdin, answers }
    }

    /// Read one answer, write it to the child and close the child's stdin.
    ///
    /// The tool asks at most once per run; leaving stdin open would keep it
    /// waiting for more input after its work is done.
    pub async fn answer(mut self, execution_name: &str) {
        match self.answers.next_answer().await {
            Ok(Some(answer)) => {
                let line = format!("{answer}\n");
                match self.stdin.write_all(line.as_bytes()).await {
                    Ok(()) => debug!(execution = %execution_name, "sent prompt answer"),
                    Err(e) => error!(
                        execution = %execution_name,
                        error = %e,
                        "error while forwarding prompt answer"
                    ),
                }
            }
            Ok(None) => debug!(execution = %execution_name, "no answer available; input closed"),
            Err(e) => error!(execution = %execution_name, error = %e, "error while reading answer"),
        }
        if let Err(e) = self.stdin.shutdown().await {
            error!(execution = %execution_name, error = %e, "error while closing child stdin");
        }
    }
}
