// src/event.rs

//! Data model shared by the runner, the classifier and the reporters.
//!
//! A run produces one [`EventStream`]. Every message on it is a full copy of
//! the run's accumulated [`ProgressEvent`], so a receiver never needs to
//! merge deltas. The stream closing is the "run finished" signal:
//!
//! - closed without any event carrying `err` => the run succeeded;
//! - the last event carries `err` => the run failed (the terminal event).

use thiserror::Error;
use tokio::sync::mpsc;

/// Receiving half of one run's progress events.
pub type EventStream = mpsc::Receiver<ProgressEvent>;

/// Sending half used by the producer side of a run.
pub type EventSender = mpsc::Sender<ProgressEvent>;

/// Why a started run failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The child exited unsuccessfully. `code` is `None` when it was killed
    /// by a signal.
    #[error("{}", exited_message(.code))]
    Exited { code: Option<i32> },

    /// Waiting on the child failed.
    #[error("waiting for process failed: {0}")]
    Wait(String),

    /// The task draining the run's stream died before the stream closed.
    #[error("collecting run output failed: {0}")]
    Collect(String),
}

fn exited_message(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("process exited with status {code}"),
        None => "process terminated by signal".to_string(),
    }
}

/// Cumulative state of one deployment unit's run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Correlates the event with the unit that produced it.
    pub execution_name: String,
    /// 0 means "not yet observed".
    pub current_step: u64,
    /// 0 means "not yet observed".
    pub total_steps: u64,
    pub step_description: String,
    /// Every stderr line seen so far, in arrival order. Only ever grows.
    pub outputs: Vec<String>,
    pub last_output: String,
    /// Set only on the terminal event of a failed run.
    pub err: Option<RunError>,
}

impl ProgressEvent {
    pub fn new(execution_name: impl Into<String>) -> Self {
        Self {
            execution_name: execution_name.into(),
            ..Default::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.err.is_some()
    }
}

/// Resting-state summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub execution_name: String,
    /// Caller-supplied label of the unit (e.g. the context name).
    pub context: String,
    pub outputs: Vec<String>,
    pub err: Option<RunError>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.err.is_none()
    }
}

/// An [`EventStream`] tagged with the label its [`RunResult`] should carry.
#[derive(Debug)]
pub struct LabeledStream {
    pub context: String,
    pub stream: EventStream,
}

impl LabeledStream {
    pub fn new(context: impl Into<String>, stream: EventStream) -> Self {
        Self {
            context: context.into(),
            stream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_only_carries_the_name() {
        let ev = ProgressEvent::new("ctx-a");
        assert_eq!(ev.execution_name, "ctx-a");
        assert_eq!(ev.current_step, 0);
        assert_eq!(ev.total_steps, 0);
        assert!(ev.outputs.is_empty());
        assert!(!ev.is_terminal());
    }

    #[test]
    fn exited_error_mentions_code_or_signal() {
        assert_eq!(
            RunError::Exited { code: Some(2) }.to_string(),
            "process exited with status 2"
        );
        assert_eq!(
            RunError::Exited { code: None }.to_string(),
            "process terminated by signal"
        );
    }
}
