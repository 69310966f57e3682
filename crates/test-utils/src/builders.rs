#![allow(dead_code)]

use stackrun::event::{EventStream, LabeledStream, ProgressEvent, RunError};
use tokio::sync::mpsc;

/// Builder for `ProgressEvent` to simplify test setup.
pub struct ProgressEventBuilder {
    event: ProgressEvent,
}

impl ProgressEventBuilder {
    pub fn new(execution_name: &str) -> Self {
        Self {
            event: ProgressEvent::new(execution_name),
        }
    }

    pub fn steps(mut self, current: u64, total: u64) -> Self {
        self.event.current_step = current;
        self.event.total_steps = total;
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.event.step_description = text.to_string();
        self
    }

    /// Append an output line; it also becomes `last_output`.
    pub fn output(mut self, line: &str) -> Self {
        self.event.outputs.push(line.to_string());
        self.event.last_output = line.to_string();
        self
    }

    pub fn failed(mut self, err: RunError) -> Self {
        self.event.err = Some(err);
        self
    }

    pub fn exit_code(self, code: i32) -> Self {
        self.failed(RunError::Exited { code: Some(code) })
    }

    pub fn build(self) -> ProgressEvent {
        self.event
    }
}

/// A stream that yields `events` in order and then closes.
pub fn stream_of(events: Vec<ProgressEvent>) -> EventStream {
    let (tx, rx) = mpsc::channel(events.len().max(1));
    for event in events {
        tx.try_send(event)
            .expect("channel sized to hold every scripted event");
    }
    rx
}

pub fn labeled(context: &str, events: Vec<ProgressEvent>) -> LabeledStream {
    LabeledStream::new(context, stream_of(events))
}
