#![allow(dead_code)]

use std::sync::Arc;

use stackrun::event::{EventStream, ProgressEvent};
use stackrun::exec::ProcessRunner;
use stackrun::fs::mock::RecordingRemover;
use stackrun_test_utils::scripted_launcher::{RecordingEcho, ScriptedLauncher};

pub use stackrun_test_utils::{init_tracing, with_timeout};

/// Runner wired to scripted collaborators; stdin forwarding is off.
pub fn scripted_runner(
    launcher: &ScriptedLauncher,
    remover: &RecordingRemover,
    echo: &RecordingEcho,
) -> ProcessRunner {
    ProcessRunner::new(Arc::new(launcher.clone()), Arc::new(remover.clone()))
        .with_prompt_echo(Arc::new(echo.clone()))
        .with_answers(None)
}

/// Read every event until the stream closes.
pub async fn collect(mut stream: EventStream) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.recv().await {
        events.push(event);
    }
    events
}
