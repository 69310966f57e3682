// tests/command_launcher.rs
//
// Real child processes through `sh -c`.

#![cfg(unix)]

mod common;

use std::error::Error;
use std::sync::Arc;

use stackrun::event::RunError;
use stackrun::exec::{CommandLauncher, ProcessRunner, RunRequest};
use stackrun::fs::{RealDirectoryRemover, make_scratch_dir};
use stackrun::report::wait_for_stream;
use tempfile::TempDir;

use crate::common::{collect, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn shell_runner() -> ProcessRunner {
    ProcessRunner::new(
        Arc::new(CommandLauncher::new("sh", vec!["-c".to_string()])),
        Arc::new(RealDirectoryRemover),
    )
    .with_answers(None)
}

fn script(cmd: &str) -> Vec<String> {
    vec![cmd.to_string()]
}

#[tokio::test]
async fn stderr_progress_from_a_real_process() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let cmd = "echo 'chatter'; \
               echo 'Stack | 1/2 | CREATE_IN_PROGRESS' >&2; \
               echo 'Stack | 2/2 | CREATE_COMPLETE' >&2";

    let stream = shell_runner().run(RunRequest::new(dir.path(), script(cmd)))?;
    let events = with_timeout(collect(stream)).await;

    assert_eq!(events.len(), 2);
    let last = &events[1];
    assert_eq!(last.current_step, 2);
    assert_eq!(last.total_steps, 2);
    assert_eq!(last.step_description, "CREATE_COMPLETE");
    assert!(last.err.is_none());
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_code_is_reported() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;

    let req = RunRequest::new(dir.path(), script("echo boom >&2; exit 4"));
    let stream = shell_runner().run(req)?;
    let err = with_timeout(wait_for_stream(stream)).await.unwrap_err();

    assert_eq!(err, RunError::Exited { code: Some(4) });
    Ok(())
}

#[tokio::test]
async fn scratch_dir_is_gone_after_the_run() -> TestResult {
    init_tracing();
    let app = TempDir::new()?;
    let scratch = make_scratch_dir(app.path(), "cdk-output")?;
    assert!(scratch.is_dir());

    let req = RunRequest::new(app.path(), script("ls >&2")).with_scratch_dir(&scratch);
    let events = with_timeout(collect(shell_runner().run(req)?)).await;

    assert!(
        events
            .iter()
            .flat_map(|e| e.outputs.iter())
            .any(|line| line.starts_with("cdk-output"))
    );
    assert!(!scratch.exists());
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_launch_error() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let runner = ProcessRunner::new(
        Arc::new(CommandLauncher::new("stackrun-no-such-program", Vec::new())),
        Arc::new(RealDirectoryRemover),
    )
    .with_answers(None);

    let err = runner
        .run(RunRequest::new(dir.path(), script("deploy")))
        .unwrap_err();
    assert!(err.to_string().contains("stackrun-no-such-program"));
    Ok(())
}
