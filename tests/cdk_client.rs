// tests/cdk_client.rs

mod common;

use std::error::Error;

use stackrun::cdk::CdkClient;
use stackrun::config::CdkSection;
use stackrun::errors::StackrunError;
use stackrun::event::RunError;
use stackrun::fs::mock::RecordingRemover;
use stackrun_test_utils::scripted_launcher::{RecordingEcho, ScriptedLauncher};
use tempfile::TempDir;

use crate::common::{collect, init_tracing, scripted_runner, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn settings() -> CdkSection {
    CdkSection {
        profile: "dev".to_string(),
        ..CdkSection::default()
    }
}

fn context() -> Vec<String> {
    vec!["ctx=genomics".to_string()]
}

#[tokio::test]
async fn deploy_writes_into_a_scratch_dir_that_is_cleaned_up() -> TestResult {
    init_tracing();
    let app = TempDir::new()?;
    let launcher = ScriptedLauncher::new().with_stderr_lines(&["Stack | 1/1 | CREATE_COMPLETE"]);
    let remover = RecordingRemover::new();
    let client = CdkClient::new(
        scripted_runner(&launcher, &remover, &RecordingEcho::default()),
        settings(),
    );

    let stream = client.deploy_app(app.path(), &context(), "genomics")?;
    let events = with_timeout(collect(stream)).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].execution_name, "genomics");

    let calls = launcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].working_dir, app.path());

    let argv = &calls[0].argv;
    assert_eq!(&argv[..4], &["deploy", "--all", "--profile", "dev"]);
    let output_at = argv
        .iter()
        .position(|a| a == "--output")
        .ok_or("missing --output")?;
    let scratch = std::path::PathBuf::from(&argv[output_at + 1]);
    assert!(scratch.starts_with(app.path()));
    assert!(
        scratch
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("cdk-output"))
    );
    assert_eq!(&argv[argv.len() - 2..], &["-c", "ctx=genomics"]);

    assert_eq!(remover.calls(), vec![scratch]);
    Ok(())
}

#[tokio::test]
async fn deploy_launch_failure_still_cleans_up() -> TestResult {
    init_tracing();
    let app = TempDir::new()?;
    let launcher = ScriptedLauncher::new().failing_to_launch();
    let remover = RecordingRemover::new();
    let client = CdkClient::new(
        scripted_runner(&launcher, &remover, &RecordingEcho::default()),
        settings(),
    );

    let result = client.deploy_app(app.path(), &context(), "genomics");

    assert!(matches!(result, Err(StackrunError::LaunchError(_))));
    let removed = remover.calls();
    assert_eq!(removed.len(), 1);
    assert!(removed[0].starts_with(app.path()));
    Ok(())
}

#[tokio::test]
async fn destroy_and_bootstrap_pass_their_arguments() -> TestResult {
    init_tracing();
    let app = TempDir::new()?;
    let launcher = ScriptedLauncher::new();
    let remover = RecordingRemover::new();
    let client = CdkClient::new(
        scripted_runner(&launcher, &remover, &RecordingEcho::default()),
        settings(),
    );

    with_timeout(collect(client.destroy_app(app.path(), &context(), "genomics")?)).await;
    let version = vec!["AGC_VERSION=1.4.0".to_string()];
    with_timeout(collect(client.bootstrap(app.path(), &version, "bootstrap")?)).await;

    let calls = launcher.calls();
    assert_eq!(
        calls[0].argv,
        vec!["destroy", "--all", "--force", "--profile", "dev", "-c", "ctx=genomics"]
    );
    assert_eq!(
        calls[1].argv,
        vec![
            "bootstrap",
            "--toolkit-stack-name",
            "Agc-CDKToolkit",
            "--qualifier",
            "agc",
            "--tags",
            "application-name=agc",
            "--profile",
            "dev",
            "--tags",
            "agc-version=1.4.0",
            "-c",
            "AGC_VERSION=1.4.0",
        ]
    );
    assert!(remover.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn clear_context_waits_and_reports_failure() -> TestResult {
    init_tracing();
    let app = TempDir::new()?;

    let ok = ScriptedLauncher::new().with_stderr_lines(&["Context cleared."]);
    let client = CdkClient::new(
        scripted_runner(&ok, &RecordingRemover::new(), &RecordingEcho::default()),
        settings(),
    );
    with_timeout(client.clear_context(app.path())).await?;
    assert_eq!(ok.calls()[0].argv, vec!["context", "--clear"]);

    let failing = ScriptedLauncher::new()
        .with_stderr_lines(&["cannot clear"])
        .exiting_with(1);
    let client = CdkClient::new(
        scripted_runner(&failing, &RecordingRemover::new(), &RecordingEcho::default()),
        settings(),
    );
    let err = with_timeout(client.clear_context(app.path()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StackrunError::RunFailed(RunError::Exited { code: Some(1) })
    ));
    Ok(())
}
