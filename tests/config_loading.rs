// tests/config_loading.rs

use std::io::Write;
use std::time::Duration;

use stackrun::config::{load_and_validate, load_or_default};
use stackrun::errors::StackrunError;
use stackrun::exec::ProcessRunner;
use stackrun::report::RenderOptions;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn full_file_overrides_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[runner]
program = "pnpm"
tool_alias = "cdk2"
prompt_prefix = "Enter MFA code for"
event_buffer = 4
forward_stdin = false

[progress]
poll_interval_ms = 250
show_bar = false

[cdk]
profile = "prod"
qualifier = "xyz"
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.runner.program, "pnpm");
    assert_eq!(cfg.runner.tool_alias, "cdk2");
    assert_eq!(cfg.runner.prompt_prefix, "Enter MFA code for");
    assert_eq!(cfg.runner.event_buffer, 4);
    assert!(!cfg.runner.forward_stdin);
    assert!(!cfg.progress.show_bar);
    assert_eq!(cfg.cdk.profile, "prod");
    assert_eq!(cfg.cdk.qualifier, "xyz");
    assert_eq!(cfg.cdk.toolkit_stack_name, "Agc-CDKToolkit");

    assert_eq!(
        RenderOptions::from_config(&cfg.progress).poll_interval,
        Duration::from_millis(250)
    );
    let runner = format!("{:?}", ProcessRunner::from_config(&cfg.runner));
    assert!(runner.contains("forward_stdin: false"));
}

#[test]
fn missing_default_file_means_defaults() {
    let dir = TempDir::new().unwrap();
    let cfg = load_or_default(dir.path().join("Stackrun.toml"), false).unwrap();

    assert_eq!(cfg.runner.program, "npm");
    assert_eq!(cfg.runner.tool_alias, "cdk");
    assert_eq!(cfg.progress.poll_interval_ms, 100);
    assert!(cfg.progress.show_bar);
    assert_eq!(cfg.cdk.output_dir_prefix, "cdk-output");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = load_or_default(dir.path().join("Stackrun.toml"), true);
    assert!(matches!(result, Err(StackrunError::IoError(_))));
}

#[test]
fn invalid_values_return_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[progress]
poll_interval_ms = 0
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(StackrunError::ConfigError(msg)) => assert!(msg.contains("poll_interval_ms")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn malformed_toml_returns_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[runner\nprogram = ").unwrap();

    assert!(matches!(
        load_and_validate(file.path()),
        Err(StackrunError::TomlError(_))
    ));
}
