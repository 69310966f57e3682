// src/cdk/mod.rs

//! Command lines of the deployment tool.
//!
//! [`CdkClient`] knows which arguments each tool operation needs and hands
//! them to a [`ProcessRunner`]; everything about running and reporting lives
//! in [`crate::exec`] and [`crate::report`].

pub mod outputs;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::config::CdkSection;
use crate::errors::{Result, StackrunError};
use crate::event::EventStream;
use crate::exec::{ProcessRunner, RunRequest};
use crate::fs::make_scratch_dir;
use crate::report::wait_for_stream;

pub use outputs::parse_outputs;

const VERSION_CONTEXT_KEY: &str = "AGC_VERSION=";
const CUSTOM_TAGS_CONTEXT_KEY: &str = "CUSTOM_TAGS=";

/// Turn `KEY=VALUE` context entries into `-c KEY=VALUE` pairs.
pub fn append_context_arguments(mut args: Vec<String>, context: &[String]) -> Vec<String> {
    for entry in context {
        args.push("-c".to_string());
        args.push(entry.clone());
    }
    args
}

#[derive(Debug)]
pub struct CdkClient {
    runner: ProcessRunner,
    settings: CdkSection,
}

impl CdkClient {
    pub fn new(runner: ProcessRunner, settings: CdkSection) -> Self {
        Self { runner, settings }
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    pub fn settings(&self) -> &CdkSection {
        &self.settings
    }

    pub fn bootstrap_args(&self, context: &[String]) -> Result<Vec<String>> {
        let s = &self.settings;
        let mut args = vec![
            "bootstrap".to_string(),
            "--toolkit-stack-name".to_string(),
            s.toolkit_stack_name.clone(),
            "--qualifier".to_string(),
            s.qualifier.clone(),
            "--tags".to_string(),
            format!("{}={}", s.app_tag_key, s.app_tag_value),
            "--profile".to_string(),
            s.profile.clone(),
        ];

        for entry in context {
            if let Some(version) = entry.strip_prefix(VERSION_CONTEXT_KEY) {
                args.push("--tags".to_string());
                args.push(format!("{}={}", s.version_tag_key, version));
            }
            if let Some(json) = entry.strip_prefix(CUSTOM_TAGS_CONTEXT_KEY) {
                let tags: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
                for (key, value) in tags {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    args.push("--tags".to_string());
                    args.push(format!("{key}={value}"));
                }
            }
        }

        Ok(append_context_arguments(args, context))
    }

    pub fn deploy_args(&self, output_dir: &Path, context: &[String]) -> Vec<String> {
        let s = &self.settings;
        let args = vec![
            "deploy".to_string(),
            "--all".to_string(),
            "--profile".to_string(),
            s.profile.clone(),
            "--require-approval".to_string(),
            "never".to_string(),
            "--toolkit-stack-name".to_string(),
            s.toolkit_stack_name.clone(),
            "--output".to_string(),
            output_dir.to_string_lossy().into_owned(),
        ];
        append_context_arguments(args, context)
    }

    pub fn destroy_args(&self, context: &[String]) -> Vec<String> {
        let args = vec![
            "destroy".to_string(),
            "--all".to_string(),
            "--force".to_string(),
            "--profile".to_string(),
            self.settings.profile.clone(),
        ];
        append_context_arguments(args, context)
    }

    pub fn bootstrap(
        &self,
        app_dir: &Path,
        context: &[String],
        execution_name: &str,
    ) -> Result<EventStream> {
        let args = self.bootstrap_args(context)?;
        self.runner
            .run(RunRequest::new(app_dir, args).with_execution_name(execution_name))
    }

    /// Deploy every stack of the app. The tool's output directory is a fresh
    /// scratch directory inside `app_dir`, removed when the run ends.
    pub fn deploy_app(
        &self,
        app_dir: &Path,
        context: &[String],
        execution_name: &str,
    ) -> Result<EventStream> {
        let scratch = make_scratch_dir(app_dir, &self.settings.output_dir_prefix)?;
        debug!(dir = ?scratch, "created deploy output directory");
        let args = self.deploy_args(&scratch, context);
        self.runner.run(
            RunRequest::new(app_dir, args)
                .with_scratch_dir(scratch)
                .with_execution_name(execution_name),
        )
    }

    pub fn destroy_app(
        &self,
        app_dir: &Path,
        context: &[String],
        execution_name: &str,
    ) -> Result<EventStream> {
        let args = self.destroy_args(context);
        self.runner
            .run(RunRequest::new(app_dir, args).with_execution_name(execution_name))
    }

    /// Clear the tool's cached context for the app and wait for it to finish.
    pub async fn clear_context(&self, app_dir: &Path) -> Result<()> {
        debug!(dir = ?app_dir, "clearing tool context");
        let args = vec!["context".to_string(), "--clear".to_string()];
        let stream = self.runner.run(RunRequest::new(app_dir, args))?;
        wait_for_stream(stream).await.map_err(StackrunError::from)
    }
}
