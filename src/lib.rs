// src/lib.rs

pub mod cdk;
pub mod cli;
pub mod config;
pub mod errors;
pub mod event;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod report;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::{debug, error, info};

use crate::cdk::{CdkClient, parse_outputs};
use crate::cli::{AppArgs, CliArgs, Command};
use crate::config::{ConfigFile, default_config_path, load_or_default};
use crate::event::{EventStream, LabeledStream, RunResult};
use crate::exec::{ProcessRunner, RunRequest};
use crate::report::{
    RenderOptions, display_progress, display_progress_bar, show_execution, wait_for_stream,
};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the process runner and tool client
/// - the progress reporting chosen by `--verbose` / `[progress].show_bar`
pub async fn run(args: CliArgs) -> Result<()> {
    let explicit = args.config.is_some();
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_or_default(&config_path, explicit)?;
    debug!(path = ?config_path, ?cfg, "configuration loaded");

    let session = Session::new(&cfg, args.verbose);

    match args.command {
        Command::Exec {
            dir,
            scratch,
            name,
            args,
        } => {
            let mut req = RunRequest::new(dir, args).with_execution_name(name);
            if let Some(scratch) = scratch {
                req = req.with_scratch_dir(scratch);
            }
            let stream = session.client.runner().run(req)?;
            session.follow(stream, "Running").await
        }
        Command::Deploy(apps) => {
            session
                .fan_out("Deploying", &apps, |client, dir, ctx, name| {
                    client.deploy_app(dir, ctx, name)
                })
                .await
        }
        Command::Destroy(apps) => {
            session
                .fan_out("Destroying", &apps, |client, dir, ctx, name| {
                    client.destroy_app(dir, ctx, name)
                })
                .await
        }
        Command::Bootstrap { app_dir, context } => {
            let stream = session
                .client
                .bootstrap(&app_dir, &context, &unit_name(&app_dir))?;
            session.follow(stream, "Bootstrapping").await
        }
        Command::ClearContext { app_dir } => {
            session.client.clear_context(&app_dir).await?;
            info!(dir = ?app_dir, "context cleared");
            Ok(())
        }
        Command::Outputs { file } => {
            for (key, value) in parse_outputs(&file)? {
                println!("{key}={value}");
            }
            Ok(())
        }
    }
}

/// Everything one CLI invocation needs to start and report runs.
struct Session {
    client: CdkClient,
    render: RenderOptions,
    use_bar: bool,
}

impl Session {
    fn new(cfg: &ConfigFile, verbose: bool) -> Self {
        let runner = ProcessRunner::from_config(&cfg.runner);
        Self {
            client: CdkClient::new(runner, cfg.cdk.clone()),
            render: RenderOptions::from_config(&cfg.progress),
            use_bar: cfg.progress.show_bar && !verbose,
        }
    }

    async fn follow(&self, stream: EventStream, description: &str) -> Result<()> {
        let outcome = if self.use_bar {
            display_progress(stream, description, self.render).await
        } else {
            wait_for_stream(stream).await
        };
        outcome.map_err(|e| anyhow!("{description} failed: {e}"))
    }

    /// Start one run per app directory, report them together and print one
    /// result line per app.
    async fn fan_out<F>(&self, description: &str, apps: &AppArgs, start: F) -> Result<()>
    where
        F: Fn(&CdkClient, &Path, &[String], &str) -> crate::errors::Result<EventStream>,
    {
        let mut streams = Vec::with_capacity(apps.app_dirs.len());
        let mut launch_failures = 0usize;

        let names = unit_names(&apps.app_dirs);
        for (dir, name) in apps.app_dirs.iter().zip(names) {
            match start(&self.client, dir, &apps.context, &name) {
                Ok(stream) => streams.push(LabeledStream::new(name, stream)),
                Err(e) => {
                    error!(app = %name, error = %e, "could not start run");
                    println!("{name}: FAILED ({e})");
                    launch_failures += 1;
                }
            }
        }

        let results = if self.use_bar {
            display_progress_bar(description, streams, self.render).await
        } else {
            show_execution(streams).await
        };

        let failed = launch_failures + print_results(&results);
        if failed > 0 {
            return Err(anyhow!("{failed} of {} runs failed", apps.app_dirs.len()));
        }
        Ok(())
    }
}

/// Print one line per result; returns how many failed.
fn print_results(results: &[RunResult]) -> usize {
    let mut failed = 0;
    for result in results {
        match &result.err {
            None => println!("{}: ok", result.context),
            Some(err) => {
                failed += 1;
                println!("{}: FAILED ({err})", result.context);
            }
        }
    }
    failed
}

/// Label of a unit: the directory's own name, or the whole path if it has none.
fn unit_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

/// One distinct label per app directory.
///
/// Units are named after their directory. Directories sharing a name are
/// labelled with their full path instead, and a position suffix settles any
/// remaining tie (the same path given twice).
fn unit_names(dirs: &[PathBuf]) -> Vec<String> {
    let short: Vec<String> = dirs.iter().map(|d| unit_name(d)).collect();
    let mut short_counts: HashMap<&str, usize> = HashMap::new();
    for name in &short {
        *short_counts.entry(name.as_str()).or_default() += 1;
    }

    let labels: Vec<String> = dirs
        .iter()
        .zip(&short)
        .map(|(dir, name)| {
            if short_counts[name.as_str()] > 1 {
                dir.display().to_string()
            } else {
                name.clone()
            }
        })
        .collect();

    let mut label_counts: HashMap<&str, usize> = HashMap::new();
    for label in &labels {
        *label_counts.entry(label.as_str()).or_default() += 1;
    }
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            if label_counts[label.as_str()] > 1 {
                format!("{label}#{}", i + 1)
            } else {
                label.clone()
            }
        })
        .collect()
}
