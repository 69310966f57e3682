// src/exec/mod.rs

//! Process execution layer.
//!
//! This module starts the deployment tool as a child process with
//! `tokio::process::Command` and turns its output into an event stream.
//!
//! - [`launcher`] provides the `ProcessLauncher` trait and the production
//!   `CommandLauncher`; tests swap in a launcher backed by in-memory pipes.
//! - [`classify`] reads stdout/stderr and folds progress lines into events.
//! - [`input`] answers interactive prompts, one line per prompt.
//! - [`runner`] owns one run's lifecycle: launch, supervise, clean up, close.

pub mod classify;
pub mod input;
pub mod launcher;
pub mod runner;

pub use classify::{OutputClassifier, PromptEcho, StdoutEcho, apply_line};
pub use input::{AnswerSource, PromptReply};
pub use launcher::{
    BoxedReader, BoxedWriter, CommandLauncher, ExitOutcome, LaunchedProcess, ProcessLauncher,
};
pub use runner::{ProcessRunner, RunRequest};
