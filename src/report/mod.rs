// src/report/mod.rs

//! Consumers of event streams.
//!
//! Single run:
//! - [`display_progress`] drives a progress bar and returns the run's error.
//! - [`wait_for_stream`] does the same without a bar.
//!
//! Several concurrent runs (fan-in):
//! - [`collect_results`] drains every stream into one [`RunResult`] each.
//! - [`show_execution`] additionally logs every output line as it arrives.
//! - [`display_progress_bar`] additionally drives one shared bar.
//!
//! In every case a stream that closes without an event carrying `err` is a
//! successful run; closing is never an error by itself.

pub mod render;
pub mod tally;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::event::{EventSender, EventStream, LabeledStream, ProgressEvent, RunError, RunResult};

pub use render::{BarSnapshot, ProgressFeed, RenderOptions, run_progress_bar};
pub use tally::StepTally;

/// Show a bar for one run until its stream closes.
///
/// If the run fails, every output line accumulated so far is logged at error
/// level before the error is returned, so the operator sees the full failing
/// context rather than only the last message.
pub async fn display_progress(
    stream: EventStream,
    description: &str,
    opts: RenderOptions,
) -> Result<(), RunError> {
    let cancel = CancellationToken::new();
    let (feed, bar) = run_progress_bar(cancel.clone(), description, opts);

    let outcome = drain_single(stream, |event| {
        feed.push(event.clone());
    })
    .await;

    cancel.cancel();
    if let Err(e) = bar.await {
        warn!(error = %e, "progress bar task failed");
    }
    outcome
}

/// Drain one run without a bar, logging each output line at info.
pub async fn wait_for_stream(stream: EventStream) -> Result<(), RunError> {
    drain_single(stream, |event| {
        if !event.is_terminal() && !event.last_output.is_empty() {
            info!(execution = %event.execution_name, "{}", event.last_output);
        }
    })
    .await
}

async fn drain_single<F>(mut stream: EventStream, mut on_event: F) -> Result<(), RunError>
where
    F: FnMut(&ProgressEvent),
{
    let mut last_outputs: Vec<String> = Vec::new();

    while let Some(event) = stream.recv().await {
        on_event(&event);
        if let Some(err) = event.err {
            let outputs = if event.outputs.is_empty() {
                last_outputs
            } else {
                event.outputs
            };
            replay_failure(&event.execution_name, &outputs);
            return Err(err);
        }
        last_outputs = event.outputs;
    }

    Ok(())
}

fn replay_failure(execution_name: &str, outputs: &[String]) {
    for line in outputs {
        error!(execution = %execution_name, "{}", line);
    }
}

/// Drain every stream concurrently; one [`RunResult`] per stream, in input
/// order, once all of them have closed.
pub async fn collect_results(streams: Vec<LabeledStream>) -> Vec<RunResult> {
    drain_all(streams, None).await
}

/// Like [`collect_results`], logging each run's output lines as they arrive.
pub async fn show_execution(streams: Vec<LabeledStream>) -> Vec<RunResult> {
    let (tx, mut combined) = mpsc::channel::<ProgressEvent>(streams.len().max(1));

    let consume = async {
        while let Some(event) = combined.recv().await {
            if !event.is_terminal() && !event.last_output.is_empty() {
                info!(execution = %event.execution_name, "{}", event.last_output);
            }
        }
    };

    let (results, ()) = tokio::join!(drain_all(streams, Some(tx)), consume);
    results
}

/// Like [`collect_results`], with one bar tracking all runs together.
pub async fn display_progress_bar(
    description: &str,
    streams: Vec<LabeledStream>,
    opts: RenderOptions,
) -> Vec<RunResult> {
    let mut tally = StepTally::new(streams.len());
    let cancel = CancellationToken::new();
    let (feed, bar) = run_progress_bar(cancel.clone(), description, opts);
    let (tx, mut combined) = mpsc::channel::<ProgressEvent>(streams.len().max(1));

    let consume = async {
        while let Some(event) = combined.recv().await {
            tally.observe(&event);
            feed.push(tally.snapshot(description));
        }
    };

    let (results, ()) = tokio::join!(drain_all(streams, Some(tx)), consume);

    cancel.cancel();
    if let Err(e) = bar.await {
        warn!(error = %e, "progress bar task failed");
    }
    results
}

async fn drain_all(streams: Vec<LabeledStream>, forward: Option<EventSender>) -> Vec<RunResult> {
    let mut pending = Vec::with_capacity(streams.len());
    for labeled in streams {
        let context = labeled.context.clone();
        let handle = tokio::spawn(drain_into_result(labeled, forward.clone()));
        pending.push((context, handle));
    }
    // Only the drain tasks may keep the combined channel open.
    drop(forward);

    let mut results = Vec::with_capacity(pending.len());
    for (context, handle) in pending {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                error!(context = %context, error = %e, "stream collector task failed");
                results.push(RunResult {
                    execution_name: context.clone(),
                    context,
                    outputs: Vec::new(),
                    err: Some(RunError::Collect(e.to_string())),
                });
            }
        }
    }
    results
}

async fn drain_into_result(labeled: LabeledStream, forward: Option<EventSender>) -> RunResult {
    let LabeledStream {
        context,
        mut stream,
    } = labeled;

    let mut result = RunResult {
        execution_name: context.clone(),
        context,
        ..Default::default()
    };

    while let Some(mut event) = stream.recv().await {
        if event.execution_name.is_empty() {
            event.execution_name = result.context.clone();
        }

        if let Some(tx) = &forward {
            if tx.send(event.clone()).await.is_err() {
                debug!(context = %result.context, "combined receiver dropped");
            }
        }

        result.execution_name = event.execution_name;
        match event.err {
            Some(err) => {
                if result.err.is_none() {
                    result.err = Some(err);
                } else {
                    debug!(context = %result.context, error = %err, "ignoring error after terminal event");
                }
                if !event.outputs.is_empty() {
                    result.outputs = event.outputs;
                }
            }
            None => result.outputs = event.outputs,
        }
    }

    result
}
