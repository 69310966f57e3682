// src/report/render.rs

//! Live progress bar driven by the latest event of a run.
//!
//! The renderer is deliberately lossy: it wakes up every `poll_interval`,
//! looks at the most recent event pushed into its [`ProgressFeed`] and
//! redraws. Intermediate events between two polls are never shown.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ProgressSection;
use crate::event::ProgressEvent;

const SPINNER_TEMPLATE: &str = "{msg} [{spinner}] {elapsed}";
const BAR_TEMPLATE: &str = "{msg} [{bar:30}] {pos}/{len} {elapsed}";
const TICKS: &[&str] = &["o---", "-o--", "--o-", "---o", "--o-", "-o--", "oooo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub poll_interval: Duration,
    /// Keep all state but never draw (tests, non-interactive callers).
    pub hidden: bool,
}

impl RenderOptions {
    pub fn from_config(cfg: &ProgressSection) -> Self {
        Self {
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            hidden: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            hidden: false,
        }
    }
}

/// Input side of a running renderer. Latest value wins.
#[derive(Debug, Clone)]
pub struct ProgressFeed {
    tx: watch::Sender<Option<ProgressEvent>>,
}

impl ProgressFeed {
    /// Replace the value the renderer will pick up on its next poll.
    ///
    /// Returns false once the renderer has shut down.
    pub fn push(&self, event: ProgressEvent) -> bool {
        self.tx.send(Some(event)).is_ok()
    }
}

/// State of the bar when the renderer finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarSnapshot {
    pub position: u64,
    pub length: Option<u64>,
    pub message: String,
    /// Whether a step total was ever observed.
    pub determinate: bool,
}

/// Start a progress bar labelled `description` and the task that drives it.
///
/// The bar spins until an event with `total_steps > 0` arrives, then tracks
/// `current_step / total_steps`. Cancelling `cancel` closes the feed, fills the
/// bar to 100% and ends the task. Cancelling has no effect on whatever
/// produces the events.
pub fn run_progress_bar(
    cancel: CancellationToken,
    description: &str,
    opts: RenderOptions,
) -> (ProgressFeed, JoinHandle<BarSnapshot>) {
    let (tx, rx) = watch::channel(None);
    let bar = if opts.hidden {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    bar.set_style(spinner_style());
    bar.set_message(description.to_string());
    if !opts.hidden {
        bar.enable_steady_tick(opts.poll_interval);
    }

    let description = description.to_string();
    let handle = tokio::spawn(drive_bar(bar, rx, cancel, description, opts.poll_interval));

    (ProgressFeed { tx }, handle)
}

async fn drive_bar(
    bar: ProgressBar,
    mut rx: watch::Receiver<Option<ProgressEvent>>,
    cancel: CancellationToken,
    description: String,
    poll_interval: Duration,
) -> BarSnapshot {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut determinate = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if rx.has_changed().unwrap_or(false) {
                    let latest = rx.borrow_and_update().clone();
                    if let Some(event) = latest {
                        apply_event(&bar, &event, &description, &mut determinate);
                    }
                }
            }
        }
    }

    // Pick up whatever arrived after the last poll, then close the feed.
    let latest = rx.borrow().clone();
    if let Some(event) = latest {
        apply_event(&bar, &event, &description, &mut determinate);
    }
    drop(rx);

    let length = match bar.length() {
        Some(len) if len > 0 => len,
        _ => {
            bar.set_length(1);
            1
        }
    };
    bar.set_position(length);
    bar.finish();
    debug!(description = %description, "progress bar finished");

    BarSnapshot {
        position: bar.position(),
        length: bar.length(),
        message: bar.message(),
        determinate,
    }
}

fn apply_event(bar: &ProgressBar, event: &ProgressEvent, description: &str, determinate: &mut bool) {
    if event.total_steps > 0 {
        if !*determinate {
            bar.set_style(bar_style());
            *determinate = true;
        }
        bar.set_length(event.total_steps);
        bar.set_position(event.current_step.min(event.total_steps));
    }

    if event.step_description.is_empty() {
        bar.set_message(description.to_string());
    } else {
        bar.set_message(event.step_description.clone());
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}
