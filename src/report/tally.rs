// src/report/tally.rs

//! Combined step counters for several concurrent runs sharing one bar.

use std::collections::HashMap;

use crate::event::ProgressEvent;

/// Latest step counters per execution, summed for display.
///
/// The combined total is only reported once every expected execution has
/// announced a total of its own; before that the bar stays indeterminate,
/// since a partial sum would make the bar jump backwards later.
#[derive(Debug, Clone, Default)]
pub struct StepTally {
    expected: usize,
    latest: HashMap<String, (u64, u64)>,
    description: String,
}

impl StepTally {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            ..Default::default()
        }
    }

    pub fn observe(&mut self, event: &ProgressEvent) {
        if event.execution_name.is_empty() {
            return;
        }
        let entry = self
            .latest
            .entry(event.execution_name.clone())
            .or_insert((0, 0));
        // Terminal events are copies of the last state; never move backwards.
        if !event.is_terminal() || event.total_steps > 0 {
            *entry = (event.current_step, event.total_steps);
        }
        if !event.step_description.is_empty() {
            self.description = event.step_description.clone();
        }
    }

    fn all_have_totals(&self) -> bool {
        let with_totals = self.latest.values().filter(|(_, total)| *total > 0).count();
        with_totals >= self.expected && self.expected > 0
    }

    /// A synthetic event describing all runs at once.
    pub fn snapshot(&self, fallback_description: &str) -> ProgressEvent {
        let mut ev = ProgressEvent::new("combined");
        if self.all_have_totals() {
            ev.current_step = self.latest.values().map(|(current, _)| current).sum();
            ev.total_steps = self.latest.values().map(|(_, total)| total).sum();
        }
        ev.step_description = if self.description.is_empty() {
            fallback_description.to_string()
        } else {
            self.description.clone()
        };
        ev
    }
}
