// tests/classify_properties.rs

use proptest::prelude::*;
use stackrun::event::ProgressEvent;
use stackrun::exec::apply_line;

// Text before the marker: no digits, no pipes, so it can never look like a
// marker itself.
fn prefix_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z _-]{0,20}"
}

// Non-empty description that may contain ` | ` separators and trailing
// whitespace; both are kept verbatim.
fn description_strategy() -> impl Strategy<Value = String> {
    "[A-Z_]{1,12}( \\| [A-Za-z:]{1,12}){0,3}[ \t]{0,3}"
}

// Lines without a `/` can never carry a step marker.
fn plain_line_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 |:._-]{0,60}"
}

fn seeded_event() -> ProgressEvent {
    let mut ev = ProgressEvent::new("ctx");
    apply_line(&mut ev, "Stack | 5/9 | CREATE_IN_PROGRESS");
    ev
}

proptest! {
    #[test]
    fn marker_lines_set_counters_and_description(
        prefix in prefix_strategy(),
        current in 0u64..1_000_000,
        total in 0u64..1_000_000,
        desc in description_strategy(),
    ) {
        let line = format!("{prefix} | {current}/{total} | {desc}");
        let mut ev = seeded_event();
        let before = ev.outputs.len();

        apply_line(&mut ev, &line);

        prop_assert_eq!(ev.current_step, current);
        prop_assert_eq!(ev.total_steps, total);
        prop_assert_eq!(&ev.step_description, &desc);
        prop_assert_eq!(ev.outputs.len(), before + 1);
        prop_assert_eq!(ev.outputs.last(), Some(&line));
        prop_assert_eq!(&ev.last_output, &line);
    }

    #[test]
    fn other_lines_only_grow_outputs(lines in proptest::collection::vec(plain_line_strategy(), 1..20)) {
        let mut ev = seeded_event();
        let seed = ev.clone();

        for line in &lines {
            apply_line(&mut ev, line);
        }

        prop_assert_eq!(ev.current_step, seed.current_step);
        prop_assert_eq!(ev.total_steps, seed.total_steps);
        prop_assert_eq!(&ev.step_description, &seed.step_description);
        prop_assert_eq!(ev.outputs.len(), seed.outputs.len() + lines.len());
        prop_assert_eq!(&ev.outputs[seed.outputs.len()..], &lines[..]);
        prop_assert_eq!(Some(&ev.last_output), lines.last());
    }
}
