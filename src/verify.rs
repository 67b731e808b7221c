//! Structural comparison of observed responses against expected values.

use std::fmt;
use std::ops::AddAssign;

use tracing::{debug, warn};

use crate::config::ScenarioKind;

// Longest rendering of a value in mismatch diagnostics.
const MAX_RENDERED: usize = 512;

/// Counts of passed and failed checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: u64,
    pub failed: u64,
}

impl Tally {
    /// Total number of checks.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.passed + self.failed
    }

    /// Checks recorded after `earlier` was taken.
    #[must_use]
    pub const fn since(&self, earlier: Tally) -> Tally {
        Tally {
            passed: self.passed.saturating_sub(earlier.passed),
            failed: self.failed.saturating_sub(earlier.failed),
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.passed += rhs.passed;
        self.failed += rhs.failed;
    }
}

/// Compares responses for one worker and records the outcome.
///
/// A mismatch is logged and counted; it never interrupts the caller.
#[derive(Debug, Clone)]
pub struct Verifier {
    scenario: ScenarioKind,
    worker: usize,
    session: usize,
    tally: Tally,
}

impl Verifier {
    #[must_use]
    pub fn new(scenario: ScenarioKind, worker: usize) -> Self {
        Self {
            scenario,
            worker,
            session: 0,
            tally: Tally::default(),
        }
    }

    /// Tag subsequent diagnostics with a session index.
    pub fn begin_session(&mut self, session: usize) {
        self.session = session;
    }

    /// Compare `observed` with `expected`; returns whether they are equal.
    pub fn check<T>(&mut self, step: &str, expected: &T, observed: &T) -> bool
    where
        T: PartialEq + fmt::Debug,
    {
        if expected == observed {
            self.tally.passed += 1;
            return true;
        }

        self.tally.failed += 1;
        warn!(
            scenario = %self.scenario,
            worker = self.worker,
            session = self.session,
            step,
            "test failed"
        );
        debug!(
            expected = %render(expected),
            observed = %render(observed),
            "mismatch detail"
        );
        false
    }

    #[must_use]
    pub fn tally(&self) -> Tally {
        self.tally
    }

    #[must_use]
    pub fn worker(&self) -> usize {
        self.worker
    }

    #[must_use]
    pub fn session(&self) -> usize {
        self.session
    }
}

fn render<T: fmt::Debug>(value: &T) -> String {
    let mut text = format!("{:?}", value);
    if text.len() > MAX_RENDERED {
        let mut cut = MAX_RENDERED;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_equality_ignores_key_order() {
        let mut verifier = Verifier::new(ScenarioKind::Crud, 0);
        let expected = json!({"item": {"name": "a", "code": null, "id": 1}});
        let observed: serde_json::Value =
            serde_json::from_str(r#"{"item":{"id":1,"code":null,"name":"a"}}"#).unwrap();

        assert!(verifier.check("find", &expected, &observed));
        assert_eq!(verifier.tally(), Tally { passed: 1, failed: 0 });
    }

    #[test]
    fn test_mismatch_is_counted_not_fatal() {
        let mut verifier = Verifier::new(ScenarioKind::Auth, 3);
        verifier.begin_session(2);

        assert!(!verifier.check("greet", &json!({"count": 1}), &json!({"count": 2})));
        assert!(!verifier.check("nested", &json!([1, [2]]), &json!([1, [3]])));
        assert!(verifier.check("status", &200u16, &200u16));

        assert_eq!(verifier.tally(), Tally { passed: 1, failed: 2 });
        assert_eq!(verifier.worker(), 3);
        assert_eq!(verifier.session(), 2);
    }

    #[test]
    fn test_types_distinguish_int_from_string() {
        let mut verifier = Verifier::new(ScenarioKind::Echo, 0);
        assert!(!verifier.check("val", &json!({"val": 1}), &json!({"val": "1"})));
    }

    #[test]
    fn test_tally_add_assign() {
        let mut total = Tally::default();
        total += Tally { passed: 3, failed: 1 };
        total += Tally { passed: 2, failed: 0 };
        assert_eq!(total, Tally { passed: 5, failed: 1 });
        assert_eq!(total.total(), 6);
    }

    #[test]
    fn test_render_truncates_large_values() {
        let big = "a".repeat(10_000);
        let rendered = render(&big);
        assert!(rendered.len() <= MAX_RENDERED + 3);
        assert!(rendered.ends_with("..."));
    }
}
