//! Batch outcome and the markers printed around it.

use std::fmt;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use crate::config::ScenarioKind;
use crate::verify::Tally;

/// Outcome of one completed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub checks: Tally,
}

/// Outcome of one worker: its sessions run strictly one after another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub sessions_completed: usize,
    pub sessions_aborted: usize,
    pub checks: Tally,
}

impl WorkerReport {
    #[must_use]
    pub fn new(worker: usize) -> Self {
        Self {
            worker,
            ..Self::default()
        }
    }

    pub fn record_completed(&mut self, session: SessionReport) {
        self.sessions_completed += 1;
        self.checks += session.checks;
    }

    /// Count an aborted session; checks made before the abort still count.
    pub fn record_aborted(&mut self, checks: Tally) {
        self.sessions_aborted += 1;
        self.checks += checks;
    }
}

/// Aggregate over every worker of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub scenario: ScenarioKind,
    pub workers: usize,
    pub workers_panicked: usize,
    pub sessions_completed: usize,
    pub sessions_aborted: usize,
    pub checks: Tally,
    /// `None` when the size probe did not run.
    pub size_probe: Option<bool>,
    pub elapsed: Duration,
}

impl BatchSummary {
    #[must_use]
    pub fn new(scenario: ScenarioKind) -> Self {
        Self {
            scenario,
            workers: 0,
            workers_panicked: 0,
            sessions_completed: 0,
            sessions_aborted: 0,
            checks: Tally::default(),
            size_probe: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn absorb(&mut self, report: &WorkerReport) {
        self.workers += 1;
        self.sessions_completed += report.sessions_completed;
        self.sessions_aborted += report.sessions_aborted;
        self.checks += report.checks;
    }

    /// A worker that panicked counts as one aborted session.
    pub fn record_panicked_worker(&mut self) {
        self.workers += 1;
        self.workers_panicked += 1;
        self.sessions_aborted += 1;
    }

    /// True if no check failed, no session aborted and the size probe (if
    /// run) succeeded.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.failed == 0 && self.sessions_aborted == 0 && self.size_probe != Some(false)
    }

    /// Process exit status: 0 on a clean batch, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: passed {}, failed {}, aborted {} ({} sessions over {} workers)",
            self.scenario,
            self.checks.passed,
            self.checks.failed,
            self.sessions_aborted,
            self.sessions_completed + self.sessions_aborted,
            self.workers,
        )
    }
}

/// Writes the plain-text markers of a batch.
///
/// Markers go to their own writer (stdout in the binary) so they are never
/// interleaved with log output on stderr.
pub struct Reporter<W> {
    out: W,
}

impl Reporter<Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn starting(&mut self) -> io::Result<()> {
        writeln!(self.out, "starting")?;
        self.out.flush()
    }

    pub fn ended(&mut self, elapsed: Duration) -> io::Result<()> {
        writeln!(self.out, "test ended")?;
        writeln!(self.out, "elapsed: {:.3}s", elapsed.as_secs_f64())?;
        self.out.flush()
    }

    pub fn size_probe(&mut self, ok: bool) -> io::Result<()> {
        let verdict = if ok { "ok" } else { "failed" };
        writeln!(self.out, "size test: {}", verdict)?;
        self.out.flush()
    }

    pub fn summary(&mut self, summary: &BatchSummary) -> io::Result<()> {
        writeln!(self.out, "{}", summary)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
