//! Concurrency driver: P isolated workers behind a start and a join barrier.
//!
//! Each worker is a tokio task owning its own generator, verifier and (per
//! session) HTTP client, so no session state is ever shared. The only thing
//! workers have in common is the read-only configuration.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::generator::DataGenerator;
use crate::report::{BatchSummary, Reporter, SessionReport, WorkerReport};
use crate::scenario::{self, Session, probe};
use crate::verify::Verifier;

/// Run `sessions_per_worker` sessions back to back.
///
/// A transport error ends the current session only; the worker moves on to
/// its next session.
pub async fn run_worker(worker: usize, config: Arc<HarnessConfig>) -> WorkerReport {
    let mut generator = DataGenerator::new();
    let mut verifier = Verifier::new(config.scenario, worker);
    let mut report = WorkerReport::new(worker);

    for index in 0..config.sessions_per_worker {
        verifier.begin_session(index);
        let before = verifier.tally();

        let mut session = Session::new(&config, &mut generator, &mut verifier);
        let outcome = scenario::run_session(config.scenario, &mut session).await;

        let checks = verifier.tally().since(before);
        match outcome {
            Ok(()) => report.record_completed(SessionReport { checks }),
            Err(err) => {
                error!(
                    scenario = %config.scenario,
                    worker,
                    session = index,
                    error = %err,
                    "session aborted"
                );
                report.record_aborted(checks);
            }
        }
    }

    report
}

/// Run one batch and print its markers through `reporter`.
///
/// The configuration is validated before anything touches the network. The
/// size probe, when enabled, runs once before the workers. The elapsed time
/// covers the span from releasing the start barrier to the last worker
/// returning.
///
/// # Errors
///
/// `HarnessError::Config` for an invalid configuration and `HarnessError::Io`
/// if the reporter cannot write. Failures inside workers are counted in the
/// summary instead.
pub async fn run_batch<W: Write>(
    config: HarnessConfig,
    reporter: &mut Reporter<W>,
) -> Result<BatchSummary> {
    config.validate().await?;
    let mut summary = BatchSummary::new(config.scenario);

    if config.size_probe {
        let ok = match probe::run(&config).await {
            Ok(ok) => ok,
            Err(err) => {
                error!(error = %err, "size probe aborted");
                false
            }
        };
        reporter.size_probe(ok)?;
        summary.size_probe = Some(ok);
    }

    let workers = config.workers;
    info!(
        scenario = %config.scenario,
        target = %config.base_url(),
        workers,
        sessions = config.sessions_per_worker,
        "spawning workers"
    );

    let config = Arc::new(config);
    let start = Arc::new(Barrier::new(workers + 1));
    let mut set = JoinSet::new();
    for worker in 0..workers {
        let config = Arc::clone(&config);
        let start = Arc::clone(&start);
        set.spawn(async move {
            start.wait().await;
            run_worker(worker, config).await
        });
    }

    reporter.starting()?;
    let started = Instant::now();
    start.wait().await;

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(report) => summary.absorb(&report),
            Err(err) => {
                error!(error = %err, "worker panicked");
                summary.record_panicked_worker();
            }
        }
    }
    summary.elapsed = started.elapsed();

    reporter.ended(summary.elapsed)?;
    reporter.summary(&summary)?;
    info!(
        passed = summary.checks.passed,
        failed = summary.checks.failed,
        aborted = summary.sessions_aborted,
        "batch finished"
    );
    Ok(summary)
}
