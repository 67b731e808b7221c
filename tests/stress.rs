//! Stress tests: full-size batches against the mock service.
//!
//! These tests are marked #[ignore] and run via: cargo test -- --ignored

mod harness;

use harness::MockService;
use session_harness::config::ScenarioKind;
use session_harness::driver;
use session_harness::report::Reporter;

fn get_stress_worker_count(scenario: ScenarioKind) -> usize {
    std::env::var("SESSION_HARNESS_STRESS_WORKERS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| scenario.default_workers())
}

async fn stress(scenario: ScenarioKind) {
    let workers = get_stress_worker_count(scenario);
    println!("Stress test: {} with {} workers", scenario, workers);

    let service = MockService::spawn().await;
    let config = service
        .config(scenario)
        .with_workers(workers)
        .with_iterations(scenario.default_iterations())
        .with_size_probe(scenario.runs_size_probe())
        .with_probe_bytes(session_harness::config::DEFAULT_PROBE_BYTES);

    let mut reporter = Reporter::stdout();
    let summary = driver::run_batch(config, &mut reporter).await.unwrap();

    let sessions = summary.sessions_completed + summary.sessions_aborted;
    let rate = sessions as f64 / summary.elapsed.as_secs_f64().max(f64::EPSILON);
    println!("Stress results: {:.1} sessions/s", rate);

    assert_eq!(summary.sessions_aborted, 0, "sessions aborted under load");
    assert_eq!(summary.checks.failed, 0, "mismatches under load");
    if let Some(probe) = summary.size_probe {
        assert!(probe, "size probe failed");
    }

    service.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn test_stress_auth() {
    stress(ScenarioKind::Auth).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn test_stress_crud() {
    stress(ScenarioKind::Crud).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn test_stress_echo() {
    stress(ScenarioKind::Echo).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn test_stress_stream() {
    stress(ScenarioKind::Stream).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn test_stress_send() {
    stress(ScenarioKind::Send).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn test_stress_statics() {
    stress(ScenarioKind::Statics).await;
}
