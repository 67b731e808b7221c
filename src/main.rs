use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use session_harness::config::{HarnessConfig, ScenarioKind, Timeouts};
use session_harness::driver;
use session_harness::error::HarnessError;
use session_harness::report::Reporter;

/// Concurrent correctness and load harness for a session-stateful
/// HTTP/WebSocket service.
///
/// Exit status: 0 when every check passed, 1 when a check failed or a session
/// aborted, 2 when the configuration is invalid.
#[derive(Debug, Parser)]
#[command(name = "session-harness", version)]
struct Args {
    /// Scenario every worker runs.
    #[arg(value_enum)]
    scenario: ScenarioKind,

    /// Service host.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Service port.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Parallel workers (scenario default if omitted).
    #[arg(long, short = 'p')]
    workers: Option<usize>,

    /// Sequential sessions per worker.
    #[arg(long, short = 'n')]
    sessions: Option<usize>,

    /// Requests per session (`send` scenario).
    #[arg(long, short = 'r')]
    requests: Option<usize>,

    /// Mutate/echo rounds per session (`crud` and `echo` scenarios).
    #[arg(long)]
    iterations: Option<usize>,

    /// Name of the session cookie.
    #[arg(long)]
    cookie: Option<String>,

    /// Path used for greet calls.
    #[arg(long)]
    greet_path: Option<String>,

    /// Run the payload-size probe before the batch.
    #[arg(long, conflicts_with = "no_size_probe")]
    size_probe: bool,

    /// Skip the payload-size probe.
    #[arg(long)]
    no_size_probe: bool,

    /// Size of the probe payload in bytes.
    #[arg(long)]
    probe_bytes: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> HarnessConfig {
        let mut config =
            HarnessConfig::for_scenario(self.scenario).with_target(self.host, self.port);

        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(sessions) = self.sessions {
            config = config.with_sessions(sessions);
        }
        if let Some(requests) = self.requests {
            config = config.with_requests(requests);
        }
        if let Some(iterations) = self.iterations {
            config = config.with_iterations(iterations);
        }
        if let Some(cookie) = self.cookie {
            config = config.with_session_cookie(cookie);
        }
        if let Some(path) = self.greet_path {
            config = config.with_greet_path(path);
        }
        if self.size_probe {
            config = config.with_size_probe(true);
        }
        if self.no_size_probe {
            config = config.with_size_probe(false);
        }
        if let Some(bytes) = self.probe_bytes {
            config = config.with_probe_bytes(bytes);
        }

        let defaults = Timeouts::default();
        config.with_timeouts(Timeouts::new(
            defaults.connect,
            Duration::from_secs(self.request_timeout_secs),
            defaults.handshake,
        ))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Args::parse().into_config();
    let mut reporter = Reporter::stdout();

    match driver::run_batch(config, &mut reporter).await {
        Ok(summary) => ExitCode::from(summary.exit_code() as u8),
        Err(HarnessError::Config(msg)) => {
            error!("invalid configuration: {}", msg);
            ExitCode::from(2)
        }
        Err(err) => {
            error!("batch failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
