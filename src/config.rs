//! Configuration for a harness batch.

use std::fmt;
use std::time::Duration;

use crate::error::{HarnessError, Result};

/// Name of the session cookie the service issues.
pub const DEFAULT_SESSION_COOKIE: &str = "bsessionid";

/// Size of the payload sent by the one-off size probe (~4 MiB).
pub const DEFAULT_PROBE_BYTES: usize = 4 * 1024 * 1024;

/// Scenario variant run by every worker of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Register, login, counted greets, profile lookup, logout.
    Auth,
    /// Create an item and keep it consistent across field mutations.
    Crud,
    /// Path/body echoes interleaved with counter reads.
    Echo,
    /// Counted `/send` calls followed by a WebSocket echo phase.
    Stream,
    /// Many sessions of counted `/send` calls per worker.
    Send,
    /// One static asset fetch per worker.
    Statics,
}

impl ScenarioKind {
    /// Name used in logs and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ScenarioKind::Auth => "auth",
            ScenarioKind::Crud => "crud",
            ScenarioKind::Echo => "echo",
            ScenarioKind::Stream => "stream",
            ScenarioKind::Send => "send",
            ScenarioKind::Statics => "statics",
        }
    }

    /// Default number of parallel workers.
    #[must_use]
    pub const fn default_workers(self) -> usize {
        match self {
            ScenarioKind::Auth | ScenarioKind::Stream | ScenarioKind::Send => 100,
            ScenarioKind::Crud | ScenarioKind::Echo | ScenarioKind::Statics => 200,
        }
    }

    /// Default number of sequential sessions per worker.
    #[must_use]
    pub const fn default_sessions(self) -> usize {
        match self {
            ScenarioKind::Send => 5,
            _ => 1,
        }
    }

    /// Default number of requests per session (`/send` calls).
    #[must_use]
    pub const fn default_requests(self) -> usize {
        match self {
            ScenarioKind::Send => 10,
            _ => 1,
        }
    }

    /// Default number of mutate/echo rounds inside one session.
    #[must_use]
    pub const fn default_iterations(self) -> usize {
        match self {
            ScenarioKind::Crud | ScenarioKind::Echo => 20,
            _ => 1,
        }
    }

    /// Whether the payload-size probe precedes the batch by default.
    #[must_use]
    pub const fn runs_size_probe(self) -> bool {
        matches!(self, ScenarioKind::Echo | ScenarioKind::Send)
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Timeouts applied to every network operation.
///
/// A timeout is a transport failure: it aborts the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum time to establish a TCP connection.
    ///
    /// Default: 10 seconds
    pub connect: Duration,

    /// Maximum time for one HTTP request/response or one WebSocket receive.
    ///
    /// Default: 30 seconds
    pub request: Duration,

    /// Maximum time to complete the WebSocket upgrade.
    ///
    /// Default: 10 seconds
    pub handshake: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
            handshake: Duration::from_secs(10),
        }
    }
}

impl Timeouts {
    /// Create new timeouts with custom values.
    #[must_use]
    pub const fn new(connect: Duration, request: Duration, handshake: Duration) -> Self {
        Self {
            connect,
            request,
            handshake,
        }
    }
}

/// Harness batch configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Service host name or address.
    pub host: String,
    /// Service port.
    pub port: u16,
    /// Scenario every worker runs.
    pub scenario: ScenarioKind,
    /// Number of isolated parallel workers (`P`).
    pub workers: usize,
    /// Sequential sessions per worker (`N`).
    pub sessions_per_worker: usize,
    /// Sequential requests per session (`R`).
    pub requests_per_session: usize,
    /// Mutate/echo rounds inside one session.
    pub iterations: usize,
    /// Name of the cookie carrying the session token.
    pub session_cookie: String,
    /// Path used for greet calls in the auth scenario.
    pub greet_path: String,
    /// Run the payload-size probe before the batch.
    pub size_probe: bool,
    /// Payload length of the size probe.
    pub probe_bytes: usize,
    /// Network timeouts.
    pub timeouts: Timeouts,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::for_scenario(ScenarioKind::Auth)
    }
}

impl HarnessConfig {
    /// Configuration with the defaults of `scenario`, targeting `localhost:8080`.
    #[must_use]
    pub fn for_scenario(scenario: ScenarioKind) -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            scenario,
            workers: scenario.default_workers(),
            sessions_per_worker: scenario.default_sessions(),
            requests_per_session: scenario.default_requests(),
            iterations: scenario.default_iterations(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            greet_path: "/hello".to_string(),
            size_probe: scenario.runs_size_probe(),
            probe_bytes: DEFAULT_PROBE_BYTES,
            timeouts: Timeouts::default(),
        }
    }

    /// Set the service address.
    #[must_use]
    pub fn with_target(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set the number of parallel workers.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the number of sequential sessions per worker.
    #[must_use]
    pub const fn with_sessions(mut self, sessions: usize) -> Self {
        self.sessions_per_worker = sessions;
        self
    }

    /// Set the number of requests per session.
    #[must_use]
    pub const fn with_requests(mut self, requests: usize) -> Self {
        self.requests_per_session = requests;
        self
    }

    /// Set the number of in-session rounds.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Enable or disable the size probe.
    #[must_use]
    pub const fn with_size_probe(mut self, enabled: bool) -> Self {
        self.size_probe = enabled;
        self
    }

    /// Set the size probe payload length.
    #[must_use]
    pub const fn with_probe_bytes(mut self, bytes: usize) -> Self {
        self.probe_bytes = bytes;
        self
    }

    /// Set the greet path.
    #[must_use]
    pub fn with_greet_path(mut self, path: impl Into<String>) -> Self {
        self.greet_path = path.into();
        self
    }

    /// Set the session cookie name.
    #[must_use]
    pub fn with_session_cookie(mut self, name: impl Into<String>) -> Self {
        self.session_cookie = name.into();
        self
    }

    /// Set custom timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// `http://host:port`, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `host:port`, as sent in the WebSocket `Host` header.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the configuration before any worker starts.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if a count is zero, the host is empty
    /// or does not resolve, the port is zero, the cookie name is empty, or the
    /// greet path is not absolute. The host is resolved on the runtime's
    /// blocking pool.
    pub async fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(HarnessError::Config("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(HarnessError::Config("port cannot be 0".into()));
        }
        if self.workers == 0 {
            return Err(HarnessError::Config("workers must be at least 1".into()));
        }
        if self.sessions_per_worker == 0 {
            return Err(HarnessError::Config("sessions must be at least 1".into()));
        }
        if self.requests_per_session == 0 {
            return Err(HarnessError::Config("requests must be at least 1".into()));
        }
        if self.session_cookie.is_empty() {
            return Err(HarnessError::Config("session cookie name cannot be empty".into()));
        }
        if !self.greet_path.starts_with('/') {
            return Err(HarnessError::Config(format!(
                "greet path must start with '/': {}",
                self.greet_path
            )));
        }

        let resolved = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| HarnessError::Config(format!("cannot resolve {}: {}", self.authority(), e)))?
            .next();
        if resolved.is_none() {
            return Err(HarnessError::Config(format!(
                "{} resolves to no address",
                self.authority()
            )));
        }

        Ok(())
    }
}
