//! # session-harness
//!
//! A concurrent correctness and load harness for a session-stateful
//! HTTP/WebSocket service.
//!
//! Every worker runs simulated client sessions in strict order, carrying the
//! session cookie from call to call, and compares each response with the
//! value the service must return. Workers run in parallel behind a start
//! barrier; the batch ends when the last worker returns.
//!
//! ## Scenarios
//!
//! - `auth`: register, login, counted greets, profile lookup, logout
//! - `crud`: item create/mutate/update/fetch consistency
//! - `echo`: path and body echoes against a per-session counter
//! - `stream`: counted sends, then a WebSocket that sees the same session
//! - `send`: many sessions of counted sends
//! - `statics`: static asset availability
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use session_harness::{HarnessConfig, Reporter, ScenarioKind, driver};
//!
//! let config = HarnessConfig::for_scenario(ScenarioKind::Echo)
//!     .with_target("localhost", 8080)
//!     .with_workers(10);
//! let summary = driver::run_batch(config, &mut Reporter::stdout()).await?;
//! std::process::exit(summary.exit_code());
//! ```

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod generator;
pub mod oracle;
pub mod report;
pub mod scenario;
pub mod verify;
pub mod ws;

pub use client::SessionClient;
pub use config::{HarnessConfig, ScenarioKind, Timeouts};
pub use error::{HarnessError, Result, WsError};
pub use generator::{DataGenerator, SimulatedItem, SimulatedUser};
pub use report::{BatchSummary, Reporter, SessionReport, WorkerReport};
pub use verify::{Tally, Verifier};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_public_types_are_send() {
        assert_send::<HarnessError>();
        assert_send::<HarnessConfig>();
        assert_send::<DataGenerator>();
        assert_send::<Verifier>();
        assert_send::<SessionClient>();
        assert_send::<WorkerReport>();
        assert_send::<ws::WsConnection<tokio::net::TcpStream>>();
    }

    #[test]
    fn test_public_types_are_sync() {
        assert_sync::<HarnessError>();
        assert_sync::<HarnessConfig>();
        assert_sync::<Tally>();
        assert_sync::<BatchSummary>();
        assert_sync::<WsError>();
    }
}
