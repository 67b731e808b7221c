//! Session simulation: one ordered request/verify sequence per simulated client.
//!
//! Every scenario builds its own [`SessionClient`](crate::client::SessionClient),
//! so cookies and connections never leak from one session into another. A
//! content mismatch is recorded by the verifier and the sequence goes on; a
//! transport error is returned and ends the session.

pub mod auth;
pub mod crud;
pub mod echo;
pub mod probe;
pub mod send;
pub mod statics;
pub mod stream;

use crate::config::{HarnessConfig, ScenarioKind};
use crate::error::Result;
use crate::generator::DataGenerator;
use crate::verify::Verifier;

/// State one simulated session borrows from its worker.
pub struct Session<'a> {
    pub config: &'a HarnessConfig,
    pub generator: &'a mut DataGenerator,
    pub verifier: &'a mut Verifier,
}

impl<'a> Session<'a> {
    pub fn new(
        config: &'a HarnessConfig,
        generator: &'a mut DataGenerator,
        verifier: &'a mut Verifier,
    ) -> Self {
        Self {
            config,
            generator,
            verifier,
        }
    }
}

/// Run one session of `kind`.
///
/// # Errors
///
/// Any transport failure; the checks made before it stay in the verifier.
pub async fn run_session(kind: ScenarioKind, session: &mut Session<'_>) -> Result<()> {
    match kind {
        ScenarioKind::Auth => auth::run(session).await,
        ScenarioKind::Crud => crud::run(session).await,
        ScenarioKind::Echo => echo::run(session).await,
        ScenarioKind::Stream => stream::run(session).await,
        ScenarioKind::Send => send::run(session).await,
        ScenarioKind::Statics => statics::run(session).await,
    }
}
