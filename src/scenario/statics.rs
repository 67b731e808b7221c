//! Static asset probe: one GET of a bundled asset must answer 200.

use crate::client::SessionClient;
use crate::error::Result;
use crate::scenario::Session;

pub const STATIC_ASSETS: [&str; 2] = [
    "/statics/js/bootstrap.bundle.min.js",
    "/statics/css/bootstrap.min.css",
];

pub async fn run(session: &mut Session<'_>) -> Result<()> {
    let mut client = SessionClient::new(session.config)?;
    let path = if session.generator.boolean() {
        STATIC_ASSETS[0]
    } else {
        STATIC_ASSETS[1]
    };

    let status = client.status(path).await?;
    session.verifier.check(path, &200u16, &status);
    Ok(())
}
