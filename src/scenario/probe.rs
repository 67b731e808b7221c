//! One-off large payload probe, run before the concurrent batch.

use serde_json::json;
use tracing::info;

use crate::client::SessionClient;
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::oracle;
use crate::verify::Verifier;

/// Post `{id: "aaa..."}` of `config.probe_bytes` characters to `/echo` and
/// require it back unchanged. Returns whether the echo matched.
///
/// # Errors
///
/// Transport failures; a wrong echo is a `false` result, not an error.
pub async fn run(config: &HarnessConfig) -> Result<bool> {
    let mut client = SessionClient::new(config)?;
    let mut verifier = Verifier::new(config.scenario, 0);

    let body = json!({ "id": "a".repeat(config.probe_bytes) });
    info!(bytes = config.probe_bytes, "size probe");
    let res = client.post_json("size probe", "/echo", &body).await?;

    Ok(verifier.check("size probe", &oracle::echoed_object(&body), &res))
}
