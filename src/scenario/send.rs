//! Counted `/send` sequence.
//!
//! One fresh session issuing `requests_per_session` sends; the service must
//! number them 1, 2, ... within the session.

use serde_json::json;

use crate::client::SessionClient;
use crate::error::Result;
use crate::generator::identifier;
use crate::oracle::{self, Counter};
use crate::scenario::Session;

pub async fn run(session: &mut Session<'_>) -> Result<()> {
    let config = session.config;
    let mut client = SessionClient::new(config)?;

    let mut counter = Counter::new();
    for _ in 0..config.requests_per_session {
        let id = identifier();
        let res = client.post_json("send", "/send", &json!({ "id": id })).await?;
        let count = counter.next();
        session.verifier.check(
            &format!("send #{}", count),
            &oracle::sent(count, &id),
            &res,
        );
    }

    Ok(())
}
