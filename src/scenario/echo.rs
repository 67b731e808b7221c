//! Request/response echo with a per-session counter.
//!
//! Path echoes (`GET /echo/<id>`) and body echoes (`POST /echo`) are chosen
//! at random; only body echoes bump the counter reported by `GET /get`.

use serde_json::json;

use crate::client::SessionClient;
use crate::error::Result;
use crate::generator::identifier;
use crate::oracle::{self, Counter};
use crate::scenario::Session;

pub async fn run(session: &mut Session<'_>) -> Result<()> {
    let config = session.config;
    let mut client = SessionClient::new(config)?;

    let res = client.get("greet", &config.greet_path).await?;
    session.verifier.check("greet", &oracle::greeting(), &res);

    let res = client.get("read counter", "/get").await?;
    session
        .verifier
        .check("initial counter", &oracle::counter_value(0), &res);

    let mut posts = Counter::new();
    for round in 1..=config.iterations {
        let id = identifier();
        if session.generator.boolean() {
            let res = client.get("path echo", &format!("/echo/{}", id)).await?;
            session.verifier.check(
                &format!("path echo #{}", round),
                &oracle::path_echo(&id),
                &res,
            );
        } else {
            let res = client
                .post_json("body echo", "/echo", &json!({ "id": id }))
                .await?;
            posts.next();
            session.verifier.check(
                &format!("body echo #{}", round),
                &oracle::body_echo(&id),
                &res,
            );
        }

        let res = client.get("read counter", "/get").await?;
        session.verifier.check(
            &format!("counter after #{}", round),
            &oracle::counter_value(posts.current()),
            &res,
        );
    }

    Ok(())
}
