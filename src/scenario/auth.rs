//! Auth/session lifecycle.
//!
//! greet → register → login → k counted greets → profile lookup → logout →
//! greet. The counted greets prove the service keeps a per-session counter
//! that starts at login; the final greet proves logout tore the session down.

use tracing::debug;

use crate::client::SessionClient;
use crate::error::Result;
use crate::oracle::{self, Counter};
use crate::scenario::Session;

/// Bounds of the number of greets issued while logged in.
pub const GREETS: (usize, usize) = (1, 5);

pub async fn run(session: &mut Session<'_>) -> Result<()> {
    let config = session.config;
    let greet = config.greet_path.as_str();
    let mut client = SessionClient::new(config)?;
    let user = session.generator.user();

    let res = client.post("greet", greet).await?;
    session
        .verifier
        .check("greet before login", &oracle::greeting(), &res);

    let res = client.post_json("register", "/register", &user).await?;
    session.verifier.check("register", &oracle::registered(), &res);

    let res = client
        .post_json("login", "/login", &user.credentials())
        .await?;
    session.verifier.check("login", &oracle::logged_in(), &res);

    let greets = session.generator.range(GREETS.0, GREETS.1);
    debug!(username = %user.username, greets, "logged in");
    let mut counter = Counter::new();
    for _ in 0..greets {
        let res = client.post("greet", greet).await?;
        let count = counter.next();
        session.verifier.check(
            &format!("greet #{}", count),
            &oracle::welcome(&user.username, count),
            &res,
        );
    }

    let res = client
        .post("find user", &format!("/find/{}", user.username))
        .await?;
    session
        .verifier
        .check("find user", &oracle::user_profile(&user), &res);

    let res = client.post("logout", "/logout").await?;
    session.verifier.check("logout", &oracle::logged_out(), &res);

    let res = client.post("greet", greet).await?;
    session
        .verifier
        .check("greet after logout", &oracle::greeting(), &res);

    Ok(())
}
