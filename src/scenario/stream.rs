//! Streaming echo over a persistent connection.
//!
//! A few counted `/send` calls establish an HTTP session; a WebSocket opened
//! with the same session cookie must first report how many sends that
//! session made, then echo every message verbatim.

use serde_json::json;
use tokio::time::timeout;
use tracing::debug;

use crate::client::SessionClient;
use crate::error::{HarnessError, Result};
use crate::generator::identifier;
use crate::oracle::{self, Counter};
use crate::scenario::Session;
use crate::ws::{self, WsConnection};

/// Bounds of the number of `/send` calls before upgrading.
pub const SENDS: (usize, usize) = (1, 5);

/// Bounds of the number of WebSocket round trips.
pub const ROUND_TRIPS: (usize, usize) = (5, 10);

/// Path of the persistent echo endpoint.
pub const WS_PATH: &str = "/echo";

pub async fn run(session: &mut Session<'_>) -> Result<()> {
    let config = session.config;
    let mut client = SessionClient::new(config)?;

    let sends = session.generator.range(SENDS.0, SENDS.1);
    let mut counter = Counter::new();
    for _ in 0..sends {
        let id = identifier();
        let res = client.post_json("send", "/send", &json!({ "id": id })).await?;
        let count = counter.next();
        session.verifier.check(
            &format!("send #{}", count),
            &oracle::sent(count, &id),
            &res,
        );
    }

    if client.cookie(&config.session_cookie).is_none() {
        return Err(HarnessError::MissingSession(config.session_cookie.clone()));
    }
    let cookies = client.cookie_header(WS_PATH);

    let mut conn = ws::connect(
        &config.authority(),
        WS_PATH,
        cookies.as_deref(),
        &config.timeouts,
    )
    .await?;

    let first = receive(&mut conn, config.timeouts.request).await?;
    session.verifier.check(
        "initial websocket count",
        &Some(counter.current()),
        &first.trim().parse::<u64>().ok(),
    );

    let round_trips = session.generator.range(ROUND_TRIPS.0, ROUND_TRIPS.1);
    debug!(sends, round_trips, "websocket phase");
    for round in 1..=round_trips {
        let message = identifier();
        conn.send_text(&message).await?;
        let reply = receive(&mut conn, config.timeouts.request).await?;
        session
            .verifier
            .check(&format!("websocket echo #{}", round), &message, &reply);
    }

    timeout(config.timeouts.request, conn.shutdown())
        .await
        .map_err(|_| HarnessError::Timeout("websocket close"))??;
    Ok(())
}

async fn receive(
    conn: &mut WsConnection<tokio::net::TcpStream>,
    limit: std::time::Duration,
) -> Result<String> {
    let text = timeout(limit, conn.recv_text())
        .await
        .map_err(|_| HarnessError::Timeout("websocket receive"))??;
    Ok(text)
}
