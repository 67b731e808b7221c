//! Server side of the `/echo` WebSocket, upgraded through hyper.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::{CONNECTION, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, UPGRADE};
use axum::response::{IntoResponse, Response};
use hyper_util::rt::TokioIo;

use session_harness::ws::{Message, Role, WsConnection, compute_accept_key};

use super::service::{AppState, Fault, session_id};

/// Accept the upgrade, push the session's send count, then echo every text
/// message until the client closes.
pub(super) async fn upgrade(State(state): State<AppState>, mut req: Request) -> Response {
    let Some(key) = req
        .headers()
        .get(SEC_WEBSOCKET_KEY)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut sends = session_id(req.headers())
        .and_then(|id| {
            let store = state.store.lock().unwrap();
            store.sessions.get(&id).map(|session| session.sends)
        })
        .unwrap_or(0);
    if state.fault == Fault::WebSocketCountOffByOne {
        sends += 1;
    }

    let on_upgrade = hyper::upgrade::on(&mut req);
    tokio::spawn(async move {
        let Ok(upgraded) = on_upgrade.await else {
            return;
        };
        let mut conn = WsConnection::new(TokioIo::new(upgraded), Role::Server);
        if conn.send_text(&sends.to_string()).await.is_err() {
            return;
        }
        while let Ok(Some(message)) = conn.recv().await {
            if let Message::Text(text) = message {
                if conn.send_text(&text).await.is_err() {
                    break;
                }
            }
        }
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(UPGRADE, "websocket")
        .header(CONNECTION, "Upgrade")
        .header(SEC_WEBSOCKET_ACCEPT, compute_accept_key(&key))
        .body(Body::empty())
        .unwrap()
}
