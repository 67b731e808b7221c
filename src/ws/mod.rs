//! Minimal RFC 6455 WebSocket transport.
//!
//! Only what the persistent-connection scenario needs: a masked client, an
//! upgrade request that carries the HTTP session cookie, and message-level
//! send/receive. Extensions, subprotocols and TLS are not supported.

pub mod connection;
pub mod frame;
pub mod handshake;

pub use connection::{ConnectionState, Message, Role, WsConnection};
pub use frame::{Frame, OpCode, apply_mask};
pub use handshake::{HandshakeRequest, HandshakeResponse, compute_accept_key, header_end};

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::config::Timeouts;
use crate::error::{HarnessError, Result, WsError};

/// Maximum size of the upgrade response headers.
pub const MAX_HANDSHAKE_SIZE: usize = 8192;

/// Open a client connection to `ws://<authority><path>`.
///
/// `cookie` is sent verbatim as the `Cookie` header so the service can bind
/// the connection to an existing HTTP session.
///
/// # Errors
///
/// [`HarnessError::Timeout`] if connecting or the upgrade takes too long,
/// [`HarnessError::Io`] if the TCP connection fails, and
/// [`HarnessError::WebSocket`] if the service rejects the upgrade.
pub async fn connect(
    authority: &str,
    path: &str,
    cookie: Option<&str>,
    timeouts: &Timeouts,
) -> Result<WsConnection<TcpStream>> {
    let mut stream = timeout(timeouts.connect, TcpStream::connect(authority))
        .await
        .map_err(|_| HarnessError::Timeout("websocket connect"))??;
    stream.set_nodelay(true)?;

    let mut request = HandshakeRequest::new(authority, path)?;
    if let Some(cookie) = cookie {
        request = request.with_cookie(cookie);
    }

    let leftover = timeout(timeouts.handshake, upgrade(&mut stream, &request))
        .await
        .map_err(|_| HarnessError::Timeout("websocket handshake"))??;
    debug!(path, buffered = leftover.len(), "websocket upgraded");

    Ok(WsConnection::with_buffered(stream, Role::Client, leftover))
}

/// Send the upgrade request and validate the response.
///
/// Returns any bytes that arrived after the response headers; the service may
/// push its first message immediately after `101`.
async fn upgrade(
    stream: &mut TcpStream,
    request: &HandshakeRequest,
) -> std::result::Result<BytesMut, WsError> {
    let mut raw = Vec::new();
    request.write(&mut raw)?;
    stream.write_all(&raw).await?;

    let mut buf = BytesMut::with_capacity(1024);
    let end = loop {
        if let Some(end) = header_end(&buf) {
            break end;
        }
        if buf.len() > MAX_HANDSHAKE_SIZE {
            return Err(WsError::HandshakeTooLarge {
                size: buf.len(),
                max: MAX_HANDSHAKE_SIZE,
            });
        }
        if stream.read_buf(&mut buf).await? == 0 {
            return Err(WsError::InvalidHandshake(
                "connection closed during handshake".into(),
            ));
        }
    };

    let response = HandshakeResponse::parse(&buf[..end])?;
    response.verify(request)?;

    Ok(buf.split_off(end))
}
