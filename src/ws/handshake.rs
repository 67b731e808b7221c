//! Client side of the WebSocket opening handshake (RFC 6455).

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

use crate::error::WsError;

type Result<T> = std::result::Result<T, WsError>;

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use session_harness::ws::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Random 16-byte nonce, base64 encoded, for `Sec-WebSocket-Key`.
///
/// # Errors
///
/// Returns `WsError::InvalidHandshake` if the OS random source fails.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| WsError::InvalidHandshake(format!("cannot generate key: {}", e)))?;
    Ok(BASE64.encode(nonce))
}

/// Upgrade request sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request path, e.g. `/echo`.
    pub path: String,
    /// `Host` header value.
    pub host: String,
    /// `Sec-WebSocket-Key` nonce.
    pub key: String,
    /// `Cookie` header value binding the connection to an HTTP session.
    pub cookie: Option<String>,
}

impl HandshakeRequest {
    /// Request with a fresh random key.
    ///
    /// # Errors
    ///
    /// Returns `WsError::InvalidHandshake` if the key cannot be generated.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            host: host.into(),
            key: generate_key()?,
            cookie: None,
        })
    }

    /// Attach a `Cookie` header.
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// Serialize the HTTP/1.1 upgrade request.
    ///
    /// # Errors
    ///
    /// Returns `WsError::InvalidHandshake` if a header value contains CR or LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        validate_header_value("path", &self.path)?;
        validate_header_value("Host", &self.host)?;

        buf.extend_from_slice(format!("GET {} HTTP/1.1\r\n", self.path).as_bytes());
        buf.extend_from_slice(format!("Host: {}\r\n", self.host).as_bytes());
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Key: {}\r\n", self.key).as_bytes());
        buf.extend_from_slice(b"Sec-WebSocket-Version: 13\r\n");
        if let Some(ref cookie) = self.cookie {
            validate_header_value("Cookie", cookie)?;
            buf.extend_from_slice(format!("Cookie: {}\r\n", cookie).as_bytes());
        }
        buf.extend_from_slice(b"\r\n");
        Ok(())
    }

    /// Accept value a conforming server must answer with.
    #[must_use]
    pub fn expected_accept(&self) -> String {
        compute_accept_key(&self.key)
    }
}

/// Server answer to the upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
    /// The selected Sec-WebSocket-Protocol (optional).
    pub protocol: Option<String>,
}

impl HandshakeResponse {
    /// Parse the status line and headers of an upgrade response.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::InvalidHandshake`] if:
    /// - The data is not valid UTF-8.
    /// - The status is not `101`.
    /// - `Upgrade`, `Connection` or `Sec-WebSocket-Accept` is missing or wrong.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| WsError::InvalidHandshake("Invalid UTF-8".into()))?;
        let mut lines = text.split("\r\n");

        let status_line = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| WsError::InvalidHandshake("Empty response".into()))?;
        let mut status = status_line.split_whitespace();
        let version = status.next().unwrap_or_default();
        let code = status.next().unwrap_or_default();
        if !version.starts_with("HTTP/1.1") || code != "101" {
            return Err(WsError::InvalidHandshake(format!(
                "Expected 101 status, got: {}",
                status_line
            )));
        }

        let headers = parse_headers(lines);

        let upgrade = headers
            .get("upgrade")
            .ok_or_else(|| WsError::InvalidHandshake("Missing Upgrade header".into()))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(WsError::InvalidHandshake(format!(
                "Invalid Upgrade header: {}",
                upgrade
            )));
        }

        let connection = headers
            .get("connection")
            .ok_or_else(|| WsError::InvalidHandshake("Missing Connection header".into()))?;
        if !connection.to_lowercase().contains("upgrade") {
            return Err(WsError::InvalidHandshake(format!(
                "Invalid Connection header: {}",
                connection
            )));
        }

        let accept = headers
            .get("sec-websocket-accept")
            .ok_or_else(|| WsError::InvalidHandshake("Missing Sec-WebSocket-Accept header".into()))?
            .clone();

        Ok(Self {
            accept,
            protocol: headers.get("sec-websocket-protocol").cloned(),
        })
    }

    /// Check the accept value against the request's key.
    ///
    /// # Errors
    ///
    /// Returns `WsError::InvalidHandshake` on mismatch.
    pub fn verify(&self, request: &HandshakeRequest) -> Result<()> {
        if self.accept != request.expected_accept() {
            return Err(WsError::InvalidHandshake(
                "Invalid Sec-WebSocket-Accept".into(),
            ));
        }
        Ok(())
    }
}

/// Offset just past the `\r\n\r\n` that ends an HTTP header block.
#[must_use]
pub fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }
    headers
}

fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(WsError::InvalidHandshake(format!(
            "{} contains CR or LF characters",
            header_name
        )));
    }
    Ok(())
}
