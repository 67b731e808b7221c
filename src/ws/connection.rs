use bytes::{Buf, BytesMut};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WsError;
use crate::ws::frame::{Frame, OpCode};

type Result<T> = std::result::Result<T, WsError>;

/// Maximum size of a reassembled message (64 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

const READ_CHUNK: usize = 8192;

/// Which end of the connection we are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    /// Clients mask every frame they send; servers never do.
    #[inline]
    #[must_use]
    pub const fn must_mask(self) -> bool {
        matches!(self, Role::Client)
    }
}

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

/// A complete WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// Close frame with its status code, if one was sent.
    Close(Option<u16>),
}

impl Message {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(text.into())
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Frame::text(text),
            Message::Binary(data) => Frame::binary(data),
            Message::Ping(data) => Frame::new(true, OpCode::Ping, data),
            Message::Pong(data) => Frame::pong(data),
            Message::Close(code) => Frame::close(code, ""),
        }
    }
}

/// Message-level WebSocket connection over an async byte stream.
///
/// Pings are answered with pongs, fragments are reassembled and a peer close
/// is acknowledged. The connection does not perform the HTTP upgrade; see
/// [`connect`](crate::ws::connect) for the client flow.
pub struct WsConnection<T> {
    io: T,
    role: Role,
    state: ConnectionState,
    read_buf: BytesMut,
    write_buf: BytesMut,
    max_message_size: usize,
    partial: Option<(OpCode, Vec<u8>)>,
    mask_rng: SmallRng,
}

impl<T> WsConnection<T> {
    pub fn new(io: T, role: Role) -> Self {
        Self::with_buffered(io, role, BytesMut::new())
    }

    /// Connection whose first bytes were already read past the handshake.
    pub fn with_buffered(io: T, role: Role, buffered: BytesMut) -> Self {
        Self {
            io,
            role,
            state: ConnectionState::Open,
            read_buf: buffered,
            write_buf: BytesMut::with_capacity(READ_CHUNK),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            partial: None,
            mask_rng: SmallRng::from_entropy(),
        }
    }

    /// Set the largest message accepted from the peer.
    #[must_use]
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn into_inner(self) -> T {
        self.io
    }

    fn generate_mask(&mut self) -> [u8; 4] {
        let mut mask = [0u8; 4];
        self.mask_rng.fill(&mut mask);
        mask
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> WsConnection<T> {
    /// Send one message as a single frame.
    ///
    /// # Errors
    ///
    /// - `WsError::ConnectionClosed` if a close has been sent or received
    /// - I/O errors from the underlying stream
    pub async fn send(&mut self, message: Message) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Err(WsError::ConnectionClosed(None));
        }
        self.write_frame(&Frame::from(message)).await
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.send(Message::text(text)).await
    }

    /// Receive the next message.
    ///
    /// Returns `Ok(None)` once the connection is closed.
    ///
    /// # Errors
    ///
    /// Protocol errors (bad frame, masking violation, invalid UTF-8, oversized
    /// message) and I/O errors from the underlying stream.
    pub async fn recv(&mut self) -> Result<Option<Message>> {
        if self.state == ConnectionState::Closed {
            return Ok(None);
        }

        loop {
            let frame = match self.read_frame().await {
                Ok(frame) => frame,
                Err(WsError::ConnectionClosed(_)) => {
                    self.state = ConnectionState::Closed;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            frame.validate()?;

            match frame.opcode {
                OpCode::Ping => {
                    if self.state == ConnectionState::Open {
                        self.write_frame(&Frame::pong(frame.payload())).await?;
                    }
                    return Ok(Some(Message::Ping(frame.into_payload())));
                }
                OpCode::Pong => return Ok(Some(Message::Pong(frame.into_payload()))),
                OpCode::Close => {
                    let code = frame.close_code();
                    if self.state == ConnectionState::Open {
                        let _ = self.write_frame(&Frame::close(code, "")).await;
                    }
                    self.state = ConnectionState::Closed;
                    return Ok(Some(Message::Close(code)));
                }
                OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                    if let Some((opcode, payload)) = self.assemble(frame)? {
                        return Ok(Some(into_data_message(opcode, payload)?));
                    }
                }
            }
        }
    }

    /// Receive the next data message as text, skipping pings and pongs.
    ///
    /// # Errors
    ///
    /// `WsError::ConnectionClosed` if the peer closes first, `WsError::InvalidUtf8`
    /// for a non-UTF-8 binary message, plus everything [`recv`](Self::recv) returns.
    pub async fn recv_text(&mut self) -> Result<String> {
        loop {
            match self.recv().await? {
                Some(Message::Text(text)) => return Ok(text),
                Some(Message::Binary(data)) => {
                    return String::from_utf8(data).map_err(|_| WsError::InvalidUtf8);
                }
                Some(Message::Ping(_)) | Some(Message::Pong(_)) => {}
                Some(Message::Close(code)) => return Err(WsError::ConnectionClosed(code)),
                None => return Err(WsError::ConnectionClosed(None)),
            }
        }
    }

    /// Start the close handshake with a normal (1000) status.
    ///
    /// Does nothing if the connection is no longer open.
    pub async fn close(&mut self) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Ok(());
        }
        self.state = ConnectionState::Closing;
        self.write_frame(&Frame::close(Some(1000), "")).await
    }

    /// Close and wait for the peer's acknowledgement, discarding late messages.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.close().await?;
        while self.state != ConnectionState::Closed {
            if self.recv().await?.is_none() {
                break;
            }
        }
        Ok(())
    }

    fn assemble(&mut self, frame: Frame) -> Result<Option<(OpCode, Vec<u8>)>> {
        let fin = frame.fin;
        match (frame.opcode, self.partial.take()) {
            (OpCode::Continuation, None) => {
                return Err(WsError::ProtocolViolation(
                    "continuation frame without a message in progress".into(),
                ));
            }
            (OpCode::Continuation, Some((opcode, mut payload))) => {
                payload.extend_from_slice(frame.payload());
                self.check_size(payload.len())?;
                self.partial = Some((opcode, payload));
            }
            (_, Some(_)) => {
                return Err(WsError::ProtocolViolation(
                    "new data frame while a fragmented message is in progress".into(),
                ));
            }
            (opcode, None) => {
                self.check_size(frame.payload().len())?;
                self.partial = Some((opcode, frame.into_payload()));
            }
        }

        if fin { Ok(self.partial.take()) } else { Ok(None) }
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_message_size {
            return Err(WsError::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match Frame::parse(&self.read_buf) {
                Ok((frame, consumed)) => {
                    self.read_buf.advance(consumed);
                    self.check_masking(&frame)?;
                    return Ok(frame);
                }
                Err(WsError::IncompleteFrame { needed }) => {
                    self.check_size(self.read_buf.len().saturating_add(needed).saturating_sub(14))?;
                }
                Err(e) => return Err(e),
            }

            self.read_buf.reserve(READ_CHUNK);
            let n = self.io.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(WsError::ConnectionClosed(None));
            }
        }
    }

    fn check_masking(&self, frame: &Frame) -> Result<()> {
        match (self.role, frame.masked) {
            (Role::Client, true) => Err(WsError::MaskedServerFrame),
            (Role::Server, false) => Err(WsError::ProtocolViolation(
                "client frame must be masked".into(),
            )),
            _ => Ok(()),
        }
    }

    async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let mask = if self.role.must_mask() {
            Some(self.generate_mask())
        } else {
            None
        };
        self.write_buf.clear();
        frame.write(&mut self.write_buf, mask);
        self.io.write_all(&self.write_buf).await?;
        self.io.flush().await?;
        Ok(())
    }
}

fn into_data_message(opcode: OpCode, payload: Vec<u8>) -> Result<Message> {
    match opcode {
        OpCode::Text => String::from_utf8(payload)
            .map(Message::Text)
            .map_err(|_| WsError::InvalidUtf8),
        OpCode::Binary => Ok(Message::Binary(payload)),
        _ => Err(WsError::ProtocolViolation("Unexpected opcode".into())),
    }
}
