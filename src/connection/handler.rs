//! Connection Handler
//!
//! Each client connection is served by its own task running a
//! read → decode → execute → reply loop until the client disconnects
//! or an error occurs.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │  Decode every complete frame │
//!    │  in the buffer, executing    │
//!    │  each and writing its reply  │
//!    │              │               │
//!    │              ▼               │
//!    │  Read more bytes from socket │
//!    │              │               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. EOF, I/O error, bad frame or failed command
//!        │
//!        ▼
//! 5. Socket dropped, task ends
//! ```
//!
//! ## Buffer Management
//!
//! TCP is a stream: one read may carry half a frame or several frames.
//! Incoming bytes accumulate in a `BytesMut` and frames are cut off the
//! front as they complete, so both cases are handled. Replies are written
//! in request order.

use crate::commands::{CommandError, CommandHandler};
use crate::protocol::parser::MAX_BULK_SIZE;
use crate::protocol::{ParseError, RespParser, RespValue};
use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, trace, warn};

/// Maximum size for the read buffer: one maximal bulk string plus room for
/// the rest of its request.
const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Serves one client over any byte stream.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    buffer: BytesMut,

    command_handler: CommandHandler,

    parser: RespParser,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    pub fn new(stream: S, addr: SocketAddr, command_handler: CommandHandler) -> Self {
        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: RespParser::new(),
        }
    }

    /// Runs the connection loop to completion.
    ///
    /// Returns `Ok(())` when the client closes the connection between requests.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Closing connection"),
        }

        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(request) = self.try_parse_frame()? {
                trace!(client = %self.addr, request = %request, "Executing request");
                let response = self.command_handler.execute(request)?;
                self.send_response(&response).await?;
            }

            if !self.read_more_data().await? {
                return Ok(());
            }
        }
    }

    /// Cuts one complete frame off the front of the buffer, if there is one.
    fn try_parse_frame(&mut self) -> Result<Option<RespValue>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer)? {
            Some((value, consumed)) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed frame"
                );
                Ok(Some(value))
            }
            None => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete frame, need more data"
                );
                Ok(None)
            }
        }
    }

    /// Reads more bytes into the buffer. Returns `false` on a clean EOF.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return if self.buffer.is_empty() {
                Ok(false)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }

        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(true)
    }

    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        trace!(client = %self.addr, bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The client sent bytes that violate the wire grammar
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// The request decoded but could not be executed
    #[error("Command error: {0}")]
    CommandError(#[from] CommandError),

    /// Client closed the stream in the middle of a frame
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Serves a client connection until it ends.
///
/// Errors are logged by [`ConnectionHandler::run`]; they never propagate
/// beyond this connection.
pub async fn handle_connection<S>(stream: S, addr: SocketAddr, command_handler: CommandHandler)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _ = ConnectionHandler::new(stream, addr, command_handler)
        .run()
        .await;
}
