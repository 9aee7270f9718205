//! Connection Handler
//!
//! Each client connection runs its own loop:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  read bytes from socket      │◄──┐
//! │             │                │   │
//! │             ▼                │   │
//! │  decode one RESP frame       │   │
//! │             │                │   │
//! │             ▼                │   │
//! │  execute command             │   │
//! │             │                │   │
//! │             ▼                │   │
//! │  write + flush reply         │───┘
//! └──────────────────────────────┘
//! ```
//!
//! The reply to one command is flushed before the next read, so commands on a
//! connection never overlap. Each read is decoded as exactly one frame; bytes
//! after that frame are discarded with a warning, and a frame that fails to
//! decode gets a protocol error reply. Either way the loop goes on. The loop
//! ends when the peer closes the connection or an I/O error occurs.

use crate::commands::{CommandError, CommandHandler};
use crate::protocol::{RespParser, RespValue};
use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Read buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Handles a single client connection.
pub struct ConnectionHandler<S> {
    /// The client stream
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes from the most recent read
    buffer: BytesMut,

    /// The command handler (shared storage behind it)
    command_handler: CommandHandler,

    parser: RespParser,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, addr: SocketAddr, command_handler: CommandHandler) -> Self {
        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: RespParser::new(),
        }
    }

    /// Runs the connection loop until the client disconnects or an I/O error
    /// occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        result
    }

    /// The read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            self.read_frame().await?;

            let response = match self.parser.parse(&self.buffer) {
                Ok((command, consumed)) => {
                    if consumed < self.buffer.len() {
                        warn!(
                            client = %self.addr,
                            discarded = self.buffer.len() - consumed,
                            "Discarding bytes after first frame"
                        );
                    }
                    self.command_handler.execute(command)
                }
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "Parse error");
                    CommandError::from(e).into()
                }
            };

            self.send_response(&response).await?;
        }
    }

    /// Replaces the buffer contents with the next chunk from the socket.
    async fn read_frame(&mut self) -> Result<(), ConnectionError> {
        self.buffer.clear();
        self.buffer.reserve(INITIAL_BUFFER_SIZE);

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(ConnectionError::ClientDisconnected);
        }

        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(())
    }

    /// Sends a response to the client.
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
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client closed its end of the connection
    #[error("Client disconnected")]
    ClientDisconnected,
}

/// Runs a [`ConnectionHandler`] to completion. Errors are already logged by
/// the handler.
pub async fn handle_connection<S>(stream: S, addr: SocketAddr, command_handler: CommandHandler)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler);
    let _ = handler.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::ReplicationInfo;
    use crate::storage::StorageEngine;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_test::io::Builder;

    fn create_command_handler() -> CommandHandler {
        CommandHandler::new(
            Arc::new(StorageEngine::new()),
            Arc::new(ReplicationInfo::with_replid("test")),
        )
    }

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn create_test_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler = create_command_handler();

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, client_addr, handler.clone()));
            }
        });

        addr
    }

    async fn roundtrip(client: &mut TcpStream, request: &[u8]) -> Vec<u8> {
        client.write_all(request).await.unwrap();
        let mut buf = [0u8; 512];
        let n = client.read(&mut buf).await.unwrap();
        buf[..n].to_vec()
    }

    #[tokio::test]
    async fn test_mock_stream_session() {
        let stream = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .read(b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n")
            .write(b"+hey\r\n")
            .build();

        let handler = ConnectionHandler::new(stream, test_addr(), create_command_handler());
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ClientDisconnected)
        ));
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection_open() {
        let stream = Builder::new()
            .read(b"*2\r\n$3\r\nGET\r\n$9\r\nfoo\r\n")
            .write(b"-ERR protocol error: bulk length mismatch: declared 9, got 3\r\n")
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .build();

        let handler = ConnectionHandler::new(stream, test_addr(), create_command_handler());
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ClientDisconnected)
        ));
    }

    #[tokio::test]
    async fn test_second_frame_in_same_read_is_dropped() {
        // Two PINGs arrive in one read: only the first is answered.
        let stream = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .read(b"*2\r\n$4\r\nECHO\r\n$2\r\nok\r\n")
            .write(b"+ok\r\n")
            .build();

        let handler = ConnectionHandler::new(stream, test_addr(), create_command_handler());
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ClientDisconnected)
        ));
    }

    #[tokio::test]
    async fn test_read_error_ends_loop() {
        let stream = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .read_error(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            .build();

        let handler = ConnectionHandler::new(stream, test_addr(), create_command_handler());
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::IoError(_))
        ));
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let addr = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        assert_eq!(roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n").await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_set_get() {
        let addr = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let reply = roundtrip(&mut client, b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n").await;
        assert_eq!(reply, b"+OK\r\n");

        let reply = roundtrip(&mut client, b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").await;
        assert_eq!(reply, b"+bar\r\n");
    }

    #[tokio::test]
    async fn test_px_expiry_over_socket() {
        let addr = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let reply = roundtrip(
            &mut client,
            b"*5\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\nPX\r\n$3\r\n100\r\n",
        )
        .await;
        assert_eq!(reply, b"+OK\r\n");

        tokio::time::sleep(Duration::from_millis(150)).await;

        let reply = roundtrip(&mut client, b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").await;
        assert_eq!(reply, b"$-1\r\n");
    }

    #[tokio::test]
    async fn test_unknown_command_over_socket() {
        let addr = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let reply = roundtrip(&mut client, b"*1\r\n$3\r\nFOO\r\n").await;
        assert_eq!(reply, b"-ERR unknown command 'foo'\r\n");
    }

    #[tokio::test]
    async fn test_clients_share_keyspace() {
        let addr = create_test_server().await;
        let mut writer = TcpStream::connect(addr).await.unwrap();
        let mut reader = TcpStream::connect(addr).await.unwrap();

        let reply = roundtrip(&mut writer, b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n").await;
        assert_eq!(reply, b"+OK\r\n");

        let reply = roundtrip(&mut reader, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n").await;
        assert_eq!(reply, b"+v\r\n");

        // Closing one client leaves the other working.
        drop(writer);
        let reply = roundtrip(&mut reader, b"*1\r\n$4\r\nPING\r\n").await;
        assert_eq!(reply, b"+PONG\r\n");
    }
}
