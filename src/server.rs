//! TCP server
//!
//! Owns the listener and the background sweeper. Every accepted socket is
//! handed to its own task; a failed accept is logged and the loop goes on.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::handle_connection;
use crate::storage::{ExpiryConfig, ExpirySweeper, StorageEngine};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Pause after a failed accept, so a persistent error such as running out of
/// file descriptors does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A bound, not yet running, server.
pub struct Server {
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    config: Arc<Config>,
    expiry: ExpiryConfig,
}

impl Server {
    /// Binds to `config.bind_address()`.
    pub async fn bind(config: Arc<Config>, storage: Arc<StorageEngine>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!(address = %listener.local_addr()?, "Listening");

        Ok(Self {
            listener,
            storage,
            config,
            expiry: ExpiryConfig::default(),
        })
    }

    /// Overrides the sweep schedule.
    pub fn with_expiry(mut self, expiry: ExpiryConfig) -> Self {
        self.expiry = expiry;
        self
    }

    /// The address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever.
    ///
    /// The sweeper lives as long as this future; dropping the future
    /// stops it.
    pub async fn run(self) {
        let _sweeper = ExpirySweeper::start(Arc::clone(&self.storage), self.expiry);
        let handler = CommandHandler::new(self.storage, self.config);

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, addr, handler).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn spawn_server(storage: Arc<StorageEngine>) -> SocketAddr {
        spawn_server_with_expiry(storage, ExpiryConfig::default()).await
    }

    async fn spawn_server_with_expiry(
        storage: Arc<StorageEngine>,
        expiry: ExpiryConfig,
    ) -> SocketAddr {
        let config = Arc::new(Config {
            port: 0,
            ..Config::default()
        });
        let server = Server::bind(config, storage)
            .await
            .unwrap()
            .with_expiry(expiry);
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    async fn roundtrip(stream: &mut TcpStream, request: &[u8], expected: &[u8]) {
        stream.write_all(request).await.unwrap();
        let mut buf = vec![0u8; expected.len()];
        tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(buf, expected);
    }

    #[tokio::test]
    async fn test_ping_over_tcp() {
        let addr = spawn_server(Arc::new(StorageEngine::new())).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        roundtrip(&mut client, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
        roundtrip(&mut client, b"*1\r\n$4\r\nping\r\n", b"+PONG\r\n").await;
    }

    #[tokio::test]
    async fn test_clients_share_store() {
        let storage = Arc::new(StorageEngine::new());
        let addr = spawn_server(Arc::clone(&storage)).await;

        let mut writer = TcpStream::connect(addr).await.unwrap();
        roundtrip(
            &mut writer,
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n",
            b"+OK\r\n",
        )
        .await;

        let mut reader = TcpStream::connect(addr).await.unwrap();
        roundtrip(&mut reader, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n", b"$1\r\nv\r\n").await;

        assert_eq!(storage.get(b"k"), Some(Bytes::from("v")));
    }

    #[tokio::test]
    async fn test_config_get_over_tcp() {
        let addr = spawn_server(Arc::new(StorageEngine::new())).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        roundtrip(
            &mut client,
            b"*3\r\n$6\r\nCONFIG\r\n$3\r\nGET\r\n$10\r\ndbfilename\r\n",
            b"*2\r\n$10\r\ndbfilename\r\n$8\r\ndump.rdb\r\n",
        )
        .await;
    }

    #[tokio::test]
    async fn test_malformed_input_closes_only_that_connection() {
        let addr = spawn_server(Arc::new(StorageEngine::new())).await;

        let mut bad = TcpStream::connect(addr).await.unwrap();
        bad.write_all(b"invalid").await.unwrap();
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(5), bad.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);

        let mut good = TcpStream::connect(addr).await.unwrap();
        roundtrip(&mut good, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
    }

    #[tokio::test]
    async fn test_running_server_sweeps_expired_keys() {
        let storage = Arc::new(StorageEngine::new());
        let expiry = ExpiryConfig {
            interval: Duration::from_millis(10),
        };
        let addr = spawn_server_with_expiry(Arc::clone(&storage), expiry).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        roundtrip(
            &mut client,
            b"*5\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$2\r\nPX\r\n$1\r\n5\r\n",
            b"+OK\r\n",
        )
        .await;

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Removed by the sweep alone: nothing read the key
        assert_eq!(storage.len(), 0);
    }
}
