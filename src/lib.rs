//! # kvcache - An In-Memory Key-Value Cache Speaking RESP
//!
//! kvcache is a small Redis-compatible server: clients talk to it with the
//! RESP wire protocol, keys live in memory with optional millisecond TTLs,
//! and the key space can be bootstrapped from an RDB snapshot file at startup.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                              kvcache                              │
//! │                                                                   │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐            │
//! │  │   Server    │───>│ Connection  │───>│  Command    │            │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │            │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘            │
//! │                            │                  │                   │
//! │                            ▼                  ▼                   │
//! │                     ┌─────────────┐    ┌─────────────────────┐    │
//! │                     │    RESP     │    │   StorageEngine     │    │
//! │                     │   Parser    │    │ RwLock<HashMap<..>> │    │
//! │                     └─────────────┘    └─────────────────────┘    │
//! │                                          ▲              ▲         │
//! │                     ┌────────────────────┘              │         │
//! │                     │                                   │         │
//! │  ┌──────────────────┴──┐                  ┌─────────────┴──────┐  │
//! │  │  Snapshot Decoder   │                  │   ExpirySweeper    │  │
//! │  │  (startup restore)  │                  │ (Background Task)  │  │
//! │  └─────────────────────┘                  └────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use kvcache::{Config, Server, StorageEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = Arc::new(Config::default());
//!     let storage = Arc::new(StorageEngine::new());
//!
//!     if let Ok(Some(snapshot)) = kvcache::snapshot::load_file(&config.snapshot_path()).await {
//!         snapshot.restore_into(&storage);
//!     }
//!
//!     Server::bind(config, storage).await?.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO message`
//! - `SET key value [PX milliseconds]`
//! - `GET key`
//! - `CONFIG GET dir|dbfilename`
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP frame types and the incremental parser
//! - [`storage`]: TTL-aware store and the expiry sweeper
//! - [`snapshot`]: RDB snapshot decoder
//! - [`commands`]: Request dispatch
//! - [`connection`]: Per-client read/execute/reply loop
//! - [`server`]: Listener and accept loop
//! - [`config`]: Command-line configuration
//!
//! ## Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: a read that finds an expired key removes it and reports a miss
//! 2. **Active**: a background task sweeps every expired key on a fixed period

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod snapshot;
pub mod storage;

pub use commands::CommandHandler;
pub use config::{CliAction, Config};
pub use connection::handle_connection;
pub use protocol::{ParseError, RespParser, RespValue};
pub use server::Server;
pub use snapshot::{Snapshot, SnapshotError};
pub use storage::{ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host to bind to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of kvcache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
