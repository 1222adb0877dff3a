//! Connection Handler Module
//!
//! Serves individual client connections. Every accepted connection gets
//! its own async task; all of them share one `StorageEngine` through the
//! `CommandHandler` they are given.
//!
//! ## Example
//!
//! ```ignore
//! use kvcache::connection::handle_connection;
//! use kvcache::commands::CommandHandler;
//!
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler.clone()));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler};
