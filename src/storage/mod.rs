//! Storage Engine Module
//!
//! The live key space: a TTL-aware map behind a single reader/writer lock,
//! and the background task that sweeps expired entries out of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │           StorageEngine             │
//! │   RwLock<HashMap<Bytes, Entry>>     │
//! └─────────────────────────────────────┘
//!                   ▲
//!                   │ cleanup_expired()
//!     ┌─────────────┴─────────────┐
//!     │      ExpirySweeper        │
//!     │  (Background Tokio Task)  │
//!     └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use kvcache::storage::StorageEngine;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//! engine.set(Bytes::from("name"), Bytes::from("Ariz"), None);
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("Ariz")));
//!
//! engine.set(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Some(Duration::from_secs(3600)),
//! );
//! ```

pub mod engine;
pub mod expiry;

pub use engine::{Entry, StorageEngine};
pub use expiry::{ExpiryConfig, ExpirySweeper, DEFAULT_SWEEP_INTERVAL};
