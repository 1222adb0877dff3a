//! Command Handler Module
//!
//! Turns decoded requests into replies.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌────────┐
//! │ StorageEngine   │     │ Config │
//! └─────────────────┘     └────────┘
//! ```

pub mod handler;

pub use handler::{CommandError, CommandHandler, CommandResult};
