//! RDB Snapshot Decoder
//!
//! Reads a point-in-time dump in the Redis RDB format so the store can be
//! bootstrapped from it at startup. Decoding is read-only and best-effort:
//! only plain string key/value records are understood, and the trailing
//! checksum is not verified.
//!
//! ## File Layout
//!
//! ```text
//! "REDIS" | 4-byte ASCII version | record* | 0xFF | checksum
//!
//! record := 0xFA <string key> <string value>          auxiliary field
//!         | 0xFE <db index byte> db-record*           database section
//!
//! db-record := 0xFB <length> <length>                 hash table size hints
//!            | 0xFC <u64 BE ms>  <type> <key> <value> expiring pair
//!            | 0xFD <u32 BE sec> <type> <key> <value> expiring pair
//!            | <type> <key> <value>                   plain pair
//! ```
//!
//! ## Example
//!
//! ```
//! use kvcache::snapshot::decode;
//!
//! let mut file = b"REDIS0011".to_vec();
//! file.extend_from_slice(&[0xFA, 3, b'a', b'b', b'c', 3, b'x', b'y', b'z', 0xFF]);
//!
//! let snapshot = decode(&file).unwrap();
//! let map = snapshot.to_map();
//! assert_eq!(map["rdbFileStart"], "REDIS0011");
//! assert_eq!(map["abc"], "xyz");
//! ```

pub mod decoder;
pub mod reader;

pub use decoder::{
    decode, load_file, Database, Snapshot, SnapshotEntry, SnapshotExpiry, SnapshotResult,
};
pub use reader::{ByteReader, LengthEncodedValue};

use thiserror::Error;

/// The magic bytes every snapshot starts with.
pub const SIGNATURE: &[u8; 5] = b"REDIS";

/// Highest format version this decoder accepts.
pub const MAX_VERSION: u32 = 12;

/// Metadata key holding the signature and version, e.g. `REDIS0011`.
pub const FILE_START_KEY: &str = "rdbFileStart";

/// Record opcodes.
pub mod op_code {
    pub const AUX: u8 = 0xFA;
    pub const RESIZEDB: u8 = 0xFB;
    pub const EXPIRETIME_MS: u8 = 0xFC;
    pub const EXPIRETIME: u8 = 0xFD;
    pub const SELECTDB: u8 = 0xFE;
    pub const EOF: u8 = 0xFF;
}

/// Value type tags for key/value records.
pub mod value_type {
    pub const STRING: u8 = 0;
}

/// The two high bits of a length-encoded field's first byte.
pub mod length_encoding {
    pub const SIX_BITS: u8 = 0b00;
    pub const FOURTEEN_BITS: u8 = 0b01;
    pub const FOUR_BYTES: u8 = 0b10;
    pub const SPECIAL: u8 = 0b11;

    /// Sub-formats selected by the low six bits of a `SPECIAL` field.
    pub const INT8: u8 = 0;
    pub const INT16: u8 = 1;
    pub const INT32: u8 = 2;
}

/// Errors that can occur while reading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("bad signature: {0:?}")]
    BadSignature(String),

    #[error("unsupported version: {0:?}")]
    UnsupportedVersion(String),

    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),

    /// A special-format field with a sub-format other than 8/16/32-bit integer
    /// (LZF-compressed strings included)
    #[error("unsupported special encoding: {0}")]
    UnsupportedEncoding(u8),

    #[error("unsupported value type: {0}")]
    UnsupportedValueType(u8),

    #[error("unexpected end of snapshot at offset {offset}: needed {needed} more bytes")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
