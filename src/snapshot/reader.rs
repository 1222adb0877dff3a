//! Cursor over a snapshot buffer and the length-encoded field format.
//!
//! Every key and value in a snapshot is a length-encoded field. The two high
//! bits of its first byte select how the rest is laid out:
//!
//! | bits | layout                                                  |
//! |------|---------------------------------------------------------|
//! | `00` | low 6 bits are the length, payload follows              |
//! | `01` | low 6 bits + next byte form a 14-bit BE length          |
//! | `10` | low 6 bits ignored, next 4 bytes are a 32-bit BE length |
//! | `11` | low 6 bits pick an integer width: 0 → 1, 1 → 2, 2 → 4 bytes |

use super::length_encoding::{FOURTEEN_BITS, FOUR_BYTES, INT16, INT32, INT8, SIX_BITS, SPECIAL};
use super::SnapshotError;
use bytes::Bytes;

/// A decoded length-encoded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthEncodedValue {
    /// Raw bytes.
    Literal(Bytes),
    /// A big-endian unsigned integer of 1, 2 or 4 bytes.
    Integer(u32),
}

impl LengthEncodedValue {
    /// Renders the field as text: integers in decimal, literals as (lossy) UTF-8.
    pub fn to_text(&self) -> String {
        match self {
            LengthEncodedValue::Literal(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            LengthEncodedValue::Integer(n) => n.to_string(),
        }
    }

    /// Converts the field to bytes, rendering integers in decimal.
    pub fn into_bytes(self) -> Bytes {
        match self {
            LengthEncodedValue::Literal(bytes) => bytes,
            LengthEncodedValue::Integer(n) => Bytes::from(n.to_string()),
        }
    }
}

/// A forward cursor over a complete snapshot buffer.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, SnapshotError> {
        Ok(self.read_exact(1)?[0])
    }

    /// Steps back over the last byte read.
    pub fn unread(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], SnapshotError> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(SnapshotError::UnexpectedEof {
                offset: self.pos,
                needed: n - remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u32_be(&mut self) -> Result<u32, SnapshotError> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.read_exact(4)?);
        Ok(u32::from_be_bytes(word))
    }

    pub fn read_u64_be(&mut self) -> Result<u64, SnapshotError> {
        let mut word = [0u8; 8];
        word.copy_from_slice(self.read_exact(8)?);
        Ok(u64::from_be_bytes(word))
    }

    /// Reads a length-encoded string or integer field.
    pub fn read_length_encoded(&mut self) -> Result<LengthEncodedValue, SnapshotError> {
        let first = self.read_u8()?;
        match first >> 6 {
            SPECIAL => self.read_special(first & 0x3F),
            _ => {
                let len = self.read_length_after(first)?;
                let payload = self.read_exact(len)?;
                Ok(LengthEncodedValue::Literal(Bytes::copy_from_slice(payload)))
            }
        }
    }

    /// Reads a bare length (no payload), as used by the size hints.
    pub fn read_length(&mut self) -> Result<usize, SnapshotError> {
        let first = self.read_u8()?;
        if first >> 6 == SPECIAL {
            return Err(SnapshotError::UnsupportedEncoding(first & 0x3F));
        }
        self.read_length_after(first)
    }

    fn read_length_after(&mut self, first: u8) -> Result<usize, SnapshotError> {
        match first >> 6 {
            SIX_BITS => Ok((first & 0x3F) as usize),
            FOURTEEN_BITS => {
                let low = self.read_u8()?;
                Ok(u16::from_be_bytes([first & 0x3F, low]) as usize)
            }
            FOUR_BYTES => Ok(self.read_u32_be()? as usize),
            _ => Err(SnapshotError::UnsupportedEncoding(first & 0x3F)),
        }
    }

    fn read_special(&mut self, format: u8) -> Result<LengthEncodedValue, SnapshotError> {
        let width = match format {
            INT8 => 1,
            INT16 => 2,
            INT32 => 4,
            other => return Err(SnapshotError::UnsupportedEncoding(other)),
        };

        // Left-pad to four bytes, then read as one big-endian word
        let mut word = [0u8; 4];
        word[4 - width..].copy_from_slice(self.read_exact(width)?);
        Ok(LengthEncodedValue::Integer(u32::from_be_bytes(word)))
    }
}
