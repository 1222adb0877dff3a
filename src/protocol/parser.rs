//! RESP Frame Parser
//!
//! This module decodes request frames sent by clients. Only the three types a
//! client ever sends are accepted: simple strings, bulk strings and arrays.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((value, consumed)))` - Decoded one frame, `consumed` bytes were used
//! - `Ok(None)` - The frame is incomplete, more bytes are needed
//! - `Err(ParseError)` - The bytes violate the wire grammar
//!
//! The parser never reads past the end of the buffer. Whether running out of
//! bytes is fatal is the caller's decision: the connection handler keeps
//! reading, and only treats an incomplete frame at end-of-stream as an error.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during frame decoding.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// The first byte is not `+`, `$` or `*`
    #[error("unknown type byte: {0:#04x}")]
    UnknownPrefix(u8),

    /// A CR was not followed by LF, or a bulk payload was not followed by CRLF
    #[error("malformed terminator")]
    MalformedTerminator,

    /// A bulk string length or array count is not a non-negative decimal
    #[error("invalid length: {0:?}")]
    InvalidLength(String),

    /// The frame exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Arrays nested deeper than the parser allows
    #[error("maximum nesting depth exceeded: {0}")]
    TooDeep(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 KB).
///
/// Connections buffer at most one such string plus framing, so a larger
/// declared length is rejected as soon as its header arrives.
pub const MAX_BULK_SIZE: usize = 512 * 1024;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// Upper bound on the capacity reserved up front for an array.
const MAX_PREALLOC: usize = 64;

/// A RESP frame parser.
///
/// # Example
///
/// ```
/// use kvcache::protocol::{RespParser, RespValue};
/// use bytes::Bytes;
///
/// let mut parser = RespParser::new();
/// let (value, consumed) = parser.parse(b"*1\r\n$4\r\nPING\r\n").unwrap().unwrap();
/// assert_eq!(value, RespValue::array(vec![RespValue::bulk_string(Bytes::from("PING"))]));
/// assert_eq!(consumed, 14);
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Current nesting depth (for array parsing)
    depth: usize,
}

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to decode one frame from the start of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep(MAX_NESTING_DEPTH));
        }

        match buf[0] {
            prefix::SIMPLE_STRING => self.parse_simple_string(buf),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// Parses a simple string: `+<string>\r\n`
    fn parse_simple_string(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let end = match read_line(buf, 1)? {
            Some(end) => end,
            None => return Ok(None),
        };

        let content = Bytes::copy_from_slice(&buf[1..end]);
        Ok(Some((RespValue::SimpleString(content), end + 2)))
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let length_end = match read_line(buf, 1)? {
            Some(end) => end,
            None => return Ok(None),
        };

        let length = parse_length(&buf[1..length_end])?;
        if length > MAX_BULK_SIZE {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            });
        }

        let data_start = length_end + 2;
        let total_needed = data_start + length + 2;
        if buf.len() < total_needed {
            return Ok(None);
        }

        if &buf[data_start + length..total_needed] != CRLF {
            return Err(ParseError::MalformedTerminator);
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);
        Ok(Some((RespValue::BulkString(data), total_needed)))
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let count_end = match read_line(buf, 1)? {
            Some(end) => end,
            None => return Ok(None),
        };

        let count = parse_length(&buf[1..count_end])?;

        let mut elements = Vec::with_capacity(count.min(MAX_PREALLOC));
        let mut consumed = count_end + 2;

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, element_consumed)) => {
                    elements.push(value);
                    consumed += element_consumed;
                }
                None => return Ok(None),
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Finds the end of the line starting at `start`.
///
/// Scans for the first CR and requires an LF right after it. Returns the
/// position of the CR, or `None` if the buffer ends first.
fn read_line(buf: &[u8], start: usize) -> ParseResult<Option<usize>> {
    let cr = match buf[start..].iter().position(|&b| b == b'\r') {
        Some(offset) => start + offset,
        None => return Ok(None),
    };

    match buf.get(cr + 1) {
        None => Ok(None),
        Some(b'\n') => Ok(Some(cr)),
        Some(_) => Err(ParseError::MalformedTerminator),
    }
}

/// Parses an ASCII decimal length. Signs are rejected.
fn parse_length(digits: &[u8]) -> ParseResult<usize> {
    let invalid = || ParseError::InvalidLength(String::from_utf8_lossy(digits).into_owned());

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }

    std::str::from_utf8(digits)
        .map_err(|_| invalid())?
        .parse()
        .map_err(|_| invalid())
}

/// Helper function to parse a single RESP message from bytes.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> RespValue {
        RespValue::bulk_string(Bytes::from(s.to_string()))
    }

    #[test]
    fn test_parse_simple_string() {
        let (value, consumed) = parse_message(b"+OK\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::simple_string("OK"));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_simple_string_incomplete() {
        assert!(parse_message(b"+OK").unwrap().is_none());
        assert!(parse_message(b"+OK\r").unwrap().is_none());
    }

    #[test]
    fn test_parse_simple_string_bad_terminator() {
        assert_eq!(
            parse_message(b"+OK\rX"),
            Err(ParseError::MalformedTerminator)
        );
    }

    #[test]
    fn test_parse_bulk_string() {
        let (value, consumed) = parse_message(b"$5\r\nhello\r\n").unwrap().unwrap();
        assert_eq!(value, bulk("hello"));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_parse_empty_bulk_string() {
        let (value, consumed) = parse_message(b"$0\r\n\r\n").unwrap().unwrap();
        assert_eq!(value, bulk(""));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_parse_bulk_string_incomplete() {
        assert!(parse_message(b"$5\r\nhel").unwrap().is_none());
        assert!(parse_message(b"$5\r\nhello").unwrap().is_none());
        assert!(parse_message(b"$12").unwrap().is_none());
    }

    #[test]
    fn test_parse_bulk_string_missing_trailer() {
        assert_eq!(
            parse_message(b"$5\r\nhelloXY"),
            Err(ParseError::MalformedTerminator)
        );
    }

    #[test]
    fn test_parse_bulk_string_invalid_length() {
        assert!(matches!(
            parse_message(b"$abc\r\nhello\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            parse_message(b"$-1\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            parse_message(b"$\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_parse_bulk_string_too_large() {
        let input = format!("${}\r\n", MAX_BULK_SIZE + 1);
        assert_eq!(
            parse_message(input.as_bytes()),
            Err(ParseError::MessageTooLarge {
                size: MAX_BULK_SIZE + 1,
                max: MAX_BULK_SIZE,
            })
        );

        let input = format!("${}\r\n", MAX_BULK_SIZE);
        assert!(parse_message(input.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn test_binary_safe_bulk_string() {
        let (value, _) = parse_message(b"$7\r\nhel\r\n\x00o\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::bulk_string(Bytes::from(&b"hel\r\n\x00o"[..])));
    }

    #[test]
    fn test_parse_array() {
        let input = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(value, RespValue::array(vec![bulk("GET"), bulk("name")]));
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_empty_array() {
        let (value, consumed) = parse_message(b"*0\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::array(vec![]));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_parse_array_multi_digit_count() {
        let mut input = b"*12\r\n".to_vec();
        for i in 0..12 {
            input.extend_from_slice(&bulk(&i.to_string()).serialize());
        }
        let (value, consumed) = parse_message(&input).unwrap().unwrap();
        match value {
            RespValue::Array(items) => {
                assert_eq!(items.len(), 12);
                assert_eq!(items[11], bulk("11"));
            }
            other => panic!("expected array, got {:?}", other),
        }
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_array_incomplete() {
        assert!(parse_message(b"*2\r\n$3\r\nGET\r\n").unwrap().is_none());
        assert!(parse_message(b"*2\r\n$3\r\nGET\r\n$4\r\nna").unwrap().is_none());
    }

    #[test]
    fn test_parse_mixed_array() {
        let input = b"*2\r\n+OK\r\n$5\r\nhello\r\n";
        let (value, _) = parse_message(input).unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::array(vec![RespValue::simple_string("OK"), bulk("hello")])
        );
    }

    #[test]
    fn test_parse_nesting_limit() {
        let input = "*1\r\n".repeat(MAX_NESTING_DEPTH + 2);
        assert_eq!(
            parse_message(input.as_bytes()),
            Err(ParseError::TooDeep(MAX_NESTING_DEPTH))
        );
    }

    #[test]
    fn test_parse_unknown_prefix() {
        assert_eq!(
            parse_message(b"invalid"),
            Err(ParseError::UnknownPrefix(b'i'))
        );
        assert_eq!(
            parse_message(b":1\r\n"),
            Err(ParseError::UnknownPrefix(b':'))
        );
    }

    #[test]
    fn test_parse_stops_after_one_frame() {
        let input = b"+A\r\n+B\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(value, RespValue::simple_string("A"));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_roundtrip() {
        let original = RespValue::array(vec![
            bulk("SET"),
            bulk("key"),
            bulk(""),
            RespValue::simple_string("plain"),
            bulk(&"x".repeat(300)),
        ]);

        let serialized = original.serialize();
        let (parsed, consumed) = parse_message(&serialized).unwrap().unwrap();
        assert_eq!(parsed, original);
        assert_eq!(consumed, serialized.len());
    }
}
