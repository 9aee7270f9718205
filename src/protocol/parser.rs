//! Line-Oriented RESP Decoder
//!
//! Incoming buffers are split on `\r\n` into segments and a single value is
//! decoded from the front of that segment list:
//!
//! - `$<len>` introduces a bulk string; the next segment is its payload and
//!   must be exactly `len` bytes long.
//! - `*<count>` introduces an array of `count` values, each decoded by the
//!   same rule.
//!
//! Because payloads are found by splitting on the separator, a payload that
//! itself contains `\r\n` cannot be decoded. Only the first complete value is
//! decoded; [`RespParser::parse`] reports how many bytes it covered so the
//! connection layer can tell when a read carried more than one command.
//!
//! A structurally short input never yields a partial value: the decoder
//! either returns a complete value or a [`ParseError`].

use crate::protocol::types::{prefix, RespValue};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer (or its first segment) is empty
    #[error("empty input")]
    EmptyInput,

    /// The segment does not start with `$` or `*`
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// A length or count field is not a non-negative integer
    #[error("invalid length: {0:?}")]
    InvalidLength(String),

    /// A bulk payload does not have the declared length
    #[error("bulk length mismatch: declared {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The input ended before the declared elements were present
    #[error("truncated input")]
    Truncated,

    /// Arrays nested deeper than [`MAX_NESTING_DEPTH`]
    #[error("maximum nesting depth exceeded: {MAX_NESTING_DEPTH}")]
    NestingTooDeep,
}

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// A RESP decoder over `\r\n`-separated segments.
///
/// # Example
///
/// ```
/// use quillkv::protocol::{RespParser, RespValue};
/// use bytes::Bytes;
///
/// let mut parser = RespParser::new();
/// let (value, consumed) = parser.parse(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").unwrap();
/// assert_eq!(consumed, 22);
/// assert_eq!(
///     value,
///     RespValue::array(vec![
///         RespValue::bulk_string(Bytes::from("GET")),
///         RespValue::bulk_string(Bytes::from("foo")),
///     ])
/// );
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

    /// Decodes the first value in `buf`.
    ///
    /// Returns the value and the number of bytes it spans, including the
    /// separator after its last segment when present. Bytes past that point
    /// belong to later frames and are not looked at.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<(RespValue, usize)> {
        self.depth = 0;
        let segments = split_segments(buf);
        let mut cursor = 0;
        let value = self.parse_value(&segments, &mut cursor)?;

        let consumed: usize = segments[..cursor].iter().map(|s| s.len() + 2).sum();
        Ok((value, consumed.min(buf.len())))
    }

    /// Decodes one value starting at `segments[*cursor]`, advancing the cursor
    /// past every segment it consumes.
    fn parse_value(&mut self, segments: &[&[u8]], cursor: &mut usize) -> ParseResult<RespValue> {
        let header = match segments.get(*cursor) {
            Some(header) if !header.is_empty() => *header,
            _ if self.depth == 0 => return Err(ParseError::EmptyInput),
            _ => return Err(ParseError::Truncated),
        };

        match header[0] {
            prefix::BULK_STRING => self.parse_bulk_string(segments, cursor),
            prefix::ARRAY => self.parse_array(segments, cursor),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// Parses a bulk string: `$<length>` followed by a payload segment.
    fn parse_bulk_string(
        &mut self,
        segments: &[&[u8]],
        cursor: &mut usize,
    ) -> ParseResult<RespValue> {
        let length = parse_length(&segments[*cursor][1..])?;

        let payload = segments.get(*cursor + 1).ok_or(ParseError::Truncated)?;
        if payload.len() != length {
            return Err(ParseError::LengthMismatch {
                expected: length,
                actual: payload.len(),
            });
        }

        *cursor += 2;
        Ok(RespValue::BulkString(Bytes::copy_from_slice(payload)))
    }

    /// Parses an array: `*<count>` followed by `count` encoded values.
    fn parse_array(&mut self, segments: &[&[u8]], cursor: &mut usize) -> ParseResult<RespValue> {
        let header = segments[*cursor];
        if header.len() < 2 {
            return Err(ParseError::InvalidLength(String::new()));
        }
        let count = parse_length(&header[1..])?;

        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep);
        }

        *cursor += 1;

        // A count larger than the remaining segments is rejected below; cap the
        // allocation so a bogus header cannot reserve unbounded memory.
        let remaining = segments.len().saturating_sub(*cursor);
        let mut elements = Vec::with_capacity(count.min(remaining));
        for _ in 0..count {
            elements.push(self.parse_value(segments, cursor)?);
        }

        self.depth -= 1;
        Ok(RespValue::Array(elements))
    }
}

/// Parses a decimal, non-negative length field.
fn parse_length(field: &[u8]) -> ParseResult<usize> {
    let invalid = || ParseError::InvalidLength(String::from_utf8_lossy(field).into_owned());

    // `usize::from_str` also takes a leading `+`; lengths are plain digits.
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(field)
        .ok()
        .and_then(|text| text.parse::<usize>().ok())
        .ok_or_else(invalid)
}

/// Splits the buffer on every CRLF. The text after the last separator is kept
/// as a final (possibly empty) segment.
fn split_segments(buf: &[u8]) -> Vec<&[u8]> {
    let mut segments = Vec::new();
    let mut start = 0;
    while let Some(pos) = find_crlf(&buf[start..]) {
        segments.push(&buf[start..start + pos]);
        start += pos + 2;
    }
    segments.push(&buf[start..]);
    segments
}

/// Finds the position of CRLF in the buffer.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Decodes a single RESP value from `buf`.
pub fn parse_message(buf: &[u8]) -> ParseResult<RespValue> {
    RespParser::new().parse(buf).map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> RespValue {
        RespValue::bulk_string(Bytes::from(s.to_string()))
    }

    #[test]
    fn test_parse_bulk_string() {
        let result = parse_message(b"$5\r\nhello\r\n").unwrap();
        assert_eq!(result, bulk("hello"));
    }

    #[test]
    fn test_parse_empty_bulk_string() {
        let result = parse_message(b"$0\r\n\r\n").unwrap();
        assert_eq!(result, bulk(""));
    }

    #[test]
    fn test_parse_bulk_length_mismatch() {
        let result = parse_message(b"$4\r\nhey\r\n");
        assert_eq!(
            result,
            Err(ParseError::LengthMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_parse_bulk_missing_payload() {
        assert_eq!(parse_message(b"$3"), Err(ParseError::Truncated));
    }

    #[test]
    fn test_parse_invalid_length() {
        assert!(matches!(
            parse_message(b"$abc\r\nfoo\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            parse_message(b"$-1\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            parse_message(b"*x\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_parse_array_header_without_count() {
        assert!(matches!(
            parse_message(b"*\r\n$4\r\nPING\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_parse_array() {
        let result = parse_message(b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n").unwrap();
        assert_eq!(result, RespValue::array(vec![bulk("ECHO"), bulk("hey")]));
    }

    #[test]
    fn test_parse_empty_array() {
        assert_eq!(parse_message(b"*0\r\n").unwrap(), RespValue::array(vec![]));
    }

    #[test]
    fn test_parse_nested_array() {
        let input = b"*2\r\n$1\r\na\r\n*2\r\n$1\r\nb\r\n$1\r\nc\r\n";
        let result = parse_message(input).unwrap();
        assert_eq!(
            result,
            RespValue::array(vec![
                bulk("a"),
                RespValue::array(vec![bulk("b"), bulk("c")]),
            ])
        );
    }

    #[test]
    fn test_parse_short_array_fails() {
        // Declares three elements, carries two.
        let input = b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n";
        assert_eq!(parse_message(input), Err(ParseError::Truncated));
    }

    #[test]
    fn test_parse_unknown_prefix() {
        assert_eq!(
            parse_message(b"+OK\r\n"),
            Err(ParseError::UnknownPrefix(b'+'))
        );
        assert_eq!(
            parse_message(b"PING\r\n"),
            Err(ParseError::UnknownPrefix(b'P'))
        );
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse_message(b""), Err(ParseError::EmptyInput));
        assert_eq!(parse_message(b"\r\n"), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_parse_reports_consumed_bytes() {
        let frame = b"*1\r\n$4\r\nPING\r\n";
        let (value, consumed) = RespParser::new().parse(frame).unwrap();
        assert_eq!(value, RespValue::array(vec![bulk("PING")]));
        assert_eq!(consumed, frame.len());

        // Missing final separator: the frame still spans the whole buffer.
        let (_, consumed) = RespParser::new().parse(b"$3\r\nfoo").unwrap();
        assert_eq!(consumed, 7);
    }

    #[test]
    fn test_parse_stops_after_first_frame() {
        let input = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
        let (value, consumed) = RespParser::new().parse(input).unwrap();
        assert_eq!(value, RespValue::array(vec![bulk("PING")]));
        assert_eq!(consumed, 14);
        assert_eq!(&input[consumed..], b"*1\r\n$4\r\nPING\r\n");
    }

    #[test]
    fn test_parse_rejects_signed_lengths() {
        assert!(matches!(
            parse_message(b"*1\r\n$+4\r\nPING\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            parse_message(b"*+1\r\n$4\r\nPING\r\n"),
            Err(ParseError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let mut input = Vec::new();
        for _ in 0..=MAX_NESTING_DEPTH {
            input.extend_from_slice(b"*1\r\n");
        }
        input.extend_from_slice(b"$1\r\na\r\n");
        assert_eq!(parse_message(&input), Err(ParseError::NestingTooDeep));
    }

    #[test]
    fn test_roundtrip() {
        let words = ["SET", "user:101", "Ariz", "", "PX", "100"];
        let original = RespValue::array(words.iter().map(|w| bulk(w)).collect());

        let decoded = parse_message(&original.serialize()).unwrap();
        let values: Vec<String> = decoded
            .into_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_owned())
            .collect();
        assert_eq!(values, words);
    }
}
