//! Incremental Request Parser
//!
//! Requests arrive over TCP and can be fragmented or coalesced arbitrarily,
//! so the parser works incrementally over a byte buffer:
//!
//! - `Ok(Some((args, consumed)))` - a complete request; `consumed` bytes
//!   were used and can be dropped from the buffer
//! - `Ok(None)` - the buffer holds only a partial request; read more bytes
//! - `Err(ParseError)` - the stream is not valid protocol data
//!
//! Two request shapes are accepted:
//!
//! 1. **Line form** (primary): one CRLF-terminated line, tokenized on runs
//!    of ASCII whitespace. `SET key1 value1\r\n` becomes
//!    `["SET", "key1", "value1"]`. An empty line yields an empty argument
//!    vector, which the connection loop skips.
//! 2. **Array form** (client compatibility): `*<n>\r\n` followed by `n`
//!    bulk strings, the framing standard clients emit. Unlike the line
//!    form, arguments here are binary-safe and may contain whitespace.

use bytes::Bytes;
use thiserror::Error;

/// Upper bound on a single line-form request.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Upper bound on a single bulk argument (matches the reference dialect).
pub const MAX_BULK_BYTES: usize = 512 * 1024 * 1024;

/// Upper bound on the argument count of one request.
pub const MAX_ARGS: usize = 1024;

/// Errors produced by invalid request framing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("request line too long: {0} bytes (max {MAX_LINE_BYTES})")]
    LineTooLong(usize),

    #[error("invalid length prefix: {0:?}")]
    InvalidLength(String),

    #[error("expected bulk string, found prefix {0:#04x}")]
    ExpectedBulk(u8),

    #[error("bulk argument too large: {size} bytes (max {max})")]
    BulkTooLarge { size: usize, max: usize },

    #[error("too many arguments: {0} (max {MAX_ARGS})")]
    TooManyArgs(usize),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Attempts to parse one complete request from the front of `buf`.
pub fn parse_request(buf: &[u8]) -> Result<Option<(Vec<Bytes>, usize)>, ParseError> {
    if buf.is_empty() {
        return Ok(None);
    }
    if buf[0] == b'*' {
        parse_array(buf)
    } else {
        parse_line(buf)
    }
}

/// Parses a whitespace-tokenized, CRLF-terminated request line.
fn parse_line(buf: &[u8]) -> Result<Option<(Vec<Bytes>, usize)>, ParseError> {
    let end = match find_crlf(buf) {
        Some(pos) => pos,
        None => {
            // Refuse to buffer an unbounded "line" that never terminates.
            if buf.len() > MAX_LINE_BYTES {
                return Err(ParseError::LineTooLong(buf.len()));
            }
            return Ok(None);
        }
    };

    if end > MAX_LINE_BYTES {
        return Err(ParseError::LineTooLong(end));
    }

    let args: Vec<Bytes> = buf[..end]
        .split(|b: &u8| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .map(Bytes::copy_from_slice)
        .collect();

    if args.len() > MAX_ARGS {
        return Err(ParseError::TooManyArgs(args.len()));
    }

    Ok(Some((args, end + 2)))
}

/// Parses an array-of-bulk-strings request: `*<n>\r\n($<len>\r\n<data>\r\n){n}`.
fn parse_array(buf: &[u8]) -> Result<Option<(Vec<Bytes>, usize)>, ParseError> {
    debug_assert!(buf[0] == b'*');

    let header_end = match find_crlf(buf) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let count = parse_decimal(&buf[1..header_end])?;
    if count < 0 {
        return Err(ParseError::InvalidLength(format!("*{count}")));
    }
    let count = count as usize;
    if count > MAX_ARGS {
        return Err(ParseError::TooManyArgs(count));
    }

    let mut consumed = header_end + 2;
    let mut args = Vec::with_capacity(count);

    for _ in 0..count {
        let rest = &buf[consumed..];
        if rest.is_empty() {
            return Ok(None);
        }
        if rest[0] != b'$' {
            return Err(ParseError::ExpectedBulk(rest[0]));
        }

        let len_end = match find_crlf(rest) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        let len = parse_decimal(&rest[1..len_end])?;
        if len < 0 {
            // Nil bulks are reply-only; a request argument always has data.
            return Err(ParseError::InvalidLength(format!("${len}")));
        }
        let len = len as usize;
        if len > MAX_BULK_BYTES {
            return Err(ParseError::BulkTooLarge {
                size: len,
                max: MAX_BULK_BYTES,
            });
        }

        let data_start = len_end + 2;
        let total = data_start + len + 2;
        if rest.len() < total {
            return Ok(None);
        }
        if &rest[data_start + len..total] != b"\r\n" {
            return Err(ParseError::Protocol(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        args.push(Bytes::copy_from_slice(&rest[data_start..data_start + len]));
        consumed += total;
    }

    Ok(Some((args, consumed)))
}

fn parse_decimal(digits: &[u8]) -> Result<i64, ParseError> {
    let text = std::str::from_utf8(digits)
        .map_err(|_| ParseError::InvalidLength(String::from_utf8_lossy(digits).into_owned()))?;
    text.parse()
        .map_err(|_| ParseError::InvalidLength(text.to_string()))
}

/// Position of the first `\r\n` in `buf`, or `None`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|pair| pair == b"\r\n")
}
