//! Reply Types and Wire Encoding
//!
//! This module defines the reply model for the server side of the protocol.
//! Every command handler produces a [`Reply`], which is then framed onto the
//! wire with a one-byte type prefix and CRLF terminators.
//!
//! ## Framing
//!
//! | Reply        | Wire form                                  |
//! |--------------|--------------------------------------------|
//! | Simple       | `+<string>\r\n`                            |
//! | Error        | `-<message>\r\n`                           |
//! | Integer      | `:<decimal>\r\n`                           |
//! | Bulk         | `$<length>\r\n<payload>\r\n`               |
//! | Nil          | `$-1\r\n`                                  |
//! | Array        | `*<count>\r\n` followed by each element    |
//!
//! Simple strings and errors are ASCII and must not contain CR or LF.
//! Bulk payloads are binary-safe; their length is the byte length.

use bytes::Bytes;

/// The CRLF terminator that ends every frame element.
pub const CRLF: &[u8] = b"\r\n";

/// Frame type prefixes.
pub mod prefix {
    pub const SIMPLE: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single reply frame.
///
/// Arrays nest arbitrarily; the data-plane commands only ever produce arrays
/// of bulk strings, while pub/sub confirmation frames mix bulk and integer
/// elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Non-binary status line, e.g. `OK` or `PONG`.
    Simple(String),
    /// Error line, e.g. `ERR unknown command 'FOO'`.
    Error(String),
    /// 64-bit signed integer.
    Integer(i64),
    /// Binary-safe, length-prefixed payload.
    Bulk(Bytes),
    /// The nil bulk, denoting absence.
    Nil,
    /// Sequence of nested replies.
    Array(Vec<Reply>),
}

impl Reply {
    /// The canonical `+OK` reply.
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// The canonical `+PONG` reply.
    pub fn pong() -> Self {
        Reply::Simple("PONG".to_string())
    }

    /// Creates an error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// Creates an integer reply.
    pub fn integer(n: i64) -> Self {
        Reply::Integer(n)
    }

    /// Creates a bulk string reply.
    pub fn bulk(payload: impl Into<Bytes>) -> Self {
        Reply::Bulk(payload.into())
    }

    /// Creates an array reply where every element is a bulk string.
    pub fn bulk_array<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Reply::Array(items.into_iter().map(|b| Reply::Bulk(b.into())).collect())
    }

    /// Returns true if this reply is an error frame.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Encodes the reply into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encodes the reply into an existing buffer.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                buf.push(prefix::SIMPLE);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Bulk(payload) => {
                buf.push(prefix::BULK);
                buf.extend_from_slice(payload.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(payload);
                buf.extend_from_slice(CRLF);
            }
            Reply::Nil => {
                buf.extend_from_slice(b"$-1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Array(items) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(items.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for item in items {
                    item.encode_into(buf);
                }
            }
        }
    }
}
