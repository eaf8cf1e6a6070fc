//! Wire Protocol
//!
//! The server speaks a line-oriented command dialect with length-prefixed
//! reply framing. This module contains both directions:
//!
//! - [`types`]: the [`Reply`] enum and its CRLF wire encoding
//! - [`parser`]: the incremental request parser (line form and the
//!   array-of-bulk-strings form standard clients emit)

pub mod parser;
pub mod types;

pub use parser::{parse_request, ParseError};
pub use types::Reply;
