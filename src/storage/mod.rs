//! Storage Layer
//!
//! The typed key-space shared by every connection, plus the background
//! reaper that bounds memory held by expired entries.
//!
//! - [`engine`]: the [`Store`], one reader/writer lock over a map from
//!   binary keys to tagged, optionally-expiring values
//! - [`expiry`]: the [`Reaper`] background task

pub mod engine;
pub mod expiry;

pub use engine::{Entry, Store, Value, WrongType};
pub use expiry::{start_reaper, Reaper, SWEEP_INTERVAL};
