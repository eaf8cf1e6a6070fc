//! Publish/Subscribe
//!
//! Channel fan-out, kept separate from the key-space: `FLUSHALL` clears
//! values but never subscriptions, and subscriptions die with their
//! connection rather than with any key.

pub mod router;

pub use router::PubSubRouter;
