//! # BlazeKV - An In-Memory Key/Value Server
//!
//! BlazeKV is an in-memory key/value server speaking the widely deployed
//! text-line command dialect with length-prefixed reply framing. Values are
//! typed (string, list, hash, set), may carry time-based expiry, and a
//! publish/subscribe facility fans messages out to per-channel subscriber
//! sets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            BlazeKV                              │
//! │                                                                 │
//! │  ┌────────────┐   ┌──────────────┐   ┌─────────────────┐        │
//! │  │ TCP Server │──>│  Connection  │──>│    Command      │        │
//! │  │ (Listener) │   │    Worker    │   │   Dispatcher    │        │
//! │  └────────────┘   └──────┬───────┘   └───┬─────────┬───┘        │
//! │                          │               │         │            │
//! │                   writer task            ▼         ▼            │
//! │                  (owns socket       ┌─────────┐ ┌─────────┐     │
//! │                   write half)       │  Store  │ │ Pub/Sub │     │
//! │                          ▲          │ RwLock  │ │ Router  │     │
//! │                          │          └────┬────┘ └────┬────┘     │
//! │                          │               │           │          │
//! │                          │          ┌────┴────┐      │          │
//! │                          │          │ Reaper  │      │          │
//! │                          │          └─────────┘      │          │
//! │                          └───────────────────────────┘          │
//! │                              PUBLISH fan-out frames             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - **Server**: `PING`, `INFO`, `FLUSHALL`
//! - **String**: `SET key value [EX seconds]`, `GET key`
//! - **Keyspace**: `DEL`, `EXISTS`, `EXPIRE`, `TTL`
//! - **List**: `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LLEN`, `LRANGE`
//! - **Hash**: `HSET`, `HGET`, `HDEL`, `HGETALL`
//! - **Set**: `SADD`, `SREM`, `SMEMBERS`, `SCARD`
//! - **Pub/Sub**: `PUBLISH`, `SUBSCRIBE`, `UNSUBSCRIBE`
//!
//! ## Design Highlights
//!
//! ### One Critical Section per Command
//!
//! The store sits behind a single reader/writer lock and every command
//! touches it through exactly one store call, so no command ever observes
//! another command's partial update and multi-key commands are atomic
//! across all named keys.
//!
//! ### Lazy + Active Expiry
//!
//! Every access checks the deadline and treats an expired entry as absent;
//! a background reaper sweeps once a second so keys that are never touched
//! again still get reclaimed.
//!
//! ### Connections Own Their Sockets
//!
//! A connection's socket write half is owned by a dedicated writer task fed
//! by an unbounded queue. Command replies and pub/sub fan-out frames share
//! the queue, which keeps replies in request order and lets `PUBLISH`
//! deliver to other connections without ever blocking on their sockets.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod pubsub;
pub mod storage;

pub use commands::{ClientState, CommandHandler};
pub use connection::{handle_connection, ClientLimiter};
pub use protocol::{parse_request, ParseError, Reply};
pub use pubsub::PubSubRouter;
pub use storage::{start_reaper, Reaper, Store};

/// The default listening port (same as the reference dialect).
pub const DEFAULT_PORT: u16 = 6379;

/// Maximum simultaneously served connections.
pub const MAX_CLIENTS: usize = 1000;

/// Crate version, reported by `INFO`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
