//! Command Layer
//!
//! Receives tokenized requests from the connection layer, validates them,
//! executes them against the storage and pub/sub layers, and produces
//! framed replies.
//!
//! ## Supported Commands
//!
//! | Group    | Commands                                              |
//! |----------|-------------------------------------------------------|
//! | Server   | `PING`, `INFO`, `FLUSHALL`                            |
//! | String   | `SET [EX n]`, `GET`                                   |
//! | Keyspace | `DEL`, `EXISTS`, `EXPIRE`, `TTL`                      |
//! | List     | `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LLEN`, `LRANGE`    |
//! | Hash     | `HSET`, `HGET`, `HDEL`, `HGETALL`                     |
//! | Set      | `SADD`, `SREM`, `SMEMBERS`, `SCARD`                   |
//! | Pub/Sub  | `PUBLISH`, `SUBSCRIBE`, `UNSUBSCRIBE`                 |

pub mod handler;

pub use handler::{ClientState, CommandHandler};
