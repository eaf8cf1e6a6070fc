//! Channel Subscription Router
//!
//! Maps channel names to the write endpoints of subscribed connections.
//! `PUBLISH` never touches a socket directly: each connection owns its
//! socket through a dedicated writer task, and the router holds only the
//! unbounded sender feeding that task. Publishing queues one pre-encoded
//! frame per subscriber; a send to a closed channel means the connection
//! is gone and is simply not counted.
//!
//! Registration and removal take the exclusive lock; publishing walks the
//! subscriber list under the shared lock. Because a queue push cannot
//! block, the lock is never held across socket I/O.

use crate::protocol::Reply;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

/// One subscribed connection: its id and the sender feeding its writer task.
#[derive(Debug, Clone)]
struct Subscriber {
    conn_id: u64,
    sender: mpsc::UnboundedSender<Bytes>,
}

/// The channel → subscribers mapping shared by all connections.
#[derive(Debug, Default)]
pub struct PubSubRouter {
    channels: RwLock<HashMap<Bytes, Vec<Subscriber>>>,
}

impl PubSubRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `conn_id` on `channel`. A connection appears at most once
    /// per channel; re-subscribing is a no-op.
    pub fn subscribe(&self, channel: &[u8], conn_id: u64, sender: &mpsc::UnboundedSender<Bytes>) {
        let mut channels = self.channels.write().unwrap();
        let subscribers = channels.entry(Bytes::copy_from_slice(channel)).or_default();
        if subscribers.iter().all(|s| s.conn_id != conn_id) {
            subscribers.push(Subscriber {
                conn_id,
                sender: sender.clone(),
            });
        }
    }

    /// Removes `conn_id` from `channel`. Empty channels are dropped.
    pub fn unsubscribe(&self, channel: &[u8], conn_id: u64) {
        let mut channels = self.channels.write().unwrap();
        if let Some(subscribers) = channels.get_mut(channel) {
            subscribers.retain(|s| s.conn_id != conn_id);
            if subscribers.is_empty() {
                channels.remove(channel);
            }
        }
    }

    /// Removes `conn_id` from every channel. Run when its connection ends.
    pub fn unsubscribe_all(&self, conn_id: u64) {
        let mut channels = self.channels.write().unwrap();
        channels.retain(|_, subscribers| {
            subscribers.retain(|s| s.conn_id != conn_id);
            !subscribers.is_empty()
        });
    }

    /// Delivers `payload` to every subscriber of `channel` as a
    /// `["message", channel, payload]` frame. Returns how many deliveries
    /// were accepted; subscribers whose connection has gone away are
    /// skipped without failing the publish.
    pub fn publish(&self, channel: &[u8], payload: &[u8]) -> usize {
        let frame = Bytes::from(
            Reply::Array(vec![
                Reply::bulk(Bytes::from_static(b"message")),
                Reply::bulk(Bytes::copy_from_slice(channel)),
                Reply::bulk(Bytes::copy_from_slice(payload)),
            ])
            .encode(),
        );

        let channels = self.channels.read().unwrap();
        let Some(subscribers) = channels.get(channel) else {
            return 0;
        };
        let delivered = subscribers
            .iter()
            .filter(|s| s.sender.send(frame.clone()).is_ok())
            .count();
        debug!(
            channel = %String::from_utf8_lossy(channel),
            delivered,
            subscribers = subscribers.len(),
            "published message"
        );
        delivered
    }

    /// Number of subscribers currently registered on `channel`.
    pub fn subscriber_count(&self, channel: &[u8]) -> usize {
        let channels = self.channels.read().unwrap();
        channels.get(channel).map(Vec::len).unwrap_or(0)
    }
}
