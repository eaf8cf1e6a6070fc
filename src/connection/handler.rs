//! Per-Connection Worker
//!
//! Each accepted socket gets one worker task. TCP is a stream, so requests
//! arrive fragmented and coalesced arbitrarily; the worker accumulates
//! reads in a buffer and extracts every complete request before reading
//! again.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! accept
//!   │
//!   ▼
//! reserve capacity ──(saturated)──> close immediately
//!   │
//!   ▼
//! split stream ──> writer task owns the write half,
//!   │              draining the connection outbox
//!   ▼
//! ┌────────────────────────────────────┐
//! │ read chunk ─> extract requests ─>  │
//! │ dispatch ─> queue reply ─> (loop)  │
//! └────────────────────────────────────┘
//!   │ EOF / error
//!   ▼
//! unregister subscriptions, release capacity, close
//! ```
//!
//! Replies and pub/sub frames share the outbox, so replies reach the wire
//! in request order while other connections' `PUBLISH` frames can still be
//! interleaved between them. The worker never writes the socket itself;
//! a failed socket write kills the writer task, the next queue push fails,
//! and the worker shuts down.

use crate::commands::{ClientState, CommandHandler};
use crate::connection::limiter::ClientLimiter;
use crate::protocol::{parse_request, ParseError};
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Size of each socket read.
const READ_CHUNK_BYTES: usize = 4096;

/// Hard cap on buffered bytes for a single connection; a request that
/// cannot complete within this is a protocol violation.
const MAX_BUFFER_BYTES: usize = 1024 * 1024;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Reasons a connection stops being served.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The peer closed mid-request.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The writer task stopped (socket write failed).
    #[error("writer task ended")]
    WriterGone,

    #[error("request buffer limit exceeded")]
    BufferExceeded,
}

/// The read half of one client connection plus its dispatch state.
struct ConnectionWorker {
    reader: OwnedReadHalf,
    outbox: mpsc::UnboundedSender<Bytes>,
    buffer: BytesMut,
    handler: CommandHandler,
    client: ClientState,
}

impl ConnectionWorker {
    async fn run(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some((args, consumed)) = parse_request(&self.buffer)? {
                let _ = self.buffer.split_to(consumed);
                if args.is_empty() {
                    continue;
                }
                if let Some(reply) = self.handler.execute(&args, &mut self.client) {
                    let mut frame = Vec::new();
                    reply.encode_into(&mut frame);
                    if self.outbox.send(frame.into()).is_err() {
                        return Err(ConnectionError::WriterGone);
                    }
                }
            }

            if self.buffer.len() > MAX_BUFFER_BYTES {
                return Err(ConnectionError::BufferExceeded);
            }
            if self.buffer.capacity() - self.buffer.len() < READ_CHUNK_BYTES {
                self.buffer.reserve(READ_CHUNK_BYTES);
            }

            let n = self.reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return if self.buffer.is_empty() {
                    Ok(())
                } else {
                    Err(ConnectionError::UnexpectedEof)
                };
            }
        }
    }
}

/// Writer task: sole owner of the write half. Exits when every sender is
/// gone or a write fails.
async fn drain_outbox(mut writer: OwnedWriteHalf, mut outbox: mpsc::UnboundedReceiver<Bytes>) {
    while let Some(frame) = outbox.recv().await {
        if writer.write_all(&frame).await.is_err() {
            return;
        }
    }
}

/// Serves one client connection to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handler: CommandHandler,
    limiter: Arc<ClientLimiter>,
) {
    let Some(_permit) = limiter.try_acquire() else {
        warn!(
            client = %addr,
            limit = limiter.capacity(),
            "connection limit reached, closing"
        );
        return;
    };

    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let (reader, writer) = stream.into_split();
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    tokio::spawn(drain_outbox(writer, outbox_rx));

    let mut worker = ConnectionWorker {
        reader,
        outbox: outbox_tx.clone(),
        buffer: BytesMut::with_capacity(READ_CHUNK_BYTES),
        client: ClientState::new(conn_id, outbox_tx),
        handler,
    };

    info!(client = %addr, conn_id, "client connected");
    let result = worker.run().await;
    // The router must not keep this connection's write endpoint alive.
    worker.handler.disconnect(&worker.client);

    match result {
        Ok(()) => info!(client = %addr, conn_id, "client disconnected"),
        Err(ConnectionError::UnexpectedEof) => {
            debug!(client = %addr, conn_id, "client closed mid-request")
        }
        Err(ConnectionError::Io(ref e))
            if e.kind() == std::io::ErrorKind::ConnectionReset =>
        {
            debug!(client = %addr, conn_id, "connection reset by client")
        }
        Err(ref e) => warn!(client = %addr, conn_id, error = %e, "connection closed"),
    }
}
