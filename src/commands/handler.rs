//! Command Dispatch and Handlers
//!
//! This module turns a tokenized request into a reply. The first token
//! selects the command case-insensitively; every handler validates its
//! argument count before touching any state, so an arity violation never
//! has side effects. Each handler performs its whole store interaction
//! through a single store call, which makes every command one atomic
//! critical section.
//!
//! ```text
//! tokens ──> execute() ──> cmd_*() ──> Store / PubSubRouter ──> Reply
//! ```
//!
//! Subscription commands are the one special case: they emit one
//! confirmation frame per channel straight onto the connection's outbox
//! and produce no single reply, so [`CommandHandler::execute`] returns
//! `Option<Reply>`.

use crate::connection::ClientLimiter;
use crate::protocol::Reply;
use crate::pubsub::PubSubRouter;
use crate::storage::Store;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Cosmetic per-entry footprint used for the `used_memory` line of `INFO`.
const ENTRY_FOOTPRINT_BYTES: usize = 256;

/// Per-connection dispatch state: the connection's identity, its write
/// endpoint, and the channels it is subscribed to.
#[derive(Debug)]
pub struct ClientState {
    conn_id: u64,
    outbox: mpsc::UnboundedSender<Bytes>,
    channels: HashSet<Bytes>,
}

impl ClientState {
    pub fn new(conn_id: u64, outbox: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            conn_id,
            outbox,
            channels: HashSet::new(),
        }
    }

    fn queue_frame(&self, reply: &Reply) {
        // A failed send means the writer task is gone; the read loop will
        // notice on its next send and close.
        let _ = self.outbox.send(Bytes::from(reply.encode()));
    }
}

/// Executes commands against the shared store and router.
///
/// Cheap to clone; one clone is handed to every connection task.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    store: Arc<Store>,
    router: Arc<PubSubRouter>,
    limiter: Arc<ClientLimiter>,
    started_at: Instant,
}

impl CommandHandler {
    pub fn new(store: Arc<Store>, router: Arc<PubSubRouter>, limiter: Arc<ClientLimiter>) -> Self {
        Self {
            store,
            router,
            limiter,
            started_at: Instant::now(),
        }
    }

    /// Dispatches one tokenized request.
    ///
    /// Returns `None` when the handler already queued its frames on the
    /// client's outbox (subscription commands).
    pub fn execute(&self, args: &[Bytes], client: &mut ClientState) -> Option<Reply> {
        let Some(first) = args.first() else {
            return Some(Reply::error("ERR empty command"));
        };
        let command = String::from_utf8_lossy(first).to_uppercase();
        let args = &args[1..];

        let reply = match command.as_str() {
            "PING" => Reply::pong(),
            "INFO" => self.cmd_info(),
            "FLUSHALL" => {
                // Clears values only; subscriptions outlive the key-space.
                self.store.flush();
                Reply::ok()
            }

            "SET" => self.cmd_set(args),
            "GET" => self.cmd_get(args),
            "DEL" => self.cmd_del(args),
            "EXISTS" => self.cmd_exists(args),
            "EXPIRE" => self.cmd_expire(args),
            "TTL" => self.cmd_ttl(args),

            "LPUSH" => self.cmd_push(args, "lpush", Store::lpush),
            "RPUSH" => self.cmd_push(args, "rpush", Store::rpush),
            "LPOP" => self.cmd_pop(args, "lpop", Store::lpop),
            "RPOP" => self.cmd_pop(args, "rpop", Store::rpop),
            "LLEN" => self.cmd_llen(args),
            "LRANGE" => self.cmd_lrange(args),

            "HSET" => self.cmd_hset(args),
            "HGET" => self.cmd_hget(args),
            "HDEL" => self.cmd_hdel(args),
            "HGETALL" => self.cmd_hgetall(args),

            "SADD" => self.cmd_sadd(args),
            "SREM" => self.cmd_srem(args),
            "SMEMBERS" => self.cmd_smembers(args),
            "SCARD" => self.cmd_scard(args),

            "PUBLISH" => self.cmd_publish(args),
            "SUBSCRIBE" => return self.cmd_subscribe(args, client),
            "UNSUBSCRIBE" => return self.cmd_unsubscribe(args, client),

            _ => Reply::error(format!("ERR unknown command '{command}'")),
        };
        Some(reply)
    }

    /// Drops every registration the connection holds. Run by the worker on
    /// its way out so the router never keeps a dead write endpoint.
    pub fn disconnect(&self, client: &ClientState) {
        if !client.channels.is_empty() {
            self.router.unsubscribe_all(client.conn_id);
        }
    }

    // ========================================================================
    // String and keyspace commands
    // ========================================================================

    /// SET key value [EX seconds]
    fn cmd_set(&self, args: &[Bytes]) -> Reply {
        if args.len() < 2 {
            return arity_error("set");
        }
        let ttl = match args.len() {
            2 => None,
            4 if args[2].eq_ignore_ascii_case(b"EX") => match parse_seconds(&args[3]) {
                Some(seconds) => Some(Duration::from_secs(seconds)),
                None => return Reply::error("ERR invalid expire time"),
            },
            _ => return Reply::error("ERR syntax error"),
        };
        self.store.set(args[0].clone(), args[1].clone(), ttl);
        Reply::ok()
    }

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return arity_error("get");
        }
        match self.store.get(&args[0]) {
            Ok(Some(value)) => Reply::Bulk(value),
            Ok(None) => Reply::Nil,
            Err(_) => wrong_type(),
        }
    }

    /// DEL key [key ...]
    fn cmd_del(&self, args: &[Bytes]) -> Reply {
        if args.is_empty() {
            return arity_error("del");
        }
        Reply::integer(self.store.del(args) as i64)
    }

    /// EXISTS key [key ...]
    fn cmd_exists(&self, args: &[Bytes]) -> Reply {
        if args.is_empty() {
            return arity_error("exists");
        }
        Reply::integer(self.store.exists(args) as i64)
    }

    /// EXPIRE key seconds
    fn cmd_expire(&self, args: &[Bytes]) -> Reply {
        if args.len() != 2 {
            return arity_error("expire");
        }
        let Some(seconds) = parse_seconds(&args[1]) else {
            return Reply::error("ERR invalid expire time");
        };
        let applied = self.store.expire(&args[0], Duration::from_secs(seconds));
        Reply::integer(applied as i64)
    }

    /// TTL key
    fn cmd_ttl(&self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return arity_error("ttl");
        }
        Reply::integer(self.store.ttl(&args[0]))
    }

    // ========================================================================
    // List commands
    // ========================================================================

    /// LPUSH/RPUSH key value [value ...]
    fn cmd_push(
        &self,
        args: &[Bytes],
        name: &str,
        push: fn(&Store, Bytes, Vec<Bytes>) -> Result<usize, crate::storage::WrongType>,
    ) -> Reply {
        if args.len() < 2 {
            return arity_error(name);
        }
        match push(&self.store, args[0].clone(), args[1..].to_vec()) {
            Ok(len) => Reply::integer(len as i64),
            Err(_) => wrong_type(),
        }
    }

    /// LPOP/RPOP key
    fn cmd_pop(
        &self,
        args: &[Bytes],
        name: &str,
        pop: fn(&Store, &[u8]) -> Option<Bytes>,
    ) -> Reply {
        if args.len() != 1 {
            return arity_error(name);
        }
        match pop(&self.store, &args[0]) {
            Some(value) => Reply::Bulk(value),
            None => Reply::Nil,
        }
    }

    /// LLEN key
    fn cmd_llen(&self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return arity_error("llen");
        }
        match self.store.llen(&args[0]) {
            Ok(len) => Reply::integer(len as i64),
            Err(_) => wrong_type(),
        }
    }

    /// LRANGE key start stop
    fn cmd_lrange(&self, args: &[Bytes]) -> Reply {
        if args.len() != 3 {
            return arity_error("lrange");
        }
        let (Some(start), Some(stop)) = (parse_index(&args[1]), parse_index(&args[2])) else {
            return Reply::error("ERR value is not an integer or out of range");
        };
        Reply::bulk_array(self.store.lrange(&args[0], start, stop))
    }

    // ========================================================================
    // Hash commands
    // ========================================================================

    /// HSET key field value [field value ...]
    fn cmd_hset(&self, args: &[Bytes]) -> Reply {
        if args.len() < 3 || args.len() % 2 == 0 {
            return arity_error("hset");
        }
        let pairs = args[1..]
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        match self.store.hset(args[0].clone(), pairs) {
            Ok(added) => Reply::integer(added as i64),
            Err(_) => wrong_type(),
        }
    }

    /// HGET key field
    fn cmd_hget(&self, args: &[Bytes]) -> Reply {
        if args.len() != 2 {
            return arity_error("hget");
        }
        match self.store.hget(&args[0], &args[1]) {
            Some(value) => Reply::Bulk(value),
            None => Reply::Nil,
        }
    }

    /// HDEL key field [field ...]
    fn cmd_hdel(&self, args: &[Bytes]) -> Reply {
        if args.len() < 2 {
            return arity_error("hdel");
        }
        Reply::integer(self.store.hdel(&args[0], &args[1..]) as i64)
    }

    /// HGETALL key
    fn cmd_hgetall(&self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return arity_error("hgetall");
        }
        let mut items = Vec::new();
        for (field, value) in self.store.hgetall(&args[0]) {
            items.push(Reply::Bulk(field));
            items.push(Reply::Bulk(value));
        }
        Reply::Array(items)
    }

    // ========================================================================
    // Set commands
    // ========================================================================

    /// SADD key member [member ...]
    fn cmd_sadd(&self, args: &[Bytes]) -> Reply {
        if args.len() < 2 {
            return arity_error("sadd");
        }
        match self.store.sadd(args[0].clone(), args[1..].to_vec()) {
            Ok(added) => Reply::integer(added as i64),
            Err(_) => wrong_type(),
        }
    }

    /// SREM key member [member ...]
    fn cmd_srem(&self, args: &[Bytes]) -> Reply {
        if args.len() < 2 {
            return arity_error("srem");
        }
        Reply::integer(self.store.srem(&args[0], &args[1..]) as i64)
    }

    /// SMEMBERS key
    fn cmd_smembers(&self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return arity_error("smembers");
        }
        Reply::bulk_array(self.store.smembers(&args[0]))
    }

    /// SCARD key
    fn cmd_scard(&self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return arity_error("scard");
        }
        Reply::integer(self.store.scard(&args[0]) as i64)
    }

    // ========================================================================
    // Pub/sub and server commands
    // ========================================================================

    /// PUBLISH channel message
    fn cmd_publish(&self, args: &[Bytes]) -> Reply {
        if args.len() != 2 {
            return arity_error("publish");
        }
        Reply::integer(self.router.publish(&args[0], &args[1]) as i64)
    }

    /// SUBSCRIBE channel [channel ...]
    ///
    /// Emits one `["subscribe", channel, n]` frame per channel, where n is
    /// the client's subscription count after that registration.
    fn cmd_subscribe(&self, args: &[Bytes], client: &mut ClientState) -> Option<Reply> {
        if args.is_empty() {
            return Some(arity_error("subscribe"));
        }
        for channel in args {
            if client.channels.insert(channel.clone()) {
                self.router
                    .subscribe(channel, client.conn_id, &client.outbox);
            }
            client.queue_frame(&Reply::Array(vec![
                Reply::bulk(Bytes::from_static(b"subscribe")),
                Reply::Bulk(channel.clone()),
                Reply::integer(client.channels.len() as i64),
            ]));
        }
        None
    }

    /// UNSUBSCRIBE [channel ...]
    ///
    /// Without arguments, drops every subscription the client holds.
    fn cmd_unsubscribe(&self, args: &[Bytes], client: &mut ClientState) -> Option<Reply> {
        let targets: Vec<Bytes> = if args.is_empty() {
            client.channels.iter().cloned().collect()
        } else {
            args.to_vec()
        };

        if targets.is_empty() {
            client.queue_frame(&Reply::Array(vec![
                Reply::bulk(Bytes::from_static(b"unsubscribe")),
                Reply::Nil,
                Reply::integer(0),
            ]));
            return None;
        }

        for channel in targets {
            if client.channels.remove(&channel) {
                self.router.unsubscribe(&channel, client.conn_id);
            }
            client.queue_frame(&Reply::Array(vec![
                Reply::bulk(Bytes::from_static(b"unsubscribe")),
                Reply::Bulk(channel),
                Reply::integer(client.channels.len() as i64),
            ]));
        }
        None
    }

    /// INFO
    fn cmd_info(&self) -> Reply {
        let keys = self.store.key_count();
        let info = format!(
            "# Server\r\n\
             blazekv_version:{}\r\n\
             uptime_in_seconds:{}\r\n\
             # Clients\r\n\
             connected_clients:{}\r\n\
             # Memory\r\n\
             used_memory:{}\r\n\
             # Keyspace\r\n\
             db0:keys={}\r\n",
            crate::VERSION,
            self.started_at.elapsed().as_secs(),
            self.limiter.active(),
            keys * ENTRY_FOOTPRINT_BYTES,
            keys,
        );
        Reply::bulk(Bytes::from(info))
    }
}

fn arity_error(command: &str) -> Reply {
    Reply::error(format!(
        "ERR wrong number of arguments for '{command}' command"
    ))
}

fn wrong_type() -> Reply {
    Reply::error("WRONGTYPE Operation against a key holding the wrong kind of value")
}

fn parse_seconds(arg: &[u8]) -> Option<u64> {
    std::str::from_utf8(arg).ok()?.parse().ok()
}

fn parse_index(arg: &[u8]) -> Option<i64> {
    std::str::from_utf8(arg).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn handler() -> CommandHandler {
        CommandHandler::new(
            Arc::new(Store::new()),
            Arc::new(PubSubRouter::new()),
            Arc::new(ClientLimiter::new(16)),
        )
    }

    fn client(conn_id: u64) -> (ClientState, UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ClientState::new(conn_id, tx), rx)
    }

    fn run(handler: &CommandHandler, state: &mut ClientState, parts: &[&str]) -> Reply {
        let args: Vec<Bytes> = parts
            .iter()
            .map(|part| Bytes::copy_from_slice(part.as_bytes()))
            .collect();
        handler.execute(&args, state).expect("single-frame reply")
    }

    #[test]
    fn ping_pongs() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(run(&h, &mut c, &["PING"]), Reply::pong());
        // Command match is case-insensitive.
        assert_eq!(run(&h, &mut c, &["ping"]), Reply::pong());
    }

    #[test]
    fn set_then_get() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(run(&h, &mut c, &["SET", "key1", "value1"]), Reply::ok());
        assert_eq!(run(&h, &mut c, &["GET", "key1"]), Reply::bulk("value1"));
        assert_eq!(run(&h, &mut c, &["GET", "nonexistent"]), Reply::Nil);
    }

    #[test]
    fn set_rejects_bad_expiry_and_trailing_garbage() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(
            run(&h, &mut c, &["SET", "k", "v", "EX", "abc"]),
            Reply::error("ERR invalid expire time")
        );
        assert_eq!(
            run(&h, &mut c, &["SET", "k", "v", "EX", "-1"]),
            Reply::error("ERR invalid expire time")
        );
        assert_eq!(
            run(&h, &mut c, &["SET", "k", "v", "NX"]),
            Reply::error("ERR syntax error")
        );
        // The failed SETs left no value behind.
        assert_eq!(run(&h, &mut c, &["GET", "k"]), Reply::Nil);
    }

    #[test]
    fn set_ex_sets_ttl_and_plain_set_clears_it() {
        let h = handler();
        let (mut c, _rx) = client(1);
        run(&h, &mut c, &["SET", "k", "v", "EX", "100"]);
        match run(&h, &mut c, &["TTL", "k"]) {
            Reply::Integer(n) => assert!(n > 0 && n <= 100),
            other => panic!("expected integer ttl, got {other:?}"),
        }

        run(&h, &mut c, &["SET", "k", "v"]);
        assert_eq!(run(&h, &mut c, &["TTL", "k"]), Reply::integer(-1));
    }

    #[test]
    fn del_and_exists_count() {
        let h = handler();
        let (mut c, _rx) = client(1);
        run(&h, &mut c, &["SET", "a", "1"]);
        run(&h, &mut c, &["SET", "b", "2"]);

        assert_eq!(run(&h, &mut c, &["EXISTS", "a", "a", "z"]), Reply::integer(2));
        assert_eq!(run(&h, &mut c, &["DEL", "a", "b", "z"]), Reply::integer(2));
        assert_eq!(run(&h, &mut c, &["EXISTS", "a"]), Reply::integer(0));
    }

    #[test]
    fn ttl_of_missing_key() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(run(&h, &mut c, &["TTL", "missing"]), Reply::integer(-2));
    }

    #[test]
    fn expire_applies_only_to_live_keys() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(run(&h, &mut c, &["EXPIRE", "missing", "10"]), Reply::integer(0));

        run(&h, &mut c, &["SET", "k", "v"]);
        assert_eq!(run(&h, &mut c, &["EXPIRE", "k", "10"]), Reply::integer(1));
        assert_eq!(
            run(&h, &mut c, &["EXPIRE", "k", "soon"]),
            Reply::error("ERR invalid expire time")
        );
    }

    #[test]
    fn list_round() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(run(&h, &mut c, &["LPUSH", "L", "a"]), Reply::integer(1));
        assert_eq!(run(&h, &mut c, &["RPUSH", "L", "b", "c"]), Reply::integer(3));
        assert_eq!(
            run(&h, &mut c, &["LRANGE", "L", "0", "-1"]),
            Reply::bulk_array(["a", "b", "c"])
        );
        assert_eq!(run(&h, &mut c, &["LLEN", "L"]), Reply::integer(3));
        assert_eq!(run(&h, &mut c, &["LPOP", "L"]), Reply::bulk("a"));
        assert_eq!(run(&h, &mut c, &["RPOP", "L"]), Reply::bulk("c"));
        assert_eq!(run(&h, &mut c, &["LPOP", "empty"]), Reply::Nil);
    }

    #[test]
    fn lrange_rejects_non_integer_indices() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(
            run(&h, &mut c, &["LRANGE", "L", "zero", "-1"]),
            Reply::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn type_mismatch_error_leaves_value_intact() {
        let h = handler();
        let (mut c, _rx) = client(1);
        run(&h, &mut c, &["SET", "s", "hi"]);

        let reply = run(&h, &mut c, &["LPUSH", "s", "x"]);
        assert_eq!(
            reply,
            Reply::error("WRONGTYPE Operation against a key holding the wrong kind of value")
        );
        assert!(run(&h, &mut c, &["LLEN", "s"]).is_error());
        assert_eq!(run(&h, &mut c, &["GET", "s"]), Reply::bulk("hi"));

        run(&h, &mut c, &["RPUSH", "L", "x"]);
        assert!(run(&h, &mut c, &["GET", "L"]).is_error());
    }

    #[test]
    fn hset_counts_new_fields_only() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(run(&h, &mut c, &["HSET", "H", "f1", "v1"]), Reply::integer(1));
        assert_eq!(
            run(&h, &mut c, &["HSET", "H", "f1", "v1b", "f2", "v2"]),
            Reply::integer(1)
        );
        assert_eq!(run(&h, &mut c, &["HGET", "H", "f1"]), Reply::bulk("v1b"));
        assert_eq!(run(&h, &mut c, &["HGET", "H", "f3"]), Reply::Nil);
    }

    #[test]
    fn hset_odd_pairs_is_arity_error() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(
            run(&h, &mut c, &["HSET", "H", "f1", "v1", "f2"]),
            Reply::error("ERR wrong number of arguments for 'hset' command")
        );
    }

    #[test]
    fn hdel_and_hgetall() {
        let h = handler();
        let (mut c, _rx) = client(1);
        run(&h, &mut c, &["HSET", "H", "f1", "v1", "f2", "v2"]);

        assert_eq!(run(&h, &mut c, &["HDEL", "H", "f1", "zz"]), Reply::integer(1));
        assert_eq!(
            run(&h, &mut c, &["HGETALL", "H"]),
            Reply::bulk_array(["f2", "v2"])
        );
        assert_eq!(run(&h, &mut c, &["HGETALL", "missing"]), Reply::Array(vec![]));
    }

    #[test]
    fn sadd_deduplicates() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(run(&h, &mut c, &["SADD", "S", "x"]), Reply::integer(1));
        assert_eq!(run(&h, &mut c, &["SADD", "S", "x", "y", "z"]), Reply::integer(2));
        assert_eq!(run(&h, &mut c, &["SCARD", "S"]), Reply::integer(3));
        assert_eq!(run(&h, &mut c, &["SREM", "S", "x", "q"]), Reply::integer(1));
        assert_eq!(run(&h, &mut c, &["SCARD", "S"]), Reply::integer(2));
    }

    #[test]
    fn smembers_of_single_member_set() {
        let h = handler();
        let (mut c, _rx) = client(1);
        for _ in 0..3 {
            run(&h, &mut c, &["SADD", "S", "x"]);
        }
        assert_eq!(run(&h, &mut c, &["SCARD", "S"]), Reply::integer(1));
        assert_eq!(run(&h, &mut c, &["SMEMBERS", "S"]), Reply::bulk_array(["x"]));
    }

    #[test]
    fn unknown_command_names_the_command() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(
            run(&h, &mut c, &["frobnicate", "x"]),
            Reply::error("ERR unknown command 'FROBNICATE'")
        );
    }

    #[test]
    fn arity_error_names_the_command() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(
            run(&h, &mut c, &["GET"]),
            Reply::error("ERR wrong number of arguments for 'get' command")
        );
        assert_eq!(
            run(&h, &mut c, &["SET", "only-key"]),
            Reply::error("ERR wrong number of arguments for 'set' command")
        );
    }

    #[test]
    fn publish_without_subscribers_returns_zero() {
        let h = handler();
        let (mut c, _rx) = client(1);
        assert_eq!(run(&h, &mut c, &["PUBLISH", "ch", "msg"]), Reply::integer(0));
    }

    #[test]
    fn subscribe_receives_published_messages() {
        let h = handler();
        let (mut subscriber, mut sub_rx) = client(1);
        let (mut publisher, _pub_rx) = client(2);

        assert!(h
            .execute(&[Bytes::from_static(b"SUBSCRIBE"), Bytes::from_static(b"news")], &mut subscriber)
            .is_none());
        let confirmation = sub_rx.try_recv().unwrap();
        assert_eq!(
            &confirmation[..],
            b"*3\r\n$9\r\nsubscribe\r\n$4\r\nnews\r\n:1\r\n"
        );

        assert_eq!(
            run(&h, &mut publisher, &["PUBLISH", "news", "hello"]),
            Reply::integer(1)
        );
        let message = sub_rx.try_recv().unwrap();
        assert_eq!(
            &message[..],
            b"*3\r\n$7\r\nmessage\r\n$4\r\nnews\r\n$5\r\nhello\r\n"
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let h = handler();
        let (mut subscriber, mut sub_rx) = client(1);
        let (mut publisher, _pub_rx) = client(2);

        h.execute(&[Bytes::from_static(b"SUBSCRIBE"), Bytes::from_static(b"news")], &mut subscriber);
        sub_rx.try_recv().unwrap();
        h.execute(&[Bytes::from_static(b"UNSUBSCRIBE"), Bytes::from_static(b"news")], &mut subscriber);
        let confirmation = sub_rx.try_recv().unwrap();
        assert_eq!(
            &confirmation[..],
            b"*3\r\n$11\r\nunsubscribe\r\n$4\r\nnews\r\n:0\r\n"
        );

        assert_eq!(
            run(&h, &mut publisher, &["PUBLISH", "news", "hello"]),
            Reply::integer(0)
        );
    }

    #[test]
    fn disconnect_unregisters_everywhere() {
        let h = handler();
        let (mut subscriber, _sub_rx) = client(1);
        let (mut publisher, _pub_rx) = client(2);

        h.execute(
            &[
                Bytes::from_static(b"SUBSCRIBE"),
                Bytes::from_static(b"a"),
                Bytes::from_static(b"b"),
            ],
            &mut subscriber,
        );
        h.disconnect(&subscriber);

        assert_eq!(run(&h, &mut publisher, &["PUBLISH", "a", "x"]), Reply::integer(0));
        assert_eq!(run(&h, &mut publisher, &["PUBLISH", "b", "x"]), Reply::integer(0));
    }

    #[test]
    fn flushall_clears_keys_but_not_subscriptions() {
        let h = handler();
        let (mut subscriber, mut sub_rx) = client(1);
        let (mut publisher, _pub_rx) = client(2);

        run(&h, &mut publisher, &["SET", "k", "v"]);
        h.execute(&[Bytes::from_static(b"SUBSCRIBE"), Bytes::from_static(b"news")], &mut subscriber);
        sub_rx.try_recv().unwrap();

        assert_eq!(run(&h, &mut publisher, &["FLUSHALL"]), Reply::ok());
        assert_eq!(run(&h, &mut publisher, &["GET", "k"]), Reply::Nil);
        assert_eq!(
            run(&h, &mut publisher, &["PUBLISH", "news", "still here"]),
            Reply::integer(1)
        );
    }

    #[test]
    fn info_reports_required_fields() {
        let h = handler();
        let (mut c, _rx) = client(1);
        run(&h, &mut c, &["SET", "a", "1"]);
        run(&h, &mut c, &["SET", "b", "2"]);

        let Reply::Bulk(info) = run(&h, &mut c, &["INFO"]) else {
            panic!("INFO must be a bulk string");
        };
        let text = String::from_utf8(info.to_vec()).unwrap();
        assert!(text.contains("blazekv_version:"));
        assert!(text.contains("connected_clients:0"));
        assert!(text.contains(&format!("used_memory:{}", 2 * ENTRY_FOOTPRINT_BYTES)));
        assert!(text.contains("db0:keys=2"));
    }
}
