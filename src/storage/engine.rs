//! Typed Key-Space with TTL Support
//!
//! This module implements the core store: a mapping from binary keys to
//! typed values (string, list, hash, set) with optional expiry deadlines.
//!
//! ## Design Decisions
//!
//! 1. **Tagged union values**: a key holds exactly one [`Value`] variant for
//!    its whole lifetime. Type transitions only happen through deletion and
//!    re-insertion (`SET` replaces whole entries and may change the type;
//!    type-specific commands never do).
//! 2. **One reader/writer lock**: every command executes as a single
//!    critical section, so no command ever observes another command's
//!    partial update, and multi-key commands (`DEL`, `EXISTS`) are atomic
//!    across all named keys.
//! 3. **Lazy + active expiry**: every path checks the deadline up front and
//!    treats an expired entry as absent. Read paths leave the corpse in
//!    place (a shared lock cannot remove it); write paths replace or drop
//!    it; the background [reaper](crate::storage::expiry) reclaims the rest.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                    Store                     │
//! │  ┌────────────────────────────────────────┐  │
//! │  │   RwLock<HashMap<Bytes, Entry>>        │  │
//! │  │                                        │  │
//! │  │   reads:  GET LRANGE HGETALL TTL ...   │  │
//! │  │   writes: SET DEL LPUSH HSET reap ...  │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error returned when a type-specific operation hits a value of another
/// type. The dispatcher maps this to the `WRONGTYPE` error reply.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("operation against a key holding the wrong kind of value")]
pub struct WrongType;

/// A stored value. Exactly one variant is ever active for a given key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Arbitrary byte string.
    Str(Bytes),
    /// Ordered sequence with O(1) push/pop at both ends.
    List(VecDeque<Bytes>),
    /// Field-to-value mapping; field order is not observable.
    Hash(HashMap<Bytes, Bytes>),
    /// Unordered collection of distinct members.
    Set(HashSet<Bytes>),
}

/// A value plus its optional expiry deadline.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    /// Absolute monotonic deadline. Once passed, the entry is logically
    /// absent to every observer whether or not it is still in the map.
    pub expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn empty_list() -> Self {
        Entry::new(Value::List(VecDeque::new()), None)
    }

    fn empty_hash() -> Self {
        Entry::new(Value::Hash(HashMap::new()), None)
    }

    fn empty_set() -> Self {
        Entry::new(Value::Set(HashSet::new()), None)
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// The key-space shared by every connection and the reaper.
///
/// Designed to be wrapped in an `Arc` and cloned into each connection task.
/// All methods take `&self`; interior mutability lives in the lock.
#[derive(Debug, Default)]
pub struct Store {
    entries: RwLock<HashMap<Bytes, Entry>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` as a string under `key`, replacing any prior value of
    /// any type. Any prior expiry is dropped unless `ttl` re-specifies one.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key, Entry::new(Value::Str(value), ttl));
    }

    /// Returns the string value under `key`.
    ///
    /// `Ok(None)` for absent or expired keys; `Err(WrongType)` when the key
    /// holds a non-string value.
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>, WrongType> {
        let entries = self.entries.read().unwrap();
        match entries.get(key) {
            None => Ok(None),
            Some(entry) if entry.is_expired() => Ok(None),
            Some(entry) => match &entry.value {
                Value::Str(value) => Ok(Some(value.clone())),
                _ => Err(WrongType),
            },
        }
    }

    /// Removes every named key, returning how many were logically present.
    ///
    /// Expired entries are reclaimed but not counted.
    pub fn del(&self, keys: &[Bytes]) -> u64 {
        let mut entries = self.entries.write().unwrap();
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(&key[..]) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Counts how many of the named keys are present and not expired.
    /// A repeated key counts once per occurrence.
    pub fn exists(&self, keys: &[Bytes]) -> u64 {
        let entries = self.entries.read().unwrap();
        keys.iter()
            .filter(|key| entries.get(&key[..]).is_some_and(|e| !e.is_expired()))
            .count() as u64
    }

    /// Sets the expiry of a live key to now + `ttl`. Returns false for
    /// absent or expired keys (the latter are reclaimed on the spot).
    pub fn expire(&self, key: &[u8], ttl: Duration) -> bool {
        let mut entries = self.entries.write().unwrap();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        if entry.is_expired() {
            entries.remove(key);
            return false;
        }
        entry.expires_at = Some(Instant::now() + ttl);
        true
    }

    /// Remaining time-to-live in whole seconds: −2 for absent/expired keys,
    /// −1 for keys without expiry.
    pub fn ttl(&self, key: &[u8]) -> i64 {
        let entries = self.entries.read().unwrap();
        match entries.get(key) {
            None => -2,
            Some(entry) if entry.is_expired() => -2,
            Some(entry) => match entry.expires_at {
                None => -1,
                Some(deadline) => {
                    deadline.saturating_duration_since(Instant::now()).as_secs() as i64
                }
            },
        }
    }

    /// Pushes values to the head of the list under `key`, creating it if the
    /// key is absent or expired. Returns the new length.
    pub fn lpush(&self, key: Bytes, values: Vec<Bytes>) -> Result<usize, WrongType> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(key).or_insert_with(Entry::empty_list);
        if entry.is_expired() {
            *entry = Entry::empty_list();
        }
        match &mut entry.value {
            Value::List(items) => {
                for value in values {
                    items.push_front(value);
                }
                Ok(items.len())
            }
            _ => Err(WrongType),
        }
    }

    /// Pushes values to the tail of the list under `key`, creating it if the
    /// key is absent or expired. Returns the new length.
    pub fn rpush(&self, key: Bytes, values: Vec<Bytes>) -> Result<usize, WrongType> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(key).or_insert_with(Entry::empty_list);
        if entry.is_expired() {
            *entry = Entry::empty_list();
        }
        match &mut entry.value {
            Value::List(items) => {
                items.extend(values);
                Ok(items.len())
            }
            _ => Err(WrongType),
        }
    }

    /// Removes and returns the head of the list under `key`.
    pub fn lpop(&self, key: &[u8]) -> Option<Bytes> {
        self.pop(key, true)
    }

    /// Removes and returns the tail of the list under `key`.
    pub fn rpop(&self, key: &[u8]) -> Option<Bytes> {
        self.pop(key, false)
    }

    fn pop(&self, key: &[u8], from_front: bool) -> Option<Bytes> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries.get_mut(key)?;
        if entry.is_expired() {
            entries.remove(key);
            return None;
        }
        let Value::List(items) = &mut entry.value else {
            return None;
        };
        let popped = if from_front {
            items.pop_front()
        } else {
            items.pop_back()
        };
        // A drained list does not linger as an empty key.
        if items.is_empty() {
            entries.remove(key);
        }
        popped
    }

    /// Length of the list under `key`; 0 for absent or expired keys.
    pub fn llen(&self, key: &[u8]) -> Result<usize, WrongType> {
        let entries = self.entries.read().unwrap();
        match entries.get(key) {
            None => Ok(0),
            Some(entry) if entry.is_expired() => Ok(0),
            Some(entry) => match &entry.value {
                Value::List(items) => Ok(items.len()),
                _ => Err(WrongType),
            },
        }
    }

    /// Elements of the list under `key` between `start` and `stop`
    /// inclusive. Negative indices count from the end (−1 is the last
    /// element); out-of-range indices are clamped. Absent, expired and
    /// non-list keys all produce an empty range.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Vec<Bytes> {
        let entries = self.entries.read().unwrap();
        let Some(entry) = entries.get(key) else {
            return Vec::new();
        };
        if entry.is_expired() {
            return Vec::new();
        }
        let Value::List(items) = &entry.value else {
            return Vec::new();
        };

        let len = items.len() as i64;
        let mut start = if start < 0 { start + len } else { start };
        let mut stop = if stop < 0 { stop + len } else { stop };
        if start < 0 {
            start = 0;
        }
        if stop >= len {
            stop = len - 1;
        }
        if len == 0 || start > stop {
            return Vec::new();
        }

        items
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect()
    }

    /// Sets fields on the hash under `key`, creating it if the key is absent
    /// or expired. Returns how many fields did not previously exist
    /// (updated fields do not count).
    pub fn hset(&self, key: Bytes, pairs: Vec<(Bytes, Bytes)>) -> Result<u64, WrongType> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(key).or_insert_with(Entry::empty_hash);
        if entry.is_expired() {
            *entry = Entry::empty_hash();
        }
        match &mut entry.value {
            Value::Hash(fields) => {
                let mut added = 0;
                for (field, value) in pairs {
                    if fields.insert(field, value).is_none() {
                        added += 1;
                    }
                }
                Ok(added)
            }
            _ => Err(WrongType),
        }
    }

    /// Value of `field` in the hash under `key`; `None` when the key or
    /// field is absent, expired, or the key holds another type.
    pub fn hget(&self, key: &[u8], field: &[u8]) -> Option<Bytes> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(key)?;
        if entry.is_expired() {
            return None;
        }
        match &entry.value {
            Value::Hash(fields) => fields.get(field).cloned(),
            _ => None,
        }
    }

    /// Removes fields from the hash under `key`, returning how many were
    /// removed. 0 when the key is absent, expired, or holds another type.
    pub fn hdel(&self, key: &[u8], fields: &[Bytes]) -> u64 {
        let mut entries = self.entries.write().unwrap();
        let Some(entry) = entries.get_mut(key) else {
            return 0;
        };
        if entry.is_expired() {
            entries.remove(key);
            return 0;
        }
        match &mut entry.value {
            Value::Hash(map) => fields
                .iter()
                .filter(|field| map.remove(&field[..]).is_some())
                .count() as u64,
            _ => 0,
        }
    }

    /// All field/value pairs of the hash under `key`; empty when absent,
    /// expired, or another type.
    pub fn hgetall(&self, key: &[u8]) -> Vec<(Bytes, Bytes)> {
        let entries = self.entries.read().unwrap();
        let Some(entry) = entries.get(key) else {
            return Vec::new();
        };
        if entry.is_expired() {
            return Vec::new();
        }
        match &entry.value {
            Value::Hash(fields) => fields
                .iter()
                .map(|(f, v)| (f.clone(), v.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Adds members to the set under `key`, creating it if the key is absent
    /// or expired. Returns how many members were newly added.
    pub fn sadd(&self, key: Bytes, members: Vec<Bytes>) -> Result<u64, WrongType> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries.entry(key).or_insert_with(Entry::empty_set);
        if entry.is_expired() {
            *entry = Entry::empty_set();
        }
        match &mut entry.value {
            Value::Set(members_set) => Ok(members
                .into_iter()
                .filter(|m| members_set.insert(m.clone()))
                .count() as u64),
            _ => Err(WrongType),
        }
    }

    /// Removes members from the set under `key`, returning how many were
    /// removed. 0 when the key is absent, expired, or holds another type.
    pub fn srem(&self, key: &[u8], members: &[Bytes]) -> u64 {
        let mut entries = self.entries.write().unwrap();
        let Some(entry) = entries.get_mut(key) else {
            return 0;
        };
        if entry.is_expired() {
            entries.remove(key);
            return 0;
        }
        match &mut entry.value {
            Value::Set(members_set) => members
                .iter()
                .filter(|m| members_set.remove(&m[..]))
                .count() as u64,
            _ => 0,
        }
    }

    /// Members of the set under `key` in unspecified order; empty when
    /// absent, expired, or another type.
    pub fn smembers(&self, key: &[u8]) -> Vec<Bytes> {
        let entries = self.entries.read().unwrap();
        let Some(entry) = entries.get(key) else {
            return Vec::new();
        };
        if entry.is_expired() {
            return Vec::new();
        }
        match &entry.value {
            Value::Set(members) => members.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Cardinality of the set under `key`; 0 when absent, expired, or
    /// another type.
    pub fn scard(&self, key: &[u8]) -> u64 {
        let entries = self.entries.read().unwrap();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => match &entry.value {
                Value::Set(members) => members.len() as u64,
                _ => 0,
            },
            _ => 0,
        }
    }

    /// Removes every entry.
    pub fn flush(&self) {
        self.entries.write().unwrap().clear();
    }

    /// Number of logically present (non-expired) keys.
    pub fn key_count(&self) -> usize {
        let entries = self.entries.read().unwrap();
        entries.values().filter(|e| !e.is_expired()).count()
    }

    /// Drops every expired entry. Called by the reaper; returns how many
    /// entries were reclaimed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }
}
