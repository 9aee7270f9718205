//! Keyspace Store with Lazy Expiry
//!
//! This module implements the storage engine: a single map from key to
//! [`Entry`], guarded by one mutex. Every read and write, including the
//! delete performed when an expired entry is noticed, happens under that lock.
//!
//! ## Expiry
//!
//! Entries carry an optional absolute deadline. Nothing sweeps the map in the
//! background; an entry stays visible until the first operation that observes
//! its deadline has passed, and that operation removes it.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              StorageEngine               │
//! │   Mutex<HashMap<Bytes, Entry>>           │
//! │                                          │
//! │   read ──► expired? ──► remove, absent   │
//! │                 └─────► value            │
//! └──────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// A stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The actual value stored
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates a new entry expiring at `deadline`.
    pub fn with_expiry(value: Bytes, deadline: Instant) -> Self {
        Self {
            value,
            expires_at: Some(deadline),
        }
    }

    fn from_deadline(value: Bytes, deadline: Option<Instant>) -> Self {
        match deadline {
            Some(deadline) => Self::with_expiry(value, deadline),
            None => Self::new(value),
        }
    }

    /// Checks whether this entry's deadline has passed at `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// Existence condition gating a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetCondition {
    /// Write regardless of the current state
    #[default]
    Always,
    /// Write only if the key is absent (NX)
    IfAbsent,
    /// Write only if the key is present (XX)
    IfPresent,
}

/// What happens to the entry's deadline on a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryOption {
    /// The new entry never expires
    #[default]
    Never,
    /// Carry over the deadline of the live entry being replaced (KEEPTTL)
    Keep,
    /// Expire at the given instant (EX / PX)
    At(Instant),
}

/// Options for [`StorageEngine::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetOptions {
    pub condition: SetCondition,
    pub expiry: ExpiryOption,
}

/// Storage statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageStats {
    pub keys: usize,
    pub get_ops: u64,
    pub set_ops: u64,
    pub expired: u64,
}

/// The keyspace shared by every client connection.
///
/// Wrap it in an `Arc` and hand a clone to each connection's command handler.
///
/// # Example
///
/// ```
/// use quillkv::storage::StorageEngine;
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// engine.write(Bytes::from("name"), Bytes::from("Ariz"), None);
/// assert_eq!(engine.read(b"name"), Some(Bytes::from("Ariz")));
/// assert_eq!(engine.read(b"missing"), None);
/// ```
#[derive(Debug, Default)]
pub struct StorageEngine {
    data: Mutex<HashMap<Bytes, Entry>>,

    get_count: AtomicU64,
    set_count: AtomicU64,
    expired_count: AtomicU64,
}

impl StorageEngine {
    /// Creates an empty storage engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the keyspace. The map only holds plain values, so a panic in
    /// another holder cannot leave it inconsistent and poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<Bytes, Entry>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unconditionally inserts or replaces `key`.
    pub fn write(&self, key: Bytes, value: Bytes, expires_at: Option<Instant>) {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .insert(key, Entry::from_deadline(value, expires_at));
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired
    /// entry is removed as a side effect.
    pub fn read(&self, key: &[u8]) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        let mut data = self.lock();
        match data.get(key) {
            Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        data.remove(key);
        self.expired_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Removes `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Writes `key` subject to `options`, atomically with respect to every
    /// other store operation.
    ///
    /// The current entry is lazily expired first, so an expired key counts as
    /// absent for both the existence condition and `KEEPTTL`.
    ///
    /// Returns `false` (and leaves the store untouched apart from the lazy
    /// expiry) when the existence condition fails.
    pub fn set(&self, key: Bytes, value: Bytes, options: SetOptions) -> bool {
        let now = Instant::now();
        let mut data = self.lock();

        let current = data
            .get(&key)
            .map(|entry| (entry.is_expired_at(now), entry.expires_at));
        let current_expiry = match current {
            Some((true, _)) => {
                data.remove(&key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some((false, expires_at)) => Some(expires_at),
            None => None,
        };
        let exists = current_expiry.is_some();

        match options.condition {
            SetCondition::IfAbsent if exists => return false,
            SetCondition::IfPresent if !exists => return false,
            _ => {}
        }

        let expires_at = match options.expiry {
            ExpiryOption::Never => None,
            ExpiryOption::Keep => current_expiry.flatten(),
            ExpiryOption::At(deadline) => Some(deadline),
        };

        self.set_count.fetch_add(1, Ordering::Relaxed);
        data.insert(key, Entry::from_deadline(value, expires_at));
        true
    }

    /// Returns a copy of the raw entry for `key`, without expiring it.
    pub fn entry(&self, key: &[u8]) -> Option<Entry> {
        self.lock().get(key).cloned()
    }

    /// Returns the number of stored entries, including expired entries not yet
    /// noticed.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}
