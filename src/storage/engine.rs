//! Thread-Safe Storage Engine with Expiry Support
//!
//! A single `RwLock` guards the whole key space. Readers share the lock;
//! `SET`, lazy expiry and the sweep take it exclusively.
//!
//! ## Expiry
//!
//! An entry is expired once `now >= expires_at`. The same comparison is used
//! on the read path (lazy expiry) and by [`StorageEngine::cleanup_expired`]
//! (active expiry), so both agree on whether a key is still alive.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The actual value stored
    pub value: Bytes,
    /// When this entry was created
    pub created_at: Instant,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry, expiring `ttl` from now if a TTL is given.
    ///
    /// A TTL too large to represent as an `Instant` is treated as no expiry.
    pub fn new(value: Bytes, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    /// Checks if this entry has expired as of `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// The key-value store shared by every connection.
///
/// Wrap it in an `Arc` and hand a clone to each task that needs it.
///
/// # Example
///
/// ```
/// use kvcache::storage::StorageEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Bytes::from("Ariz"), None);
/// assert_eq!(engine.get(b"name"), Some(Bytes::from("Ariz")));
///
/// engine.set(Bytes::from("session"), Bytes::from("abc123"), Some(Duration::from_secs(60)));
/// ```
#[derive(Debug, Default)]
pub struct StorageEngine {
    data: RwLock<HashMap<Bytes, Entry>>,
}

impl StorageEngine {
    /// Creates an empty storage engine.
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is a single insert/remove/retain, so a poisoned map is
    // still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Entry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Entry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under `key`, replacing any previous entry and its TTL.
    ///
    /// `None` means the key never expires.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was replaced.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) -> bool {
        let entry = Entry::new(value, ttl);
        self.write().insert(key, entry).is_none()
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired
    /// entry is removed by the call that discovers it.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        {
            let data = self.read();
            match data.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired under the read lock: re-check under the write lock, since
        // another writer may have replaced the entry in between.
        let mut data = self.write();
        match data.get(key) {
            Some(entry) if entry.is_expired() => {
                data.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Removes every expired entry in one pass under a single lock acquisition.
    ///
    /// # Returns
    ///
    /// Returns the number of keys that were removed.
    pub fn cleanup_expired(&self) -> u64 {
        let now = Instant::now();
        let mut data = self.write();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired_at(now));
        (before - data.len()) as u64
    }

    /// Returns the number of stored entries, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let engine = StorageEngine::new();
        assert!(engine.set(Bytes::from("key"), Bytes::from("value"), None));
        assert_eq!(engine.get(b"key"), Some(Bytes::from("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get(b"nonexistent"), None);
    }

    #[test]
    fn test_set_replaces_entry_and_ttl() {
        let engine = StorageEngine::new();
        engine.set(
            Bytes::from("key"),
            Bytes::from("old"),
            Some(Duration::from_millis(20)),
        );
        assert!(!engine.set(Bytes::from("key"), Bytes::from("new"), None));

        thread::sleep(Duration::from_millis(40));
        assert_eq!(engine.get(b"key"), Some(Bytes::from("new")));
    }

    #[test]
    fn test_lazy_expiry_removes_entry() {
        let engine = StorageEngine::new();
        engine.set(
            Bytes::from("temp"),
            Bytes::from("value"),
            Some(Duration::from_millis(20)),
        );
        assert_eq!(engine.get(b"temp"), Some(Bytes::from("value")));

        thread::sleep(Duration::from_millis(40));
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.get(b"temp"), None);
        assert_eq!(engine.len(), 0);
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let engine = StorageEngine::new();
        engine.set(Bytes::from("k"), Bytes::from("v"), Some(Duration::ZERO));
        assert_eq!(engine.get(b"k"), None);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let engine = StorageEngine::new();

        engine.set(
            Bytes::from("key1"),
            Bytes::from("value1"),
            Some(Duration::from_millis(10)),
        );
        engine.set(
            Bytes::from("key2"),
            Bytes::from("value2"),
            Some(Duration::from_millis(10)),
        );
        engine.set(
            Bytes::from("key3"),
            Bytes::from("value3"),
            Some(Duration::from_secs(3600)),
        );
        engine.set(Bytes::from("key4"), Bytes::from("value4"), None);

        thread::sleep(Duration::from_millis(50));

        assert_eq!(engine.cleanup_expired(), 2);
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.get(b"key3"), Some(Bytes::from("value3")));
        assert_eq!(engine.get(b"key4"), Some(Bytes::from("value4")));

        assert_eq!(engine.cleanup_expired(), 0);
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let entry = Entry::new(Bytes::from("v"), Some(Duration::from_secs(1)));
        let exp = entry.expires_at.unwrap();
        assert!(!entry.is_expired_at(exp - Duration::from_millis(1)));
        assert!(entry.is_expired_at(exp));

        let forever = Entry::new(Bytes::from("v"), None);
        assert!(!forever.is_expired_at(Instant::now() + Duration::from_secs(86400 * 365)));
    }

    #[test]
    fn test_concurrent_access() {
        let engine = Arc::new(StorageEngine::new());
        let mut handles = vec![];

        for i in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    engine.set(Bytes::from(key.clone()), Bytes::from("value"), None);
                    assert_eq!(engine.get(key.as_bytes()), Some(Bytes::from("value")));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 1000);
    }
}
