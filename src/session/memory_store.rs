//! In-process [`SessionStore`] with Redis list semantics.
//!
//! Selected with `store.backend = "memory"` for running the service without a
//! Redis server. Windows do not survive a restart and are not shared between
//! processes. A touched key is checked for expiry on access, and every write
//! sweeps all expired keys so abandoned sessions do not accumulate.

use super::store::{SessionStore, StoreError, ValueType};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
enum StoredValue {
    List(VecDeque<String>),
    /// Plain string value; only lists are ever written by the window manager
    Text(String),
}

#[derive(Debug)]
struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
    window_calls: AtomicUsize,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            window_calls: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("in-memory store is offline".to_string()));
        }
        self.entries
            .lock()
            .map_err(|_| StoreError::Command("in-memory store lock poisoned".to_string()))
    }

    /// Lock for a window operation, dropping `key` first if it has expired.
    fn lock_key(&self, key: &str) -> Result<MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        let mut entries = self.lock()?;
        self.window_calls.fetch_add(1, Ordering::SeqCst);
        if entries.get(key).is_some_and(|entry| entry.is_expired(Instant::now())) {
            entries.remove(key);
        }
        Ok(entries)
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn value_type(&self, key: &str) -> Result<ValueType, StoreError> {
        let entries = self.lock_key(key)?;
        Ok(match entries.get(key).map(|entry| &entry.value) {
            None => ValueType::None,
            Some(StoredValue::List(_)) => ValueType::List,
            Some(StoredValue::Text(_)) => ValueType::Other("string".to_string()),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.lock_key(key)?;
        entries.remove(key);
        Ok(())
    }

    async fn push_bounded(
        &self,
        key: &str,
        entry: &str,
        max_len: usize,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        // The whole group runs under one lock acquisition
        let mut entries = self.lock_key(key)?;
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));

        let slot = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: StoredValue::List(VecDeque::new()),
            expires_at: None,
        });

        let list = match &mut slot.value {
            StoredValue::List(list) => list,
            StoredValue::Text(_) => {
                return Err(StoreError::Command(
                    "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
                ))
            }
        };

        list.push_back(entry.to_string());
        while list.len() > max_len {
            list.pop_front();
        }
        slot.expires_at = Some(now + ttl);
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.lock_key(key)?;
        match entries.get(key).map(|entry| &entry.value) {
            None => Ok(Vec::new()),
            Some(StoredValue::List(list)) => Ok(list.iter().cloned().collect()),
            Some(StoredValue::Text(_)) => Err(StoreError::Command(
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
            )),
        }
    }
}

#[cfg(test)]
impl InMemorySessionStore {
    /// Simulate the store going down or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of key-level operations served so far (`ping` excluded).
    pub fn window_calls(&self) -> usize {
        self.window_calls.load(Ordering::SeqCst)
    }

    /// Seed a plain string value, like the placeholder an eager session
    /// creation would have written.
    pub fn set_text(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: StoredValue::Text(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
    }

    /// Keys currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Remaining time to live of `key`, if it exists and has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().unwrap();
        let now = Instant::now();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at - now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn test_push_bounded_keeps_tail() {
        let store = InMemorySessionStore::new();
        for value in ["a", "b", "c", "d"] {
            store.push_bounded("k", value, 3, TTL).await.unwrap();
        }
        assert_eq!(store.range("k").await.unwrap(), vec!["b", "c", "d"]);
        assert_eq!(store.value_type("k").await.unwrap(), ValueType::List);
    }

    #[tokio::test]
    async fn test_range_of_missing_key_is_empty() {
        let store = InMemorySessionStore::new();
        assert!(store.range("missing").await.unwrap().is_empty());
        assert_eq!(store.value_type("missing").await.unwrap(), ValueType::None);
    }

    #[tokio::test]
    async fn test_push_onto_string_is_wrongtype() {
        let store = InMemorySessionStore::new();
        store.set_text("k", "session_start", None);
        assert!(matches!(
            store.push_bounded("k", "x", 3, TTL).await,
            Err(StoreError::Command(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_expire_after_ttl() {
        let store = InMemorySessionStore::new();
        store.push_bounded("k", "a", 3, TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(599)).await;
        assert_eq!(store.range("k").await.unwrap(), vec!["a"]);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.range("k").await.unwrap().is_empty());
        assert_eq!(store.value_type("k").await.unwrap(), ValueType::None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_evict_abandoned_sessions() {
        let store = InMemorySessionStore::new();
        store.push_bounded("session:a", "a", 3, TTL).await.unwrap();
        store.push_bounded("session:b", "b", 3, TTL).await.unwrap();
        assert_eq!(store.len(), 2);

        tokio::time::advance(Duration::from_secs(601)).await;
        store.push_bounded("session:c", "c", 3, TTL).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.range("session:c").await.unwrap(), vec!["c"]);
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let store = InMemorySessionStore::new();
        store.set_available(false);
        assert!(matches!(store.ping().await, Err(StoreError::Connection(_))));
        assert!(store.range("k").await.is_err());

        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }
}
