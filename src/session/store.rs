use async_trait::async_trait;
use std::time::Duration;

/// Type of the value currently stored under a key, as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// Key does not exist
    None,
    List,
    /// Any non-list type (`string`, `hash`, ...)
    Other(String),
}

impl ValueType {
    /// Map a Redis `TYPE` reply onto a [`ValueType`].
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "none" => ValueType::None,
            "list" => ValueType::List,
            other => ValueType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store command failed: {0}")]
    Command(String),
}

/// The list, TTL and type operations the transcript window needs from a
/// key-value store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Round-trip to the store without touching any key.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn value_type(&self, key: &str) -> Result<ValueType, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Append `entry`, keep only the last `max_len` entries and set the key's
    /// TTL to `ttl`, as one atomic unit. Concurrent writers never observe or
    /// interleave with a partially applied group.
    async fn push_bounded(
        &self,
        key: &str,
        entry: &str,
        max_len: usize,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Full list under `key` in insertion order; empty if the key is absent.
    async fn range(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_map_onto_value_types() {
        assert_eq!(ValueType::from_type_name("none"), ValueType::None);
        assert_eq!(ValueType::from_type_name("list"), ValueType::List);
        assert_eq!(
            ValueType::from_type_name("string"),
            ValueType::Other("string".to_string())
        );
        assert_eq!(
            ValueType::from_type_name("hash"),
            ValueType::Other("hash".to_string())
        );
    }
}
