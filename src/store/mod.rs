pub mod json_store;
pub mod memory_store;
pub mod schema;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable string-to-JSON storage. Values are JSON documents stored as text.
pub trait KeyValueStore {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Keys currently present, in no particular order.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> StoreResult<Option<T>> {
    match store.get(key)? {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

/// Storage keys are used as file stems, so only a conservative alphabet is accepted.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_store::MemoryStore;

    #[test]
    fn validate_key_accepts_storage_names() {
        assert!(validate_key("completed-tutorials").is_ok());
        assert!(validate_key("phrasesAchieved").is_ok());
        assert!(validate_key("charTimer_session_1700000000000").is_ok());
    }

    #[test]
    fn validate_key_rejects_paths() {
        assert!(validate_key("").is_err());
        assert!(validate_key("../profile").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("with space").is_err());
    }

    #[test]
    fn json_helpers_round_trip_through_store() {
        let store = MemoryStore::new();
        save_json(&store, "numbers", &vec![1, 2, 3]).unwrap();
        let loaded: Option<Vec<i32>> = load_json(&store, "numbers").unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        let missing: Option<Vec<i32>> = load_json(&store, "absent").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn load_json_reports_corrupt_values() {
        let store = MemoryStore::new();
        store.set("broken", "{not json").unwrap();
        let result: StoreResult<Option<Vec<String>>> = load_json(&store, "broken");
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
