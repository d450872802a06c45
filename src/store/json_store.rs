use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::store::{KeyValueStore, StoreResult, validate_key};

/// One JSON file per storage key under a base directory.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn with_base_dir(base_dir: PathBuf) -> StoreResult<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonStore {
    fn name(&self) -> &str {
        "json"
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        let path = self.file_path(key);
        if path.exists() {
            Ok(Some(fs::read_to_string(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Write-to-temp then rename, so a crash never leaves a half-written value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        let path = self.file_path(key);
        let tmp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        let path = self.file_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_set_then_get() {
        let (_dir, store) = make_test_store();
        store.set("completed-tutorials", r#"["\r","fdsa"]"#).unwrap();
        assert_eq!(
            store.get("completed-tutorials").unwrap().as_deref(),
            Some(r#"["\r","fdsa"]"#)
        );
        assert!(store.file_path("completed-tutorials").exists());
    }

    #[test]
    fn test_missing_key_is_none() {
        let (_dir, store) = make_test_store();
        assert!(store.get("phrasesAchieved").unwrap().is_none());
    }

    #[test]
    fn test_set_leaves_no_tmp_files() {
        let (dir, store) = make_test_store();
        store.set("tutorial-state", r#"{"currentStep":1}"#).unwrap();
        store.set("tutorial-state", r#"{"currentStep":2}"#).unwrap();

        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
        assert_eq!(
            store.get("tutorial-state").unwrap().as_deref(),
            Some(r#"{"currentStep":2}"#)
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, store) = make_test_store();
        store.set("phrasesAchieved", "[]").unwrap();
        store.remove("phrasesAchieved").unwrap();
        store.remove("phrasesAchieved").unwrap();
        assert!(store.get("phrasesAchieved").unwrap().is_none());
    }

    #[test]
    fn test_keys_lists_json_stems_only() {
        let (dir, store) = make_test_store();
        store.set("charTimer_session_1", "[]").unwrap();
        store.set("charTimer_session_2", "[]").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["charTimer_session_1", "charTimer_session_2"]);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let (_dir, store) = make_test_store();
        let result = store.set("../escape", "[]");
        assert!(matches!(result, Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let (dir, _store) = make_test_store();
        let bad_store = JsonStore {
            base_dir: dir.path().join("nonexistent_subdir"),
        };
        assert!(matches!(
            bad_store.set("phrasesAchieved", "[]"),
            Err(StoreError::Io(_))
        ));
    }
}
