use crate::domain::ports::KeyValueStore;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 每個鍵存成資料目錄下的一個檔案
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    base_path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for FileKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        tokio::fs::create_dir_all(&self.base_path).await?;

        // 先寫暫存檔再改名，避免讀到寫一半的內容
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value.as_bytes()).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().await;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().await;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock().await;
        items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path().join("state"));

        assert_eq!(store.get_item("pendingImport").await.unwrap(), None);

        store.set_item("pendingImport", "[]").await.unwrap();
        assert_eq!(
            store.get_item("pendingImport").await.unwrap().as_deref(),
            Some("[]")
        );
        assert!(temp_dir.path().join("state/pendingImport.json").exists());

        store.remove_item("pendingImport").await.unwrap();
        assert_eq!(store.get_item("pendingImport").await.unwrap(), None);
        // 重複刪除不視為錯誤
        store.remove_item("pendingImport").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_sanitizes_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path());

        store.set_item("../escape/key", "x").await.unwrap();
        assert!(temp_dir.path().join("___escape_key.json").exists());
        assert_eq!(store.get_item("../escape/key").await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_state() {
        let store = MemoryKeyValueStore::new();
        let other = store.clone();

        store.set_item("k", "v").await.unwrap();
        assert_eq!(other.get_item("k").await.unwrap().as_deref(), Some("v"));

        other.remove_item("k").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), None);
    }
}
