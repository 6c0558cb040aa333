use crate::core::normalizer::Normalizer;
use crate::domain::model::PendingRecord;
use crate::domain::ports::KeyValueStore;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const DEFAULT_BATCH_KEY: &str = "pendingImport";
pub const DEFAULT_MARKER_KEY: &str = "pendingImportUpdatedAt";

/// Published after every write to the staging batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Saved { len: usize, marker: String },
    Cleared { marker: String },
}

/// 待保存批次的唯一持久副本。
///
/// 所有修改都走「重新讀取 → 修改 → 立即寫回」，記憶體中的資料只是快取。
/// 寫入失敗不會中斷呼叫端，但會回傳 `false` 讓呼叫端提示使用者。
pub struct StagingStore<S: KeyValueStore> {
    store: S,
    batch_key: String,
    marker_key: String,
    normalizer: Normalizer,
    events: broadcast::Sender<BatchEvent>,
}

impl<S: KeyValueStore> StagingStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_keys(store, DEFAULT_BATCH_KEY, DEFAULT_MARKER_KEY)
    }

    pub fn with_keys(store: S, batch_key: impl Into<String>, marker_key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            store,
            batch_key: batch_key.into(),
            marker_key: marker_key.into(),
            normalizer: Normalizer::default(),
            events,
        }
    }

    /// Normalizer used when a stored batch is not in canonical form.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }

    /// 讀不到或無法解析時回傳空批次，並丟棄無法解析的內容
    pub async fn load(&self) -> Vec<PendingRecord> {
        let raw = match self.store.get_item(&self.batch_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("⚠️ Could not read staging batch '{}': {}", self.batch_key, e);
                return Vec::new();
            }
        };

        match self.decode(&raw) {
            Some(batch) => batch,
            None => {
                tracing::warn!(
                    "⚠️ Discarding unreadable staging batch '{}' ({} bytes)",
                    self.batch_key,
                    raw.len()
                );
                if let Err(e) = self.store.remove_item(&self.batch_key).await {
                    tracing::warn!("⚠️ Could not discard staging batch: {}", e);
                }
                Vec::new()
            }
        }
    }

    pub async fn save(&self, batch: &[PendingRecord]) -> bool {
        let encoded = match serde_json::to_string(batch) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!("⚠️ Could not encode staging batch: {}", e);
                return false;
            }
        };

        if let Err(e) = self.store.set_item(&self.batch_key, &encoded).await {
            tracing::warn!("⚠️ Could not persist staging batch '{}': {}", self.batch_key, e);
            return false;
        }

        let marker = self.touch_marker().await;
        tracing::debug!("💾 Staging batch saved ({} records)", batch.len());
        let _ = self.events.send(BatchEvent::Saved {
            len: batch.len(),
            marker,
        });
        true
    }

    pub async fn clear(&self) -> bool {
        if let Err(e) = self.store.remove_item(&self.batch_key).await {
            tracing::warn!("⚠️ Could not clear staging batch '{}': {}", self.batch_key, e);
            return false;
        }

        let marker = self.touch_marker().await;
        tracing::debug!("🧹 Staging batch cleared");
        let _ = self.events.send(BatchEvent::Cleared { marker });
        true
    }

    /// Saves a non-empty batch, clears the key for an empty one.
    pub async fn store_or_clear(&self, batch: &[PendingRecord]) -> bool {
        if batch.is_empty() {
            self.clear().await
        } else {
            self.save(batch).await
        }
    }

    pub async fn marker(&self) -> Option<String> {
        match self.store.get_item(&self.marker_key).await {
            Ok(marker) => marker,
            Err(e) => {
                tracing::debug!("Could not read change marker: {}", e);
                None
            }
        }
    }

    async fn touch_marker(&self) -> String {
        let marker = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        if let Err(e) = self.store.set_item(&self.marker_key, &marker).await {
            tracing::warn!("⚠️ Could not update change marker: {}", e);
        }
        marker
    }

    fn decode(&self, raw: &str) -> Option<Vec<PendingRecord>> {
        if let Ok(batch) = serde_json::from_str::<Vec<PendingRecord>>(raw) {
            return Some(batch);
        }

        // 舊格式或直接存入的匯入結果：逐筆正規化；含非物件元素視為損毀
        match serde_json::from_str::<Value>(raw).ok()? {
            Value::Array(items) if items.iter().all(Value::is_object) => {
                Some(self.normalizer.normalize_all(&items))
            }
            object @ Value::Object(_) => Some(vec![self.normalizer.normalize(&object)]),
            _ => None,
        }
    }
}

/// 以固定間隔輪詢變更標記，察覺其他行程寫入的批次
pub struct ChangeWatcher<S: KeyValueStore> {
    staging: Arc<StagingStore<S>>,
    interval: Duration,
    last_seen: Option<String>,
}

impl<S: KeyValueStore> ChangeWatcher<S> {
    pub async fn start(staging: Arc<StagingStore<S>>, interval: Duration) -> Self {
        let last_seen = staging.marker().await;
        Self {
            staging,
            interval,
            last_seen,
        }
    }

    /// Returns the new marker when it moved since the last poll.
    pub async fn poll_once(&mut self) -> Option<String> {
        let current = self.staging.marker().await;
        if current == self.last_seen {
            return None;
        }
        self.last_seen = current.clone();
        current
    }

    pub async fn next_change(&mut self) -> String {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Some(marker) = self.poll_once().await {
                return marker;
            }
        }
    }
}
