use crate::domain::model::{PendingRecord, PersistedPart, PersistedRecord, SaveReceipt, UploadFile};
use crate::utils::error::Result;
use crate::utils::notice::Notice;
use async_trait::async_trait;

/// 瀏覽器 localStorage 的替代：字串鍵對字串值
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
    fn set_item(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_item(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Persisted-record side of the REST API.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn list_basic_info(&self) -> Result<Vec<PersistedRecord>>;
    async fn list_purchases(&self) -> Result<Vec<PersistedRecord>>;
    async fn list_parts(&self, parent_id: i64) -> Result<Vec<PersistedPart>>;
    async fn save_records(&self, records: &[PendingRecord]) -> Result<SaveReceipt>;
    async fn update_record(&self, id: i64, record: &PersistedRecord) -> Result<()>;
    async fn update_part(&self, id: i64, part: &PersistedPart) -> Result<()>;
    async fn delete_record(&self, id: i64) -> Result<()>;
    async fn delete_part(&self, id: i64) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
}

/// Import side: both endpoints answer with raw, not yet normalized records.
#[async_trait]
pub trait ImportSource: Send + Sync {
    async fn upload_file(&self, file: UploadFile) -> Result<Vec<serde_json::Value>>;
    async fn analyze_images(&self, files: Vec<UploadFile>) -> Result<Vec<serde_json::Value>>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
