use crate::core::render::{render_pending_batch, TableView};
use crate::core::staging::StagingStore;
use crate::domain::model::UploadFile;
use crate::domain::ports::{ImportSource, KeyValueStore, Notifier};
use crate::utils::error::Result;
use crate::utils::notice::Notice;
use crate::utils::validation::validate_upload_files;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub const JSON_EXTENSIONS: &[&str] = &["json"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png"];

/// 匯入結果：新的待保存批次
#[derive(Debug)]
pub struct ImportSummary {
    pub imported: usize,
    pub discarded: usize,
    pub view: TableView,
}

/// Uploads a JSON file or delivery-slip images and stages the result.
///
/// A successful import replaces the whole pending batch.
pub struct Importer<S: KeyValueStore, I: ImportSource> {
    staging: Arc<StagingStore<S>>,
    source: Arc<I>,
    notifier: Arc<dyn Notifier>,
}

impl<S: KeyValueStore, I: ImportSource> Importer<S, I> {
    pub fn new(staging: Arc<StagingStore<S>>, source: Arc<I>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            staging,
            source,
            notifier,
        }
    }

    pub async fn import_file(&self, path: &Path) -> Result<ImportSummary> {
        validate_upload_files(&[path], JSON_EXTENSIONS)?;
        let file = read_upload(path, "application/json").await?;

        tracing::info!("📥 Uploading {}", file.file_name);
        let raw = self.source.upload_file(file).await?;
        self.stage(raw).await
    }

    pub async fn analyze_images<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ImportSummary> {
        validate_upload_files(paths, IMAGE_EXTENSIONS)?;

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(read_upload(path.as_ref(), "image/png").await?);
        }

        self.notifier
            .notify(Notice::info(format!("Analyzing {} image(s)...", files.len())));
        tracing::info!("🔍 Sending {} images for analysis", files.len());
        let raw = self.source.analyze_images(files).await?;
        self.stage(raw).await
    }

    async fn stage(&self, raw: Vec<Value>) -> Result<ImportSummary> {
        let batch = self.staging.normalizer().normalize_all(&raw);

        let discarded = self.staging.load().await.len();
        if discarded > 0 {
            tracing::warn!("⚠️ Import replaces {} pending record(s)", discarded);
            self.notifier.notify(Notice::warning(format!(
                "{} previously pending record(s) were replaced",
                discarded
            )));
        }

        let imported = batch.len();
        let view = if self.staging.store_or_clear(&batch).await {
            self.notifier.notify(Notice::success(format!(
                "Imported {} record(s); review them and save",
                imported
            )));
            // 以寫回後的副本重新繪製
            render_pending_batch(&self.staging.load().await)
        } else {
            self.notifier
                .notify(Notice::warning("Could not store the pending batch; changes may be lost"));
            render_pending_batch(&batch)
        };

        Ok(ImportSummary {
            imported,
            discarded,
            view,
        })
    }
}

async fn read_upload(path: &Path, mime: &'static str) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    Ok(UploadFile {
        file_name,
        mime,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryKeyValueStore;
    use crate::domain::model::PendingRecord;
    use crate::utils::error::AppError;
    use crate::utils::notice::NoticeBoard;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MockSource {
        uploads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImportSource for MockSource {
        async fn upload_file(&self, file: UploadFile) -> Result<Vec<Value>> {
            self.uploads.lock().await.push(file.file_name);
            Ok(vec![json!({
                "出荷日": "25/08/01",
                "受注番号": "1234567",
                "部品番号": ["A", "B"],
                "数量": ["1", "2"],
                "売上単価": ["100", "50"]
            })])
        }

        async fn analyze_images(&self, files: Vec<UploadFile>) -> Result<Vec<Value>> {
            let mut uploads = self.uploads.lock().await;
            uploads.extend(files.into_iter().map(|f| f.file_name));
            Ok(vec![json!({"orderNumber": "1"}), json!({"orderNumber": "2"})])
        }
    }

    fn setup() -> (
        Importer<MemoryKeyValueStore, MockSource>,
        Arc<StagingStore<MemoryKeyValueStore>>,
        Arc<MockSource>,
    ) {
        let staging = Arc::new(StagingStore::new(MemoryKeyValueStore::new()));
        let source = Arc::new(MockSource::default());
        let importer = Importer::new(staging.clone(), source.clone(), Arc::new(NoticeBoard::default()));
        (importer, staging, source)
    }

    #[tokio::test]
    async fn test_import_file_replaces_batch() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("slips.json");
        std::fs::write(&path, "[]").unwrap();

        let (importer, staging, source) = setup();
        staging
            .save(&[PendingRecord::default(), PendingRecord::default()])
            .await;

        let summary = importer.import_file(&path).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.discarded, 2);
        assert_eq!(source.uploads.lock().await.as_slice(), ["slips.json"]);

        let batch = staging.load().await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].sales_amounts, vec![100.0, 100.0]);
        assert_eq!(batch[0].total_amount, 200.0);
        assert_eq!(summary.view, render_pending_batch(&batch));
        assert_eq!(summary.view.rows()[0].cells[1], "1234567");
    }

    #[tokio::test]
    async fn test_analyze_images_requires_png() {
        let temp_dir = TempDir::new().unwrap();
        let png = temp_dir.path().join("slip1.PNG");
        let jpg = temp_dir.path().join("slip2.jpg");
        std::fs::write(&png, b"png").unwrap();
        std::fs::write(&jpg, b"jpg").unwrap();

        let (importer, staging, source) = setup();

        let err = importer.analyze_images(&[&png, &jpg]).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError { .. }));
        assert!(source.uploads.lock().await.is_empty());

        let summary = importer.analyze_images(&[&png]).await.unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(staging.load().await.len(), 2);
    }

    #[tokio::test]
    async fn test_no_files_selected() {
        let (importer, _staging, _source) = setup();
        let paths: Vec<std::path::PathBuf> = Vec::new();
        assert!(importer.analyze_images(&paths).await.is_err());
    }
}
