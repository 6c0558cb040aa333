use crate::core::editor::{Editor, RecordDraft};
use crate::core::render::{render_pending_batch, TableView};
use crate::core::staging::StagingStore;
use crate::domain::model::PendingRecord;
use crate::domain::ports::{KeyValueStore, Notifier};
use crate::utils::error::{AppError, Result};
use crate::utils::notice::Notice;
use std::sync::Arc;

/// Row-level edits of the pending batch.
pub struct PendingRecordEditor<S: KeyValueStore> {
    staging: Arc<StagingStore<S>>,
    notifier: Arc<dyn Notifier>,
    editor: Editor<usize, RecordDraft>,
}

impl<S: KeyValueStore> PendingRecordEditor<S> {
    pub fn new(staging: Arc<StagingStore<S>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            staging,
            notifier,
            editor: Editor::new(),
        }
    }

    pub async fn view(&self) -> TableView {
        render_pending_batch(&self.staging.load().await)
    }

    pub async fn open_edit(&mut self, index: usize) -> Result<&mut RecordDraft> {
        let batch = self.staging.load().await;
        let record = batch.get(index).ok_or_else(|| row_not_found(index))?;

        self.editor.open(index, RecordDraft::from(record))?;
        self.editor
            .draft_mut()
            .ok_or_else(|| AppError::validation("Nothing is being edited"))
    }

    pub fn cancel(&mut self) {
        self.editor.cancel();
    }

    pub async fn save_edit(&mut self) -> Result<TableView> {
        let (index, draft) = self.editor.begin_save()?;
        match self.edit_row(index, &draft).await {
            Ok(view) => {
                self.editor.finish();
                Ok(view)
            }
            Err(e) => {
                self.editor.fail();
                Err(e)
            }
        }
    }

    pub async fn edit_row(&self, index: usize, draft: &RecordDraft) -> Result<TableView> {
        let mut batch = self.staging.load().await;
        let record = batch.get_mut(index).ok_or_else(|| row_not_found(index))?;
        draft.apply_to(record);

        Ok(self.persist(batch, "Record updated").await)
    }

    /// 刪除最後一筆時直接清除批次
    pub async fn delete_row(&self, index: usize) -> Result<TableView> {
        let mut batch = self.staging.load().await;
        if index >= batch.len() {
            return Err(row_not_found(index));
        }
        let removed = batch.remove(index);
        tracing::debug!("🗑️ Removed pending record {} ({})", index, removed.order_number);

        Ok(self.persist(batch, "Record deleted").await)
    }

    async fn persist(&self, batch: Vec<PendingRecord>, done: &str) -> TableView {
        if !self.staging.store_or_clear(&batch).await {
            self.notifier
                .notify(Notice::warning("Could not store the pending batch; changes may be lost"));
            return render_pending_batch(&batch);
        }

        self.notifier.notify(Notice::success(done));
        render_pending_batch(&self.staging.load().await)
    }
}

fn row_not_found(index: usize) -> AppError {
    AppError::not_found(format!("Pending record {}", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryKeyValueStore;
    use crate::core::staging::DEFAULT_BATCH_KEY;
    use crate::domain::ports::KeyValueStore;
    use crate::utils::notice::{NoticeBoard, NoticeLevel};

    /// 可讀不可寫
    #[derive(Clone)]
    struct ReadOnlyStore(MemoryKeyValueStore);

    impl KeyValueStore for ReadOnlyStore {
        async fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.0.get_item(key).await
        }

        async fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(AppError::LocalStateError {
                message: "quota exceeded".to_string(),
            })
        }

        async fn remove_item(&self, _key: &str) -> Result<()> {
            Err(AppError::LocalStateError {
                message: "quota exceeded".to_string(),
            })
        }
    }

    fn pending(order_number: &str) -> PendingRecord {
        PendingRecord {
            order_number: order_number.to_string(),
            shipping_cost: 500.0,
            total_amount: 500.0,
            ..PendingRecord::default()
        }
    }

    #[tokio::test]
    async fn test_delete_rows_until_empty() {
        let store = MemoryKeyValueStore::new();
        let staging = Arc::new(StagingStore::new(store.clone()));
        staging.save(&[pending("1"), pending("2")]).await;
        let editor = PendingRecordEditor::new(staging.clone(), Arc::new(NoticeBoard::default()));

        let view = editor.delete_row(0).await.unwrap();
        assert_eq!(view.rows().len(), 1);
        assert_eq!(staging.load().await[0].order_number, "2");

        let view = editor.delete_row(0).await.unwrap();
        assert!(view.is_empty());
        assert_eq!(store.get_item(DEFAULT_BATCH_KEY).await.unwrap(), None);

        assert!(matches!(editor.delete_row(0).await, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_edit_row_scalar_fields() {
        let staging = Arc::new(StagingStore::new(MemoryKeyValueStore::new()));
        staging.save(&[pending("1")]).await;
        let mut editor = PendingRecordEditor::new(staging.clone(), Arc::new(NoticeBoard::default()));

        let draft = editor.open_edit(0).await.unwrap();
        draft.person_in_charge = "佐藤".to_string();
        draft.shipping_cost = 800.0;
        draft.total_amount = 0.0;
        editor.save_edit().await.unwrap();

        let stored = &staging.load().await[0];
        assert_eq!(stored.person_in_charge, "佐藤");
        assert_eq!(stored.total_amount, 800.0);
    }

    #[tokio::test]
    async fn test_views_are_rendered_from_stored_batch() {
        let staging = Arc::new(StagingStore::new(MemoryKeyValueStore::new()));
        staging.save(&[pending("1"), pending("2")]).await;
        let editor = PendingRecordEditor::new(staging.clone(), Arc::new(NoticeBoard::default()));

        let draft = RecordDraft {
            order_number: "3".to_string(),
            ..RecordDraft::from(&pending("1"))
        };
        let view = editor.edit_row(1, &draft).await.unwrap();
        assert_eq!(view, render_pending_batch(&staging.load().await));

        let view = editor.delete_row(0).await.unwrap();
        assert_eq!(view, render_pending_batch(&staging.load().await));
        assert_eq!(view.rows()[0].cells[1], "3");
    }

    #[tokio::test]
    async fn test_failed_write_renders_edit_and_warns() {
        let memory = MemoryKeyValueStore::new();
        StagingStore::new(memory.clone()).save(&[pending("1")]).await;

        let staging = Arc::new(StagingStore::new(ReadOnlyStore(memory)));
        let board = Arc::new(NoticeBoard::default());
        let editor = PendingRecordEditor::new(staging.clone(), board.clone());

        let draft = RecordDraft {
            person_in_charge: "佐藤".to_string(),
            ..RecordDraft::from(&pending("1"))
        };
        let view = editor.edit_row(0, &draft).await.unwrap();

        assert_ne!(view, render_pending_batch(&staging.load().await));
        assert_eq!(staging.load().await[0].person_in_charge, "");
        assert_eq!(board.current().unwrap().level, NoticeLevel::Warning);
    }
}
