use crate::core::editor::{Editor, LineItemDraft};
use crate::core::render::{render_pending_parts, TableView};
use crate::core::staging::StagingStore;
use crate::domain::model::PendingRecord;
use crate::domain::ports::{KeyValueStore, Notifier};
use crate::utils::error::{AppError, Result};
use crate::utils::notice::Notice;
use std::sync::Arc;

/// 待保存記錄的部品明細編輯。
///
/// 每次修改都先從 staging 重新讀取批次，改完立即寫回，
/// 因此其他視窗或行程的寫入不會被舊資料覆蓋。
pub struct LineItemEditor<S: KeyValueStore> {
    staging: Arc<StagingStore<S>>,
    notifier: Arc<dyn Notifier>,
    editor: Editor<(usize, usize), LineItemDraft>,
}

impl<S: KeyValueStore> LineItemEditor<S> {
    pub fn new(staging: Arc<StagingStore<S>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            staging,
            notifier,
            editor: Editor::new(),
        }
    }

    pub async fn view(&self, parent: usize) -> Result<TableView> {
        let batch = self.staging.load().await;
        let record = parent_record(&batch, parent)?;
        Ok(render_pending_parts(record))
    }

    /// Opens the draft for one line, prefilled from the stored batch.
    pub async fn open_edit(&mut self, parent: usize, line: usize) -> Result<&mut LineItemDraft> {
        let batch = self.staging.load().await;
        let current = parent_record(&batch, parent)?
            .line(line)
            .ok_or_else(|| line_not_found(parent, line))?;

        self.editor.open((parent, line), LineItemDraft::from(&current))?;
        self.editor
            .draft_mut()
            .ok_or_else(|| AppError::validation("Nothing is being edited"))
    }

    pub fn draft_mut(&mut self) -> Option<&mut LineItemDraft> {
        self.editor.draft_mut()
    }

    pub fn cancel(&mut self) {
        self.editor.cancel();
    }

    pub async fn save_edit(&mut self) -> Result<TableView> {
        let ((parent, line), draft) = self.editor.begin_save()?;
        match self.edit_line(parent, line, &draft).await {
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

    pub async fn edit_line(&self, parent: usize, line: usize, draft: &LineItemDraft) -> Result<TableView> {
        let mut batch = self.staging.load().await;
        let record = parent_record_mut(&mut batch, parent)?;
        if !record.replace_line(line, draft.to_line()) {
            return Err(line_not_found(parent, line));
        }
        record.recompute_total();

        tracing::debug!("✏️ Updated line {} of pending record {}", line, parent);
        self.persist(batch, parent, "Line item updated").await
    }

    pub async fn delete_line(&self, parent: usize, line: usize) -> Result<TableView> {
        let mut batch = self.staging.load().await;
        let record = parent_record_mut(&mut batch, parent)?;
        if record.remove_line(line).is_none() {
            return Err(line_not_found(parent, line));
        }
        record.recompute_total();

        tracing::debug!("🗑️ Removed line {} of pending record {}", line, parent);
        self.persist(batch, parent, "Line item deleted").await
    }

    async fn persist(&self, batch: Vec<PendingRecord>, parent: usize, done: &str) -> Result<TableView> {
        if !self.staging.save(&batch).await {
            self.notifier
                .notify(Notice::warning("Could not store the pending batch; changes may be lost"));
            return Ok(render_pending_parts(&batch[parent]));
        }

        self.notifier.notify(Notice::success(done));

        // 以寫回後的副本重新繪製
        let stored = self.staging.load().await;
        let record = stored.get(parent).unwrap_or(&batch[parent]);
        Ok(render_pending_parts(record))
    }
}

fn parent_record(batch: &[PendingRecord], parent: usize) -> Result<&PendingRecord> {
    batch
        .get(parent)
        .ok_or_else(|| AppError::not_found(format!("Pending record {}", parent)))
}

fn parent_record_mut(batch: &mut [PendingRecord], parent: usize) -> Result<&mut PendingRecord> {
    batch
        .get_mut(parent)
        .ok_or_else(|| AppError::not_found(format!("Pending record {}", parent)))
}

fn line_not_found(parent: usize, line: usize) -> AppError {
    AppError::not_found(format!("Line {} of pending record {}", line, parent))
}
