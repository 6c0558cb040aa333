//! Saving selected pending records to the backend.
//!
//! One submission at a time: a second `save_selected` while the first is in
//! flight returns [`SaveOutcome::Busy`] without touching the batch.

use crate::core::render::{render_basic_info, render_pending_batch, TableKind, TableView};
use crate::core::staging::StagingStore;
use crate::domain::model::PendingRecord;
use crate::domain::ports::{KeyValueStore, Notifier, RecordBackend};
use crate::utils::error::AppError;
use crate::utils::notice::Notice;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// 使用者勾選的列，依索引排序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<usize>,
}

impl Selection {
    pub fn from_checkboxes(checked: &[bool]) -> Self {
        Self {
            indices: checked
                .iter()
                .enumerate()
                .filter(|(_, checked)| **checked)
                .map(|(index, _)| index)
                .collect(),
        }
    }

    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }

    pub fn all(len: usize) -> Self {
        Self::from_indices(0..len)
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Indices that exist in a batch of `len` records.
    pub fn within(&self, len: usize) -> Vec<usize> {
        self.indices.range(..len).copied().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
}

#[derive(Debug)]
pub enum SaveOutcome {
    NothingToSave,
    NothingSelected,
    Busy,
    /// Some records remain pending.
    Saved {
        saved: usize,
        session_id: Option<String>,
        remaining: TableView,
    },
    /// The batch is now empty; `records` is the refreshed server list.
    AllSaved {
        saved: usize,
        session_id: Option<String>,
        records: TableView,
    },
    Failed {
        reason: String,
    },
}

pub struct SaveOrchestrator<S: KeyValueStore, B: RecordBackend> {
    staging: Arc<StagingStore<S>>,
    backend: Arc<B>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SubmissionState>,
}

struct SubmissionGuard<'a> {
    state: &'a Mutex<SubmissionState>,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = SubmissionState::Idle;
    }
}

impl<S: KeyValueStore, B: RecordBackend> SaveOrchestrator<S, B> {
    pub fn new(staging: Arc<StagingStore<S>>, backend: Arc<B>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            staging,
            backend,
            notifier,
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn state(&self) -> SubmissionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_begin(&self) -> Option<SubmissionGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == SubmissionState::Submitting {
            return None;
        }
        *state = SubmissionState::Submitting;
        Some(SubmissionGuard { state: &self.state })
    }

    pub async fn save_selected(&self, selection: &Selection) -> SaveOutcome {
        let Some(_guard) = self.try_begin() else {
            self.notifier.notify(Notice::warning("A save is already in progress"));
            return SaveOutcome::Busy;
        };

        // 以儲存區的最新內容為準，不信任畫面上的舊資料
        let batch = self.staging.load().await;
        if batch.is_empty() {
            self.notifier.notify(Notice::warning("There are no pending records to save"));
            return SaveOutcome::NothingToSave;
        }

        let indices = selection.within(batch.len());
        if indices.is_empty() {
            self.notifier.notify(Notice::warning("Select at least one record to save"));
            return SaveOutcome::NothingSelected;
        }

        let normalizer = self.staging.normalizer();
        let to_save: Vec<PendingRecord> = indices
            .iter()
            .map(|&i| normalizer.renormalize(&batch[i]))
            .collect();

        self.notifier
            .notify(Notice::info(format!("Saving {} record(s)...", to_save.len())));
        tracing::info!("📤 Submitting {} of {} pending records", to_save.len(), batch.len());
        let marker_before = self.staging.marker().await;

        let receipt = match self.backend.save_records(&to_save).await {
            Ok(receipt) if receipt.success => receipt,
            Ok(receipt) => {
                let reason = receipt
                    .error
                    .unwrap_or_else(|| "Failed to save data".to_string());
                return self.fail(reason);
            }
            Err(e) => return self.fail(failure_reason(&e)),
        };

        let saved = to_save.len();
        let remaining = self.remaining_after(batch, &indices, marker_before).await;

        if !self.staging.store_or_clear(&remaining).await {
            self.notifier
                .notify(Notice::warning("Saved, but the pending batch could not be updated"));
        }

        if !remaining.is_empty() {
            self.notifier.notify(Notice::success(format!(
                "Saved {} record(s); {} still pending",
                saved,
                remaining.len()
            )));
            return SaveOutcome::Saved {
                saved,
                session_id: receipt.session_id,
                remaining: render_pending_batch(&remaining),
            };
        }

        self.notifier
            .notify(Notice::success(format!("Saved {} record(s)", saved)));

        let records = match self.backend.list_basic_info().await {
            Ok(records) => render_basic_info(&records),
            Err(e) => {
                tracing::warn!("⚠️ Could not refresh saved records: {}", e);
                self.notifier.notify(Notice::error(format!(
                    "Could not load saved records: {}",
                    e.user_friendly_message()
                )));
                TableView::Empty(TableKind::BasicInfo)
            }
        };

        SaveOutcome::AllSaved {
            saved,
            session_id: receipt.session_id,
            records,
        }
    }

    /// 扣除已保存的列。送出期間批次被改寫時，以儲存區的最新內容為準。
    async fn remaining_after(
        &self,
        batch: Vec<PendingRecord>,
        saved: &[usize],
        marker_before: Option<String>,
    ) -> Vec<PendingRecord> {
        if self.staging.marker().await == marker_before {
            return batch
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !saved.contains(i))
                .map(|(_, record)| record)
                .collect();
        }

        tracing::info!("🔄 Staging batch changed during save, reconciling with the stored copy");
        let mut submitted: Vec<PendingRecord> = saved.iter().map(|&i| batch[i].clone()).collect();
        self.staging
            .load()
            .await
            .into_iter()
            .filter(|record| match submitted.iter().position(|s| s == record) {
                Some(pos) => {
                    submitted.swap_remove(pos);
                    false
                }
                None => true,
            })
            .collect()
    }

    fn fail(&self, reason: String) -> SaveOutcome {
        tracing::error!("❌ Save failed: {}", reason);
        self.notifier.notify(Notice::error(reason.clone()));
        SaveOutcome::Failed { reason }
    }
}

fn failure_reason(error: &AppError) -> String {
    match error {
        AppError::BackendError { message, .. } => message.clone(),
        other => format!("An error occurred while saving data: {}", other.user_friendly_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryKeyValueStore;
    use crate::domain::model::{PersistedPart, PersistedRecord, SaveReceipt};
    use crate::utils::error::Result;
    use crate::utils::notice::{NoticeBoard, NoticeLevel};
    use async_trait::async_trait;
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Default)]
    struct MockBackend {
        saved: AsyncMutex<Vec<Vec<PendingRecord>>>,
        reject_with: Option<String>,
        /// 另一個畫面在請求期間修改第二筆
        other_view: Option<StagingStore<MemoryKeyValueStore>>,
    }

    #[async_trait]
    impl RecordBackend for MockBackend {
        async fn list_basic_info(&self) -> Result<Vec<PersistedRecord>> {
            let saved = self.saved.lock().await;
            Ok(saved
                .iter()
                .flatten()
                .enumerate()
                .map(|(i, r)| PersistedRecord {
                    id: i as i64 + 1,
                    order_number: r.order_number.clone(),
                    ..PersistedRecord::default()
                })
                .collect())
        }

        async fn list_purchases(&self) -> Result<Vec<PersistedRecord>> {
            self.list_basic_info().await
        }

        async fn list_parts(&self, _parent_id: i64) -> Result<Vec<PersistedPart>> {
            Ok(Vec::new())
        }

        async fn save_records(&self, records: &[PendingRecord]) -> Result<SaveReceipt> {
            if let Some(message) = &self.reject_with {
                return Err(AppError::BackendError {
                    status: 500,
                    message: message.clone(),
                });
            }
            if let Some(other_view) = &self.other_view {
                let mut batch = other_view.load().await;
                batch[1].person_in_charge = "EDITED".to_string();
                assert!(other_view.save(&batch).await);
            }
            self.saved.lock().await.push(records.to_vec());
            Ok(SaveReceipt {
                success: true,
                error: None,
                session_id: Some("session-1".to_string()),
            })
        }

        async fn update_record(&self, _id: i64, _record: &PersistedRecord) -> Result<()> {
            Ok(())
        }

        async fn update_part(&self, _id: i64, _part: &PersistedPart) -> Result<()> {
            Ok(())
        }

        async fn delete_record(&self, _id: i64) -> Result<()> {
            Ok(())
        }

        async fn delete_part(&self, _id: i64) -> Result<()> {
            Ok(())
        }

        async fn delete_all(&self) -> Result<()> {
            Ok(())
        }
    }

    fn pending(order_number: &str) -> PendingRecord {
        PendingRecord {
            order_number: order_number.to_string(),
            ..PendingRecord::default()
        }
    }

    async fn setup(
        backend: MockBackend,
        batch: &[PendingRecord],
    ) -> (
        SaveOrchestrator<MemoryKeyValueStore, MockBackend>,
        Arc<StagingStore<MemoryKeyValueStore>>,
        Arc<MockBackend>,
        Arc<NoticeBoard>,
    ) {
        let staging = Arc::new(StagingStore::new(MemoryKeyValueStore::new()));
        staging.save(batch).await;
        let backend = Arc::new(backend);
        let board = Arc::new(NoticeBoard::default());
        let orchestrator = SaveOrchestrator::new(staging.clone(), backend.clone(), board.clone());
        (orchestrator, staging, backend, board)
    }

    #[test]
    fn test_selection_from_checkboxes() {
        let selection = Selection::from_checkboxes(&[true, false, true]);
        assert_eq!(selection.within(3), vec![0, 2]);
        assert_eq!(selection.within(1), vec![0]);
        assert!(Selection::from_checkboxes(&[false, false]).is_empty());
    }

    #[tokio::test]
    async fn test_partial_save_keeps_unselected_in_order() {
        let batch = [pending("A"), pending("B"), pending("C"), pending("D")];
        let (orchestrator, staging, backend, _board) = setup(MockBackend::default(), &batch).await;

        let outcome = orchestrator
            .save_selected(&Selection::from_indices([1, 3]))
            .await;

        match outcome {
            SaveOutcome::Saved { saved, remaining, .. } => {
                assert_eq!(saved, 2);
                assert_eq!(remaining.rows().len(), 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let sent = backend.saved.lock().await;
        assert_eq!(sent.len(), 1);
        let sent_numbers: Vec<_> = sent[0].iter().map(|r| r.order_number.as_str()).collect();
        assert_eq!(sent_numbers, vec!["B", "D"]);

        let left: Vec<_> = staging
            .load()
            .await
            .into_iter()
            .map(|r| r.order_number)
            .collect();
        assert_eq!(left, vec!["A", "C"]);
        assert_eq!(orchestrator.state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_saving_everything_clears_batch_and_lists_records() {
        let batch = [pending("A"), pending("B")];
        let (orchestrator, staging, _backend, board) = setup(MockBackend::default(), &batch).await;

        let outcome = orchestrator.save_selected(&Selection::all(2)).await;
        match outcome {
            SaveOutcome::AllSaved { saved, session_id, records } => {
                assert_eq!(saved, 2);
                assert_eq!(session_id.as_deref(), Some("session-1"));
                assert_eq!(records.kind(), TableKind::BasicInfo);
                assert_eq!(records.rows().len(), 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(staging.load().await.is_empty());
        assert_eq!(board.current().unwrap().level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_batch_untouched() {
        let backend = MockBackend {
            reject_with: Some("database is locked".to_string()),
            ..MockBackend::default()
        };
        let batch = [pending("A"), pending("B")];
        let (orchestrator, staging, _backend, board) = setup(backend, &batch).await;

        let outcome = orchestrator.save_selected(&Selection::from_indices([0])).await;
        assert!(matches!(outcome, SaveOutcome::Failed { ref reason } if reason == "database is locked"));
        assert_eq!(staging.load().await, batch.to_vec());

        let notice = board.current().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "database is locked");
        assert_eq!(orchestrator.state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_nothing_selected_or_empty_batch() {
        let (orchestrator, staging, backend, _board) =
            setup(MockBackend::default(), &[pending("A")]).await;
        let marker = staging.marker().await;
        assert!(matches!(
            orchestrator.save_selected(&Selection::default()).await,
            SaveOutcome::NothingSelected
        ));
        assert!(matches!(
            orchestrator.save_selected(&Selection::from_indices([7])).await,
            SaveOutcome::NothingSelected
        ));
        assert_eq!(staging.load().await, vec![pending("A")]);
        assert_eq!(staging.marker().await, marker);

        let (orchestrator, _staging, _, _board) = setup(MockBackend::default(), &[]).await;
        assert!(matches!(
            orchestrator.save_selected(&Selection::all(1)).await,
            SaveOutcome::NothingToSave
        ));
        assert!(backend.saved.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_edit_made_during_save_is_kept() {
        let store = MemoryKeyValueStore::new();
        let staging = Arc::new(StagingStore::new(store.clone()));
        staging.save(&[pending("A"), pending("B"), pending("C")]).await;

        let backend = Arc::new(MockBackend {
            other_view: Some(StagingStore::new(store)),
            ..MockBackend::default()
        });
        let orchestrator = SaveOrchestrator::new(
            staging.clone(),
            backend.clone(),
            Arc::new(NoticeBoard::default()),
        );

        let outcome = orchestrator.save_selected(&Selection::from_indices([0])).await;
        assert!(matches!(outcome, SaveOutcome::Saved { saved: 1, .. }));

        let left = staging.load().await;
        let numbers: Vec<_> = left.iter().map(|r| r.order_number.as_str()).collect();
        assert_eq!(numbers, vec!["B", "C"]);
        assert_eq!(left[0].person_in_charge, "EDITED");
        assert_eq!(backend.saved.lock().await[0][0].order_number, "A");
    }

    #[tokio::test]
    async fn test_second_submission_is_rejected_while_busy() {
        let (orchestrator, _staging, _backend, _board) =
            setup(MockBackend::default(), &[pending("A")]).await;

        let guard = orchestrator.try_begin().unwrap();
        assert_eq!(orchestrator.state(), SubmissionState::Submitting);
        assert!(matches!(
            orchestrator.save_selected(&Selection::all(1)).await,
            SaveOutcome::Busy
        ));

        drop(guard);
        assert_eq!(orchestrator.state(), SubmissionState::Idle);
    }
}
