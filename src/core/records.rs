use crate::core::editor::{LineItemDraft, RecordDraft};
use crate::core::render::{render_basic_info, render_parts, render_purchase_list, TableView};
use crate::domain::model::{PersistedPart, PersistedRecord};
use crate::domain::ports::RecordBackend;
use crate::utils::error::{AppError, Result};
use std::sync::Arc;

/// 已保存在後端的記錄與部品明細
pub struct RecordService<B: RecordBackend> {
    backend: Arc<B>,
}

impl<B: RecordBackend> RecordService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn basic_info(&self) -> Result<TableView> {
        Ok(render_basic_info(&self.backend.list_basic_info().await?))
    }

    pub async fn purchases(&self) -> Result<TableView> {
        Ok(render_purchase_list(&self.backend.list_purchases().await?))
    }

    pub async fn parts(&self, parent_id: i64) -> Result<TableView> {
        Ok(render_parts(&self.backend.list_parts(parent_id).await?))
    }

    pub async fn find_record(&self, id: i64) -> Result<PersistedRecord> {
        self.backend
            .list_purchases()
            .await?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(|| AppError::not_found(format!("Record {}", id)))
    }

    pub async fn find_part(&self, parent_id: i64, part_id: i64) -> Result<PersistedPart> {
        self.backend
            .list_parts(parent_id)
            .await?
            .into_iter()
            .find(|part| part.id == part_id)
            .ok_or_else(|| AppError::not_found(format!("Part {} of record {}", part_id, parent_id)))
    }

    pub async fn update_record(&self, id: i64, draft: &RecordDraft) -> Result<()> {
        let record = draft.to_persisted(id, None);
        self.backend.update_record(id, &record).await?;
        tracing::info!("✏️ Record {} updated", id);
        Ok(())
    }

    /// 金額由 數量×單價 重新計算後送出
    pub async fn update_part(&self, part_id: i64, draft: &LineItemDraft) -> Result<()> {
        let line = draft.to_line();
        let part = PersistedPart {
            id: part_id,
            part_number: line.part_number,
            part_name: line.part_name,
            quantity: line.quantity,
            unit_price: line.unit_price,
            sales_amount: line.sales_amount,
        };
        self.backend.update_part(part_id, &part).await?;
        tracing::info!("✏️ Part {} updated", part_id);
        Ok(())
    }

    pub async fn delete_record(&self, id: i64) -> Result<()> {
        self.backend.delete_record(id).await?;
        tracing::info!("🗑️ Record {} deleted", id);
        Ok(())
    }

    pub async fn delete_part(&self, id: i64) -> Result<()> {
        self.backend.delete_part(id).await?;
        tracing::info!("🗑️ Part {} deleted", id);
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<()> {
        self.backend.delete_all().await?;
        tracing::warn!("🗑️ All saved records deleted");
        Ok(())
    }
}
