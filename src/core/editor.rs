//! Edit state machine shared by every editor: `Closed → Editing → Saving → Closed`.
//!
//! A failed save goes back to `Editing` with the draft intact.

use crate::core::normalizer::parse_amount;
use crate::domain::model::{LineItem, PendingRecord, PersistedPart, PersistedRecord};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState<K, D> {
    Closed,
    Editing { target: K, draft: D },
    Saving { target: K, draft: D },
}

#[derive(Debug, Clone)]
pub struct Editor<K, D> {
    state: EditorState<K, D>,
}

impl<K, D> Default for Editor<K, D> {
    fn default() -> Self {
        Self {
            state: EditorState::Closed,
        }
    }
}

impl<K: Clone, D: Clone> Editor<K, D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState<K, D> {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, EditorState::Closed)
    }

    pub fn open(&mut self, target: K, draft: D) -> Result<()> {
        if !self.is_closed() {
            return Err(AppError::validation("Another edit is already open"));
        }
        self.state = EditorState::Editing { target, draft };
        Ok(())
    }

    pub fn draft_mut(&mut self) -> Option<&mut D> {
        match &mut self.state {
            EditorState::Editing { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn begin_save(&mut self) -> Result<(K, D)> {
        let state = std::mem::replace(&mut self.state, EditorState::Closed);
        match state {
            EditorState::Editing { target, draft } => {
                let submitted = (target.clone(), draft.clone());
                self.state = EditorState::Saving { target, draft };
                Ok(submitted)
            }
            other => {
                self.state = other;
                Err(AppError::validation("Nothing is being edited"))
            }
        }
    }

    pub fn finish(&mut self) {
        if matches!(self.state, EditorState::Saving { .. }) {
            self.state = EditorState::Closed;
        }
    }

    pub fn fail(&mut self) {
        let state = std::mem::replace(&mut self.state, EditorState::Closed);
        self.state = match state {
            EditorState::Saving { target, draft } => EditorState::Editing { target, draft },
            other => other,
        };
    }

    pub fn cancel(&mut self) {
        if matches!(self.state, EditorState::Editing { .. }) {
            self.state = EditorState::Closed;
        }
    }
}

/// 明細行編輯中的內容；金額永遠是 數量×單價
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemDraft {
    pub part_number: String,
    pub part_name: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItemDraft {
    pub fn amount(&self) -> f64 {
        self.quantity * self.unit_price
    }

    /// Form input; unparsable text counts as 0.
    pub fn set_quantity_input(&mut self, input: &str) {
        self.quantity = parse_amount(input);
    }

    pub fn set_unit_price_input(&mut self, input: &str) {
        self.unit_price = parse_amount(input);
    }

    pub fn to_line(&self) -> LineItem {
        LineItem::priced(
            self.part_number.clone(),
            self.part_name.clone(),
            self.quantity,
            self.unit_price,
        )
    }
}

impl From<&LineItem> for LineItemDraft {
    fn from(line: &LineItem) -> Self {
        Self {
            part_number: line.part_number.clone(),
            part_name: line.part_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        }
    }
}

impl From<&PersistedPart> for LineItemDraft {
    fn from(part: &PersistedPart) -> Self {
        Self {
            part_number: part.part_number.clone(),
            part_name: part.part_name.clone(),
            quantity: part.quantity,
            unit_price: part.unit_price,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub shipment_date: String,
    pub order_number: String,
    pub delivery_number: String,
    pub person_in_charge: String,
    pub shipping_cost: f64,
    pub total_amount: f64,
}

impl RecordDraft {
    /// 合計為 0 時依 部品合計 + 運賃 重新計算
    pub fn apply_to(&self, record: &mut PendingRecord) {
        record.shipment_date = self.shipment_date.clone();
        record.order_number = self.order_number.clone();
        record.delivery_number = self.delivery_number.clone();
        record.person_in_charge = self.person_in_charge.clone();
        record.shipping_cost = self.shipping_cost;
        if self.total_amount != 0.0 {
            record.total_amount = self.total_amount;
        } else {
            record.recompute_total();
        }
    }

    pub fn to_persisted(&self, id: i64, created_at: Option<String>) -> PersistedRecord {
        PersistedRecord {
            id,
            shipment_date: self.shipment_date.clone(),
            order_number: self.order_number.clone(),
            delivery_number: self.delivery_number.clone(),
            person_in_charge: self.person_in_charge.clone(),
            shipping_cost: self.shipping_cost,
            total_amount: self.total_amount,
            created_at,
        }
    }
}

impl From<&PendingRecord> for RecordDraft {
    fn from(record: &PendingRecord) -> Self {
        Self {
            shipment_date: record.shipment_date.clone(),
            order_number: record.order_number.clone(),
            delivery_number: record.delivery_number.clone(),
            person_in_charge: record.person_in_charge.clone(),
            shipping_cost: record.shipping_cost,
            total_amount: record.effective_total(),
        }
    }
}

impl From<&PersistedRecord> for RecordDraft {
    fn from(record: &PersistedRecord) -> Self {
        Self {
            shipment_date: record.shipment_date.clone(),
            order_number: record.order_number.clone(),
            delivery_number: record.delivery_number.clone(),
            person_in_charge: record.person_in_charge.clone(),
            shipping_cost: record.shipping_cost,
            total_amount: record.total_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_edit_cycle() {
        let mut editor: Editor<usize, LineItemDraft> = Editor::new();
        assert!(editor.is_closed());
        assert!(editor.begin_save().is_err());

        editor.open(2, LineItemDraft::default()).unwrap();
        assert!(editor.open(3, LineItemDraft::default()).is_err());

        let draft = editor.draft_mut().unwrap();
        draft.set_quantity_input("3");
        draft.set_unit_price_input("￥1,200");
        assert_eq!(draft.amount(), 3600.0);

        let (target, submitted) = editor.begin_save().unwrap();
        assert_eq!(target, 2);
        assert_eq!(submitted.to_line().sales_amount, 3600.0);
        assert!(matches!(editor.state(), EditorState::Saving { .. }));
        assert!(editor.draft_mut().is_none());

        editor.finish();
        assert!(editor.is_closed());
    }

    #[test]
    fn test_failed_save_returns_to_editing() {
        let mut editor: Editor<usize, RecordDraft> = Editor::new();
        editor
            .open(
                0,
                RecordDraft {
                    order_number: "1234567".to_string(),
                    ..RecordDraft::default()
                },
            )
            .unwrap();
        editor.begin_save().unwrap();
        editor.fail();

        match editor.state() {
            EditorState::Editing { target, draft } => {
                assert_eq!(*target, 0);
                assert_eq!(draft.order_number, "1234567");
            }
            other => panic!("unexpected state: {:?}", other),
        }

        editor.cancel();
        assert!(editor.is_closed());
    }

    #[test]
    fn test_record_draft_zero_total_recomputes() {
        let mut record = PendingRecord::default();
        record.set_lines(vec![LineItem::priced("A", "パッキン", 2.0, 100.0)]);

        let draft = RecordDraft {
            shipping_cost: 50.0,
            total_amount: 0.0,
            ..RecordDraft::default()
        };
        draft.apply_to(&mut record);
        assert_eq!(record.total_amount, 250.0);

        let draft = RecordDraft {
            total_amount: 999.0,
            ..draft
        };
        draft.apply_to(&mut record);
        assert_eq!(record.total_amount, 999.0);
    }
}
