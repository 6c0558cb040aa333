use serde::{Deserialize, Serialize};

/// 一筆尚未寫入後端的出貨/訂單資料。
///
/// 序列化使用後端 `POST /api/save_data` 所接受的在地化欄位名稱；
/// 五個部品陣列以索引對齊，同一索引代表同一個明細行。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    #[serde(rename = "出荷日")]
    pub shipment_date: String,
    #[serde(rename = "受注番号")]
    pub order_number: String,
    #[serde(rename = "納入先番号")]
    pub delivery_number: String,
    #[serde(rename = "担当者")]
    pub person_in_charge: String,
    #[serde(rename = "運賃", with = "amount")]
    pub shipping_cost: f64,
    #[serde(rename = "税抜合計", with = "amount")]
    pub total_amount: f64,
    #[serde(rename = "部品番号")]
    pub part_numbers: Vec<String>,
    #[serde(rename = "部品名")]
    pub part_names: Vec<String>,
    #[serde(rename = "数量", with = "amount::seq")]
    pub quantities: Vec<f64>,
    #[serde(rename = "売上単価", with = "amount::seq")]
    pub unit_prices: Vec<f64>,
    #[serde(rename = "売上金額", with = "amount::seq")]
    pub sales_amounts: Vec<f64>,
}

/// One index across the five parallel arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItem {
    pub part_number: String,
    pub part_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub sales_amount: f64,
}

impl LineItem {
    /// Builds a line whose amount is quantity × unit price.
    pub fn priced(
        part_number: impl Into<String>,
        part_name: impl Into<String>,
        quantity: f64,
        unit_price: f64,
    ) -> Self {
        Self {
            part_number: part_number.into(),
            part_name: part_name.into(),
            quantity,
            unit_price,
            sales_amount: quantity * unit_price,
        }
    }
}

impl PendingRecord {
    pub fn line_count(&self) -> usize {
        [
            self.part_numbers.len(),
            self.part_names.len(),
            self.quantities.len(),
            self.unit_prices.len(),
            self.sales_amounts.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn is_aligned(&self) -> bool {
        let n = self.part_numbers.len();
        self.part_names.len() == n
            && self.quantities.len() == n
            && self.unit_prices.len() == n
            && self.sales_amounts.len() == n
    }

    pub fn line(&self, index: usize) -> Option<LineItem> {
        if index >= self.line_count() {
            return None;
        }
        let quantity = self.quantities.get(index).copied().unwrap_or(0.0);
        let unit_price = self.unit_prices.get(index).copied().unwrap_or(0.0);
        Some(LineItem {
            part_number: self.part_numbers.get(index).cloned().unwrap_or_default(),
            part_name: self.part_names.get(index).cloned().unwrap_or_default(),
            quantity,
            unit_price,
            sales_amount: self
                .sales_amounts
                .get(index)
                .copied()
                .unwrap_or(quantity * unit_price),
        })
    }

    pub fn lines(&self) -> Vec<LineItem> {
        (0..self.line_count()).filter_map(|i| self.line(i)).collect()
    }

    pub fn parts_total(&self) -> f64 {
        self.lines().iter().map(|line| line.sales_amount).sum()
    }

    /// 明確的非零合計優先，否則為部品合計 + 運賃
    pub fn effective_total(&self) -> f64 {
        if self.total_amount != 0.0 {
            self.total_amount
        } else {
            self.parts_total() + self.shipping_cost
        }
    }

    pub fn recompute_total(&mut self) {
        self.total_amount = self.parts_total() + self.shipping_cost;
    }

    /// Rewrites the arrays from a line list, which keeps them aligned.
    pub fn set_lines(&mut self, lines: Vec<LineItem>) {
        self.part_numbers = lines.iter().map(|l| l.part_number.clone()).collect();
        self.part_names = lines.iter().map(|l| l.part_name.clone()).collect();
        self.quantities = lines.iter().map(|l| l.quantity).collect();
        self.unit_prices = lines.iter().map(|l| l.unit_price).collect();
        self.sales_amounts = lines.iter().map(|l| l.sales_amount).collect();
    }

    pub fn replace_line(&mut self, index: usize, line: LineItem) -> bool {
        let mut lines = self.lines();
        match lines.get_mut(index) {
            Some(slot) => {
                *slot = line;
                self.set_lines(lines);
                true
            }
            None => false,
        }
    }

    pub fn remove_line(&mut self, index: usize) -> Option<LineItem> {
        let mut lines = self.lines();
        if index >= lines.len() {
            return None;
        }
        let removed = lines.remove(index);
        self.set_lines(lines);
        Some(removed)
    }
}

/// Server-held record (`GET /api/basic_info`, `GET /api/purchase_list`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: i64,
    #[serde(default)]
    pub shipment_date: String,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub delivery_number: String,
    #[serde(default)]
    pub person_in_charge: String,
    #[serde(default, with = "amount")]
    pub shipping_cost: f64,
    #[serde(default, with = "amount")]
    pub total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Server-held line item (`GET /api/parts_info/{parentId}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedPart {
    pub id: i64,
    #[serde(default)]
    pub part_number: String,
    #[serde(default)]
    pub part_name: String,
    #[serde(default, with = "amount")]
    pub quantity: f64,
    #[serde(default, with = "amount")]
    pub unit_price: f64,
    #[serde(default, with = "amount")]
    pub sales_amount: f64,
}

/// `POST /api/save_data` 回應
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveReceipt {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Envelope shared by `POST /upload` and the OCR batch endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

impl ImportResponse {
    pub fn failure_reason(&self) -> Option<String> {
        if let Some(error) = self.error.as_ref().filter(|e| !e.is_empty()) {
            return Some(error.clone());
        }
        self.errors
            .as_ref()
            .filter(|errors| !errors.is_empty())
            .map(|errors| errors.join("; "))
    }
}

/// A file ready to be sent as one multipart part.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// 整數金額輸出為 JSON 整數，後端以 int() 讀取
mod amount {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        f64::deserialize(deserializer)
    }

    struct Amount(f64);

    impl Serialize for Amount {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            super::amount::serialize(&self.0, serializer)
        }
    }

    pub mod seq {
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for value in values {
                seq.serialize_element(&super::Amount(*value))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
            Vec::<f64>::deserialize(deserializer)
        }
    }
}
