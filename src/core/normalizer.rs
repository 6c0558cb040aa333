use crate::domain::fields::{is_present, Field, FieldMap};
use crate::domain::model::{LineItem, PendingRecord, PersistedPart, PersistedRecord};
use serde_json::{json, Value};

/// 將各種來源的欄位名稱與型別統一成 `PendingRecord`
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    fields: FieldMap,
}

impl Normalizer {
    pub fn new(fields: FieldMap) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Never fails: anything that is not an object becomes an empty record.
    pub fn normalize(&self, input: &Value) -> PendingRecord {
        let Some(object) = input.as_object() else {
            tracing::warn!("⚠️ Import entry is not an object, using an empty record");
            return PendingRecord::default();
        };

        let text = |field| {
            self.fields
                .lookup(object, field)
                .map(coerce_text)
                .unwrap_or_default()
        };
        let number = |field| {
            self.fields
                .lookup(object, field)
                .map(coerce_number)
                .unwrap_or(0.0)
        };
        let array = |field| coerce_array(self.fields.lookup(object, field));

        let part_numbers = array(Field::PartNumbers);
        let part_names = array(Field::PartNames);
        let quantities = array(Field::Quantities);
        let unit_prices = array(Field::UnitPrices);
        let sales_amounts = array(Field::SalesAmounts);

        let len = [
            part_numbers.len(),
            part_names.len(),
            quantities.len(),
            unit_prices.len(),
            sales_amounts.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        // 較短的陣列補齊：文字補空字串、數值補 0、金額以 數量×單價 計算
        let lines = (0..len)
            .map(|i| {
                let quantity = quantities.get(i).map(coerce_number).unwrap_or(0.0);
                let unit_price = unit_prices.get(i).map(coerce_number).unwrap_or(0.0);
                let sales_amount = match sales_amounts.get(i) {
                    Some(value) if is_present(value) => coerce_number(value),
                    _ => quantity * unit_price,
                };
                LineItem {
                    part_number: part_numbers.get(i).map(coerce_text).unwrap_or_default(),
                    part_name: part_names.get(i).map(coerce_text).unwrap_or_default(),
                    quantity,
                    unit_price,
                    sales_amount,
                }
            })
            .collect();

        let mut record = PendingRecord {
            shipment_date: text(Field::ShipmentDate),
            order_number: text(Field::OrderNumber),
            delivery_number: text(Field::DeliveryNumber),
            person_in_charge: text(Field::PersonInCharge),
            shipping_cost: number(Field::ShippingCost),
            ..PendingRecord::default()
        };
        record.set_lines(lines);

        let explicit_total = number(Field::TotalAmount);
        record.total_amount = if explicit_total != 0.0 {
            explicit_total
        } else {
            record.parts_total() + record.shipping_cost
        };

        record
    }

    pub fn normalize_all(&self, inputs: &[Value]) -> Vec<PendingRecord> {
        inputs.iter().map(|input| self.normalize(input)).collect()
    }

    /// Runs a typed record back through the alias table before it is sent anywhere.
    pub fn renormalize(&self, record: &PendingRecord) -> PendingRecord {
        match serde_json::to_value(record) {
            Ok(value) => self.normalize(&value),
            Err(e) => {
                tracing::warn!("⚠️ Could not re-encode pending record: {}", e);
                record.clone()
            }
        }
    }

    /// 把後端的記錄與其部品明細還原成待保存格式
    pub fn reconcile_persisted(&self, record: &PersistedRecord, parts: &[PersistedPart]) -> PendingRecord {
        let input = json!({
            "shipment_date": record.shipment_date,
            "order_number": record.order_number,
            "delivery_number": record.delivery_number,
            "person_in_charge": record.person_in_charge,
            "shipping_cost": record.shipping_cost,
            "total_amount": record.total_amount,
            "part_numbers": parts.iter().map(|p| p.part_number.clone()).collect::<Vec<_>>(),
            "part_names": parts.iter().map(|p| p.part_name.clone()).collect::<Vec<_>>(),
            "quantities": parts.iter().map(|p| p.quantity).collect::<Vec<_>>(),
            "unit_prices": parts.iter().map(|p| p.unit_price).collect::<Vec<_>>(),
            "sales_amounts": parts.iter().map(|p| p.sales_amount).collect::<Vec<_>>(),
        });
        self.normalize(&input)
    }
}

pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_amount(s),
        _ => 0.0,
    }
}

pub fn coerce_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

/// `"￥1,200"` → 1200；無法解析時回傳 0
pub fn parse_amount(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| !is_amount_noise(*c))
        .collect();

    if cleaned.is_empty() {
        return 0.0;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn is_amount_noise(c: char) -> bool {
    c.is_whitespace() || matches!(c, '￥' | '¥' | '$' | '€' | '£' | '円' | ',' | '，')
}
