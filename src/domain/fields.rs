//! Canonical field → accepted key aliases.
//!
//! Import sources name the same field differently (localized labels from the
//! OCR workflow, snake_case from the backend, camelCase from older exports).
//! The first alias of each field is the key the canonical record serializes to.

use crate::utils::error::{AppError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ShipmentDate,
    OrderNumber,
    DeliveryNumber,
    PersonInCharge,
    ShippingCost,
    TotalAmount,
    PartNumbers,
    PartNames,
    Quantities,
    UnitPrices,
    SalesAmounts,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::ShipmentDate,
        Field::OrderNumber,
        Field::DeliveryNumber,
        Field::PersonInCharge,
        Field::ShippingCost,
        Field::TotalAmount,
        Field::PartNumbers,
        Field::PartNames,
        Field::Quantities,
        Field::UnitPrices,
        Field::SalesAmounts,
    ];

    /// snake_case 名稱，也是配置檔中 `[fields.aliases]` 的鍵
    pub fn name(self) -> &'static str {
        match self {
            Field::ShipmentDate => "shipment_date",
            Field::OrderNumber => "order_number",
            Field::DeliveryNumber => "delivery_number",
            Field::PersonInCharge => "person_in_charge",
            Field::ShippingCost => "shipping_cost",
            Field::TotalAmount => "total_amount",
            Field::PartNumbers => "part_numbers",
            Field::PartNames => "part_names",
            Field::Quantities => "quantities",
            Field::UnitPrices => "unit_prices",
            Field::SalesAmounts => "sales_amounts",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.name() == name)
    }

    fn default_aliases(self) -> &'static [&'static str] {
        match self {
            Field::ShipmentDate => &["出荷日", "shipment_date", "shipmentDate"],
            Field::OrderNumber => &["受注番号", "order_number", "orderNumber"],
            Field::DeliveryNumber => &["納入先番号", "delivery_number", "deliveryNumber"],
            Field::PersonInCharge => &["担当者", "person_in_charge", "personInCharge"],
            Field::ShippingCost => &["運賃", "shipping_cost", "shippingCost"],
            Field::TotalAmount => &["税抜合計", "total_amount", "totalAmount"],
            Field::PartNumbers => &["部品番号", "part_numbers", "partNumbers"],
            Field::PartNames => &["部品名", "part_names", "partNames"],
            Field::Quantities => &["数量", "quantities"],
            Field::UnitPrices => &["売上単価", "unit_prices", "unitPrices"],
            Field::SalesAmounts => &["売上金額", "sales_amounts", "salesAmounts"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldMap {
    aliases: HashMap<Field, Vec<String>>,
}

impl Default for FieldMap {
    fn default() -> Self {
        let aliases = Field::ALL
            .into_iter()
            .map(|field| {
                let keys = field.default_aliases().iter().map(|k| k.to_string()).collect();
                (field, keys)
            })
            .collect();
        Self { aliases }
    }
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加配置檔定義的別名（排在內建別名之後）
    pub fn with_extra_aliases(mut self, extra: &HashMap<String, Vec<String>>) -> Result<Self> {
        for (name, keys) in extra {
            let field = Field::from_name(name).ok_or_else(|| AppError::ConfigValidationError {
                field: format!("fields.aliases.{}", name),
                message: "Unknown field name".to_string(),
            })?;

            let entry = self.aliases.entry(field).or_default();
            for key in keys {
                if !entry.contains(key) {
                    entry.push(key.clone());
                }
            }
        }
        Ok(self)
    }

    pub fn aliases(&self, field: Field) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn primary_key(&self, field: Field) -> &str {
        field.default_aliases()[0]
    }

    pub fn field_for(&self, key: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|field| self.aliases(*field).iter().any(|alias| alias == key))
    }

    /// 依別名順序回傳第一個存在、非 null、非空字串的值
    pub fn lookup<'a>(&self, object: &'a Map<String, Value>, field: Field) -> Option<&'a Value> {
        self.aliases(field)
            .iter()
            .filter_map(|alias| object.get(alias))
            .find(|value| is_present(value))
    }
}

pub(crate) fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}
