//! Projection of pending or persisted records into tables.
//!
//! Rendering is pure: it never touches the staging store or the backend.
//! Displayed totals use the same rules as normalization so a row always shows
//! what a save would send.

use crate::domain::model::{PendingRecord, PersistedPart, PersistedRecord};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    PendingBasicInfo,
    BasicInfo,
    PurchaseList,
    Parts,
    PendingParts,
}

impl TableKind {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            TableKind::PendingBasicInfo => &[
                "出荷日", "受注番号", "納入先番号", "担当者", "運賃", "部品合計", "税抜合計",
            ],
            TableKind::BasicInfo => &["出荷日", "受注番号", "納入先番号", "担当者", "運賃", "税抜合計"],
            TableKind::PurchaseList => &[
                "出荷日", "受注番号", "納入先番号", "担当者", "運賃", "税抜合計", "登録日時",
            ],
            TableKind::Parts | TableKind::PendingParts => {
                &["部品番号", "部品名", "数量", "売上単価", "売上金額"]
            }
        }
    }

    pub fn empty_message(self) -> &'static str {
        match self {
            TableKind::PendingBasicInfo => "保存対象のデータがありません。",
            TableKind::BasicInfo => "データがありません。ファイル取込からデータを追加してください。",
            TableKind::PurchaseList => "データがありません",
            TableKind::Parts | TableKind::PendingParts => "部品情報がありません",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Html,
    Csv,
    Tsv,
}

/// Row identity used by row actions: staging index or backend id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKey {
    Index(usize),
    Id(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: RowKey,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub kind: TableKind,
    pub rows: Vec<Row>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableView {
    Empty(TableKind),
    Table(Table),
}

impl TableView {
    fn from_rows(kind: TableKind, rows: Vec<Row>, summary: Option<String>) -> Self {
        if rows.is_empty() {
            TableView::Empty(kind)
        } else {
            TableView::Table(Table {
                kind,
                rows,
                summary,
            })
        }
    }

    pub fn kind(&self) -> TableKind {
        match self {
            TableView::Empty(kind) => *kind,
            TableView::Table(table) => table.kind,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TableView::Empty(_))
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            TableView::Empty(_) => &[],
            TableView::Table(table) => &table.rows,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            TableView::Empty(_) => None,
            TableView::Table(table) => table.summary.as_deref(),
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Html => Ok(self.to_html()),
            OutputFormat::Csv => self.to_delimited(b','),
            OutputFormat::Tsv => self.to_delimited(b'\t'),
        }
    }

    pub fn to_html(&self) -> String {
        let table = match self {
            TableView::Empty(kind) => {
                return format!(
                    "<div class=\"empty-state\">{}</div>",
                    escape_html(kind.empty_message())
                )
            }
            TableView::Table(table) => table,
        };

        let mut html = String::new();
        if let Some(summary) = &table.summary {
            html.push_str(&format!(
                "<div class=\"summary\"><p><strong>{}</strong></p></div>\n",
                escape_html(summary)
            ));
        }

        html.push_str("<table>\n<thead>\n<tr>");
        for column in table.kind.columns() {
            html.push_str(&format!("<th>{}</th>", escape_html(column)));
        }
        match table.kind {
            TableKind::PendingBasicInfo => html.push_str("<th>操作</th><th>選択</th>"),
            TableKind::PendingParts | TableKind::Parts | TableKind::BasicInfo => {
                html.push_str("<th>操作</th>")
            }
            TableKind::PurchaseList => {}
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");

        for row in &table.rows {
            let key_attr = match row.key {
                RowKey::Index(index) => format!("data-index=\"{}\"", index),
                RowKey::Id(id) => format!("data-id=\"{}\"", id),
            };
            html.push_str(&format!("<tr {}>", key_attr));
            for cell in &row.cells {
                html.push_str(&format!("<td>{}</td>", escape_html(cell)));
            }
            match table.kind {
                TableKind::PendingBasicInfo => html.push_str(&format!(
                    "<td><button data-action=\"edit\" {k}>編集</button><button data-action=\"delete\" {k}>削除</button></td>\
                     <td><input type=\"checkbox\" class=\"row-check\" {k}></td>",
                    k = key_attr
                )),
                TableKind::PendingParts | TableKind::Parts | TableKind::BasicInfo => {
                    html.push_str(&format!(
                        "<td><button data-action=\"edit\" {k}>編集</button><button data-action=\"delete\" {k}>削除</button></td>",
                        k = key_attr
                    ))
                }
                TableKind::PurchaseList => {}
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</tbody>\n</table>\n");
        html
    }

    fn to_delimited(&self, delimiter: u8) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());

        writer.write_record(self.kind().columns())?;
        for row in self.rows() {
            writer.write_record(&row.cells)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| AppError::LocalStateError {
            message: format!("Rendered table is not valid UTF-8: {}", e),
        })
    }
}

pub fn render_pending_batch(batch: &[PendingRecord]) -> TableView {
    let rows = batch
        .iter()
        .enumerate()
        .map(|(index, record)| Row {
            key: RowKey::Index(index),
            cells: vec![
                record.shipment_date.clone(),
                record.order_number.clone(),
                record.delivery_number.clone(),
                record.person_in_charge.clone(),
                format_currency(record.shipping_cost),
                format_currency(record.parts_total()),
                format_currency(record.effective_total()),
            ],
        })
        .collect();
    TableView::from_rows(TableKind::PendingBasicInfo, rows, None)
}

pub fn render_basic_info(records: &[PersistedRecord]) -> TableView {
    let rows = sorted_for_listing(records)
        .into_iter()
        .map(|record| Row {
            key: RowKey::Id(record.id),
            cells: vec![
                record.shipment_date.clone(),
                record.order_number.clone(),
                record.delivery_number.clone(),
                record.person_in_charge.clone(),
                format_currency(record.shipping_cost),
                format_currency(record.total_amount),
            ],
        })
        .collect();
    TableView::from_rows(TableKind::BasicInfo, rows, None)
}

pub fn render_purchase_list(records: &[PersistedRecord]) -> TableView {
    let rows: Vec<Row> = sorted_for_listing(records)
        .into_iter()
        .map(|record| Row {
            key: RowKey::Id(record.id),
            cells: vec![
                record.shipment_date.clone(),
                record.order_number.clone(),
                record.delivery_number.clone(),
                record.person_in_charge.clone(),
                format_currency(record.shipping_cost),
                format_currency(record.total_amount),
                record.created_at.clone().unwrap_or_default(),
            ],
        })
        .collect();
    let summary = format!("総件数: {}件", rows.len());
    TableView::from_rows(TableKind::PurchaseList, rows, Some(summary))
}

pub fn render_parts(parts: &[PersistedPart]) -> TableView {
    let total: f64 = parts.iter().map(|part| part.sales_amount).sum();
    let rows = parts
        .iter()
        .map(|part| Row {
            key: RowKey::Id(part.id),
            cells: vec![
                part.part_number.clone(),
                part.part_name.clone(),
                format_quantity(part.quantity),
                format_currency(part.unit_price),
                format_currency(part.sales_amount),
            ],
        })
        .collect();
    TableView::from_rows(TableKind::Parts, rows, Some(parts_summary(total)))
}

pub fn render_pending_parts(record: &PendingRecord) -> TableView {
    let rows = record
        .lines()
        .into_iter()
        .enumerate()
        .map(|(index, line)| Row {
            key: RowKey::Index(index),
            cells: vec![
                line.part_number,
                line.part_name,
                format_quantity(line.quantity),
                format_currency(line.unit_price),
                format_currency(line.sales_amount),
            ],
        })
        .collect();
    TableView::from_rows(
        TableKind::PendingParts,
        rows,
        Some(parts_summary(record.parts_total())),
    )
}

fn parts_summary(total: f64) -> String {
    format!("売上金額合計: {}", format_currency(total))
}

fn sorted_for_listing(records: &[PersistedRecord]) -> Vec<&PersistedRecord> {
    let mut sorted: Vec<&PersistedRecord> = records.iter().collect();
    sort_by_order_number_desc(&mut sorted, |record| record.order_number.as_str());
    sorted
}

/// 受注番号中的數字部分；沒有數字時為 0
pub fn order_number_key(order_number: &str) -> f64 {
    let digits: String = order_number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        0.0
    } else {
        digits.parse::<f64>().unwrap_or(0.0)
    }
}

/// Descending by numeric order number; equal keys keep their relative order.
pub fn sort_by_order_number_desc<T>(items: &mut [T], order_number: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| order_number_key(order_number(b)).total_cmp(&order_number_key(order_number(a))));
}

/// `1200.0` → `￥1,200`（日圓不顯示小數）
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}￥{}", sign, group_thousands(rounded.abs() as u64))
}

pub fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{}", quantity as i64)
    } else {
        format!("{}", quantity)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
