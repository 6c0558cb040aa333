use crate::config::AppConfig;
use crate::core::editor::{LineItemDraft, RecordDraft};
use crate::core::normalizer::parse_amount;
use crate::core::render::OutputFormat;
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pending-import")]
#[command(about = "Stage imported delivery slips, review them and save them to the backend")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `api.base_url`
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Overrides `staging.data_dir`
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value = "html")]
    pub format: OutputFormat,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log as JSON lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a JSON file and replace the pending batch with its records
    ImportFile { path: PathBuf },
    /// Send PNG delivery slips for OCR and stage the result
    Analyze {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show the pending batch
    Pending,
    /// Save selected pending rows to the backend
    Save {
        /// Zero-based row indices, comma separated
        #[arg(long, value_delimiter = ',', conflicts_with = "all")]
        rows: Vec<usize>,
        #[arg(long)]
        all: bool,
    },
    DeleteRow { index: usize },
    EditRow {
        index: usize,
        #[command(flatten)]
        fields: RecordFields,
    },
    /// Show the line items of one pending row
    Parts { index: usize },
    EditLine {
        index: usize,
        line: usize,
        #[command(flatten)]
        fields: LineFields,
    },
    DeleteLine { index: usize, line: usize },
    /// Records of the latest saved import session
    Records,
    Purchases,
    RecordParts { id: i64 },
    UpdateRecord {
        id: i64,
        #[command(flatten)]
        fields: RecordFields,
    },
    DeleteRecord { id: i64 },
    UpdatePart {
        parent_id: i64,
        part_id: i64,
        #[command(flatten)]
        fields: LineFields,
    },
    DeletePart { id: i64 },
    /// Delete every saved record (development only)
    DeleteAll {
        #[arg(long)]
        yes: bool,
    },
    /// Re-render the pending batch whenever another process changes it
    Watch,
}

/// 未指定的欄位保留原值；金額欄位接受 "￥1,200" 這類輸入
#[derive(Debug, Clone, Default, Args)]
pub struct RecordFields {
    #[arg(long)]
    pub shipment_date: Option<String>,
    #[arg(long)]
    pub order_number: Option<String>,
    #[arg(long)]
    pub delivery_number: Option<String>,
    #[arg(long)]
    pub person_in_charge: Option<String>,
    #[arg(long)]
    pub shipping_cost: Option<String>,
    #[arg(long)]
    pub total_amount: Option<String>,
}

impl RecordFields {
    pub fn apply_to(&self, draft: &mut RecordDraft) {
        if let Some(v) = &self.shipment_date {
            draft.shipment_date = v.clone();
        }
        if let Some(v) = &self.order_number {
            draft.order_number = v.clone();
        }
        if let Some(v) = &self.delivery_number {
            draft.delivery_number = v.clone();
        }
        if let Some(v) = &self.person_in_charge {
            draft.person_in_charge = v.clone();
        }
        if let Some(v) = &self.shipping_cost {
            draft.shipping_cost = parse_amount(v);
        }
        if let Some(v) = &self.total_amount {
            draft.total_amount = parse_amount(v);
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct LineFields {
    #[arg(long)]
    pub part_number: Option<String>,
    #[arg(long)]
    pub part_name: Option<String>,
    #[arg(long)]
    pub quantity: Option<String>,
    #[arg(long)]
    pub unit_price: Option<String>,
}

impl LineFields {
    pub fn apply_to(&self, draft: &mut LineItemDraft) {
        if let Some(v) = &self.part_number {
            draft.part_number = v.clone();
        }
        if let Some(v) = &self.part_name {
            draft.part_name = v.clone();
        }
        if let Some(v) = &self.quantity {
            draft.set_quantity_input(v);
        }
        if let Some(v) = &self.unit_price {
            draft.set_unit_price_input(v);
        }
    }
}

impl Cli {
    /// 配置檔 → 命令列覆寫
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(api_base) = &self.api_base {
            config.api.base_url = api_base.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            config.staging.data_dir = data_dir.to_string_lossy().into_owned();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_save_rows() {
        let cli = Cli::try_parse_from(["pending-import", "save", "--rows", "0,2,5"]).unwrap();
        match cli.command {
            Command::Save { rows, all } => {
                assert_eq!(rows, vec![0, 2, 5]);
                assert!(!all);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.format, OutputFormat::Html);
    }

    #[test]
    fn test_rows_conflict_with_all() {
        assert!(Cli::try_parse_from(["pending-import", "save", "--rows", "1", "--all"]).is_err());
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "pending-import",
            "pending",
            "--format",
            "tsv",
            "--api-base",
            "http://localhost:9000",
            "--data-dir",
            "/tmp/state",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Tsv);

        let config = cli.load_config().unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.staging.data_dir, "/tmp/state");
    }

    #[test]
    fn test_line_fields_apply() {
        let cli = Cli::try_parse_from([
            "pending-import",
            "edit-line",
            "0",
            "1",
            "--quantity",
            "4",
            "--unit-price",
            "￥1,000",
        ])
        .unwrap();

        let Command::EditLine { index, line, fields } = cli.command else {
            panic!("expected edit-line");
        };
        assert_eq!((index, line), (0, 1));

        let mut draft = LineItemDraft {
            part_number: "A".to_string(),
            quantity: 1.0,
            unit_price: 1.0,
            ..LineItemDraft::default()
        };
        fields.apply_to(&mut draft);
        assert_eq!(draft.part_number, "A");
        assert_eq!(draft.amount(), 4000.0);
    }
}
