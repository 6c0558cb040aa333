use crate::adapters::{ApiClient, FileKeyValueStore};
use crate::config::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::core::editor::{LineItemDraft, RecordDraft};
use crate::core::import::Importer;
use crate::core::line_items::LineItemEditor;
use crate::core::normalizer::Normalizer;
use crate::core::orchestrator::{SaveOrchestrator, SaveOutcome, Selection};
use crate::core::record_editor::PendingRecordEditor;
use crate::core::records::RecordService;
use crate::core::render::{OutputFormat, TableView};
use crate::core::staging::{ChangeWatcher, StagingStore};
use crate::domain::ports::Notifier;
use crate::utils::error::{AppError, Result};
use crate::utils::notice::{ConsoleNotifier, Notice};
use std::sync::Arc;
use std::time::Duration;

/// 命令執行所需的共用元件
pub struct AppContext {
    pub staging: Arc<StagingStore<FileKeyValueStore>>,
    pub api: Arc<ApiClient>,
    pub notifier: Arc<dyn Notifier>,
    pub format: OutputFormat,
    pub poll_interval: Duration,
}

impl AppContext {
    pub fn from_config(config: &AppConfig, format: OutputFormat) -> Result<Self> {
        let store = FileKeyValueStore::new(&config.staging.data_dir);
        let staging = StagingStore::with_keys(
            store,
            config.staging.batch_key.clone(),
            config.staging.marker_key.clone(),
        )
        .with_normalizer(Normalizer::new(config.field_map()?));

        Ok(Self {
            staging: Arc::new(staging),
            api: Arc::new(ApiClient::with_timeout(config.api.base_url.clone(), config.timeout())?),
            notifier: Arc::new(ConsoleNotifier),
            format,
            poll_interval: config.poll_interval(),
        })
    }

    fn print(&self, view: &TableView) -> Result<()> {
        println!("{}", view.render(self.format)?);
        Ok(())
    }

    fn records(&self) -> RecordService<ApiClient> {
        RecordService::new(self.api.clone())
    }
}

/// Runs one subcommand. `Ok(false)` means the command ran but did not succeed
/// (the reason was already reported as a notice).
pub async fn run(cli: Cli, config: AppConfig) -> Result<bool> {
    let ctx = AppContext::from_config(&config, cli.format)?;

    match cli.command {
        Command::ImportFile { path } => {
            let importer = Importer::new(ctx.staging.clone(), ctx.api.clone(), ctx.notifier.clone());
            let summary = importer.import_file(&path).await?;
            ctx.print(&summary.view)?;
        }
        Command::Analyze { paths } => {
            let importer = Importer::new(ctx.staging.clone(), ctx.api.clone(), ctx.notifier.clone());
            let summary = importer.analyze_images(&paths).await?;
            ctx.print(&summary.view)?;
        }
        Command::Pending => {
            let editor = PendingRecordEditor::new(ctx.staging.clone(), ctx.notifier.clone());
            ctx.print(&editor.view().await)?;
        }
        Command::Save { rows, all } => {
            let selection = if all {
                Selection::all(ctx.staging.load().await.len())
            } else {
                Selection::from_indices(rows)
            };
            let orchestrator =
                SaveOrchestrator::new(ctx.staging.clone(), ctx.api.clone(), ctx.notifier.clone());

            match orchestrator.save_selected(&selection).await {
                SaveOutcome::Saved { remaining, .. } => ctx.print(&remaining)?,
                SaveOutcome::AllSaved { records, .. } => ctx.print(&records)?,
                SaveOutcome::Failed { .. } | SaveOutcome::Busy => return Ok(false),
                SaveOutcome::NothingToSave | SaveOutcome::NothingSelected => {}
            }
        }
        Command::DeleteRow { index } => {
            let editor = PendingRecordEditor::new(ctx.staging.clone(), ctx.notifier.clone());
            ctx.print(&editor.delete_row(index).await?)?;
        }
        Command::EditRow { index, fields } => {
            let mut editor = PendingRecordEditor::new(ctx.staging.clone(), ctx.notifier.clone());
            fields.apply_to(editor.open_edit(index).await?);
            ctx.print(&editor.save_edit().await?)?;
        }
        Command::Parts { index } => {
            let editor = LineItemEditor::new(ctx.staging.clone(), ctx.notifier.clone());
            ctx.print(&editor.view(index).await?)?;
        }
        Command::EditLine { index, line, fields } => {
            let mut editor = LineItemEditor::new(ctx.staging.clone(), ctx.notifier.clone());
            fields.apply_to(editor.open_edit(index, line).await?);
            ctx.print(&editor.save_edit().await?)?;
        }
        Command::DeleteLine { index, line } => {
            let editor = LineItemEditor::new(ctx.staging.clone(), ctx.notifier.clone());
            ctx.print(&editor.delete_line(index, line).await?)?;
        }
        Command::Records => ctx.print(&ctx.records().basic_info().await?)?,
        Command::Purchases => ctx.print(&ctx.records().purchases().await?)?,
        Command::RecordParts { id } => ctx.print(&ctx.records().parts(id).await?)?,
        Command::UpdateRecord { id, fields } => {
            let service = ctx.records();
            let mut draft = RecordDraft::from(&service.find_record(id).await?);
            fields.apply_to(&mut draft);
            service.update_record(id, &draft).await?;
            ctx.notifier.notify(Notice::success("Record updated"));
            ctx.print(&service.purchases().await?)?;
        }
        Command::DeleteRecord { id } => {
            let service = ctx.records();
            service.delete_record(id).await?;
            ctx.notifier.notify(Notice::success("Record deleted"));
            ctx.print(&service.purchases().await?)?;
        }
        Command::UpdatePart {
            parent_id,
            part_id,
            fields,
        } => {
            let service = ctx.records();
            let mut draft = LineItemDraft::from(&service.find_part(parent_id, part_id).await?);
            fields.apply_to(&mut draft);
            service.update_part(part_id, &draft).await?;
            ctx.notifier.notify(Notice::success("Part updated"));
            ctx.print(&service.parts(parent_id).await?)?;
        }
        Command::DeletePart { id } => {
            ctx.records().delete_part(id).await?;
            ctx.notifier.notify(Notice::success("Part deleted"));
        }
        Command::DeleteAll { yes } => {
            if !yes {
                return Err(AppError::validation(
                    "Deleting every saved record needs --yes",
                ));
            }
            ctx.records().delete_all().await?;
            ctx.notifier.notify(Notice::success("All saved records deleted"));
        }
        Command::Watch => watch(&ctx).await?,
    }

    Ok(true)
}

async fn watch(ctx: &AppContext) -> Result<()> {
    let editor = PendingRecordEditor::new(ctx.staging.clone(), ctx.notifier.clone());
    let mut watcher = ChangeWatcher::start(ctx.staging.clone(), ctx.poll_interval).await;
    tracing::info!("👀 Watching the pending batch (Ctrl+C to stop)");

    ctx.print(&editor.view().await)?;
    loop {
        tokio::select! {
            marker = watcher.next_change() => {
                tracing::debug!("Pending batch changed at {}", marker);
                ctx.print(&editor.view().await)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopped watching");
                return Ok(());
            }
        }
    }
}
