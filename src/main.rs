use clap::Parser;
use pending_import::app::commands;
use pending_import::config::cli::Cli;
use pending_import::utils::error::{AppError, ErrorSeverity};
use pending_import::utils::logger::{self, LogFormat};
use pending_import::utils::validation::Validate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    if let Err(e) = logger::init_logger(LogFormat::from_flag(cli.log_json), cli.verbose) {
        eprintln!("⚠️ {}", e.user_friendly_message());
    }

    tracing::info!("Starting pending-import CLI");

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match commands::run(cli, config).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(2),
        Err(e) => exit_with(&e),
    }
}

fn exit_with(e: &AppError) -> ! {
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 4,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
