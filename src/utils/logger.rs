use crate::utils::error::{AppError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日誌輸出格式：終端機用 compact，需要收集時用 JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

/// `RUST_LOG` 未設定時使用的過濾條件
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "pending_import=debug,info"
    } else {
        "pending_import=info"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// 日誌一律寫到 stderr，stdout 只留給表格輸出
pub fn init_logger(format: LogFormat, verbose: bool) -> Result<()> {
    let compact = (format == LogFormat::Compact).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(compact)
        .with(json)
        .try_init()
        .map_err(|e| AppError::ConfigError {
            message: format!("Could not install logger: {}", e),
        })
}
