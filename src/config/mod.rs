#[cfg(feature = "cli")]
pub mod cli;

use crate::core::staging::{DEFAULT_BATCH_KEY, DEFAULT_MARKER_KEY};
use crate::domain::fields::FieldMap;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub staging: StagingConfig,
    pub fields: FieldsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            // OCR 分析可能很久
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub data_dir: String,
    pub batch_key: String,
    pub marker_key: String,
    pub poll_interval_ms: u64,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            data_dir: "./.pending-import".to_string(),
            batch_key: DEFAULT_BATCH_KEY.to_string(),
            marker_key: DEFAULT_MARKER_KEY.to_string(),
            poll_interval_ms: 1000,
        }
    }
}

/// 額外的欄位別名，鍵為欄位名稱（例如 `order_number`）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    pub aliases: HashMap<String, Vec<String>>,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AppError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_BASE_URL})，未設定的保留原文
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.staging.poll_interval_ms)
    }

    pub fn field_map(&self) -> Result<FieldMap> {
        FieldMap::new().with_extra_aliases(&self.fields.aliases)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_positive_number("api.timeout_seconds", self.api.timeout_seconds, 1)?;
        validate_path("staging.data_dir", &self.staging.data_dir)?;
        validate_non_empty_string("staging.batch_key", &self.staging.batch_key)?;
        validate_non_empty_string("staging.marker_key", &self.staging.marker_key)?;
        validate_positive_number("staging.poll_interval_ms", self.staging.poll_interval_ms, 10)?;

        if self.staging.batch_key == self.staging.marker_key {
            return Err(AppError::InvalidConfigValueError {
                field: "staging.marker_key".to_string(),
                value: self.staging.marker_key.clone(),
                reason: "Must differ from staging.batch_key".to_string(),
            });
        }

        // 未知的欄位名稱在這裡就報錯
        self.field_map()?;
        Ok(())
    }
}
