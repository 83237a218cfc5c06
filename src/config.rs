use crate::models::ReversalPolicy;
use crate::util::amount::NumberFormat;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 配置文件默认路径, 可用 APP_CONFIG 覆盖
pub const DEFAULT_CONFIG_FILE: &str = "invoice-export.toml";

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub catalog: CatalogConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

/// 费用类别目录 (JSON 文件), 未配置时为空目录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    /// 需要取反的单据类型代码
    pub reversal_codes: Vec<String>,
    pub default_currency: String,
    pub thousands_separator: String,
    pub decimal_separator: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/invoices.db"),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        let fmt = NumberFormat::default();
        Self {
            output_dir: PathBuf::from("exports"),
            reversal_codes: ReversalPolicy::default().codes().to_vec(),
            default_currency: "CRC".to_string(),
            thousands_separator: fmt.thousands_separator,
            decimal_separator: fmt.decimal_separator,
        }
    }
}

impl ExportConfig {
    pub fn number_format(&self) -> NumberFormat {
        NumberFormat {
            thousands_separator: self.thousands_separator.clone(),
            decimal_separator: self.decimal_separator.clone(),
        }
    }

    pub fn reversal_policy(&self) -> ReversalPolicy {
        ReversalPolicy::new(self.reversal_codes.iter().map(|c| c.trim().to_string()))
    }
}

impl AppConfig {
    /// 默认值 -> 配置文件 (可选) -> APP__ 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("export.reversal_codes")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
