use serde::{Deserialize, Serialize};

use crate::errors::{LinkRelayError, Result};
use crate::services::MIN_CODE_LENGTH;
use crate::utils::MAX_CODE_LENGTH;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "linkrelay.toml";

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// Services never read this through a global: the binary hands each section
/// to the constructor that needs it, so tests can run several setups side by
/// side.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub shortener: ShortenerConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// ENV 前缀：LR，分隔符：__
    /// 示例：LR__TRANSFER__MAX_FILE_SIZE=1048576
    pub fn load(path: &str) -> Result<Self> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("LR")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("access.operator_ids")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| LinkRelayError::config(format!("failed to build config: {}", e)))?;

        let config: StaticConfig = settings
            .try_deserialize()
            .map_err(|e| LinkRelayError::config(format!("failed to deserialize config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&self.shortener.code_length) {
            return Err(LinkRelayError::config(format!(
                "shortener.code_length must be within {}..={}, got {}",
                MIN_CODE_LENGTH, MAX_CODE_LENGTH, self.shortener.code_length
            )));
        }
        if self.shortener.max_attempts == 0 {
            return Err(LinkRelayError::config(
                "shortener.max_attempts must be at least 1",
            ));
        }
        if self.transfer.max_file_size == 0 {
            return Err(LinkRelayError::config("transfer.max_file_size must be > 0"));
        }
        if !(1..=100).contains(&self.transfer.progress_step_percent) {
            return Err(LinkRelayError::config(format!(
                "transfer.progress_step_percent must be within 1..=100, got {}",
                self.transfer.progress_step_percent
            )));
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 短链接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenerConfig {
    /// Redirect domain prepended to every code
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    /// Random candidates tried at one length before growing the code by one character
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// 文件传输配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Ceiling in bytes, checked before any byte moves
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_files_dir")]
    pub files_dir: String,
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    /// Durable channel that receives one best-effort copy of every stored file
    #[serde(default)]
    pub mirror_chat_id: Option<i64>,
    #[serde(default = "default_progress_step_percent")]
    pub progress_step_percent: u8,
    #[serde(default = "default_throughput_window_secs")]
    pub throughput_window_secs: u64,
    /// 0 disables the per-attempt watchdog
    #[serde(default)]
    pub stall_timeout_secs: u64,
    #[serde(default = "default_temp_max_age_secs")]
    pub temp_max_age_secs: u64,
}

/// 权限配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccessConfig {
    /// Pre-authorized operators, allowed to act on every record
    #[serde(default)]
    pub operator_ids: Vec<i64>,
}

/// 本地传输配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_transport_root")]
    pub root: String,
}

// ============================================================
// Default value functions
// ============================================================

fn default_database_url() -> String {
    "linkrelay.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_base_url() -> String {
    "https://short.ly".to_string()
}

fn default_code_length() -> usize {
    6
}

fn default_max_attempts() -> u32 {
    100
}

fn default_max_file_size() -> u64 {
    4 * 1024 * 1024 * 1024
}

fn default_files_dir() -> String {
    "files".to_string()
}

fn default_temp_dir() -> String {
    "temp".to_string()
}

fn default_progress_step_percent() -> u8 {
    5
}

fn default_throughput_window_secs() -> u64 {
    5
}

fn default_temp_max_age_secs() -> u64 {
    3600
}

fn default_transport_root() -> String {
    "chats".to_string()
}

// ============================================================
// Default implementations
// ============================================================

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            code_length: default_code_length(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            files_dir: default_files_dir(),
            temp_dir: default_temp_dir(),
            mirror_chat_id: None,
            progress_step_percent: default_progress_step_percent(),
            throughput_window_secs: default_throughput_window_secs(),
            stall_timeout_secs: 0,
            temp_max_age_secs: default_temp_max_age_secs(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            root: default_transport_root(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StaticConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.shortener.code_length, 6);
        assert_eq!(config.shortener.max_attempts, 100);
        assert_eq!(config.transfer.max_file_size, 4 * 1024 * 1024 * 1024);
        assert_eq!(config.transfer.progress_step_percent, 5);
    }

    #[test]
    fn test_validate_rejects_short_codes() {
        let mut config = StaticConfig::default();
        config.shortener.code_length = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_codes_the_allocator_cannot_produce() {
        let mut config = StaticConfig::default();
        config.shortener.code_length = MAX_CODE_LENGTH;
        assert!(config.validate().is_ok());

        config.shortener.code_length = 100;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LinkRelayError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_progress_step() {
        let mut config = StaticConfig::default();
        config.transfer.progress_step_percent = 0;
        assert!(config.validate().is_err());
        config.transfer.progress_step_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_config_roundtrips_through_toml() {
        let sample = toml::to_string_pretty(&StaticConfig::default()).unwrap();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.shortener.base_url, "https://short.ly");
        assert_eq!(parsed.transport.root, "chats");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[shortener]\nbase_url = \"https://go.example\"\ncode_length = 8\n\n[access]\noperator_ids = [1, 2]\n",
        )
        .unwrap();

        let config = StaticConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.shortener.base_url, "https://go.example");
        assert_eq!(config.shortener.code_length, 8);
        assert_eq!(config.access.operator_ids, vec![1, 2]);
        assert_eq!(config.transfer.files_dir, "files");
    }
}
