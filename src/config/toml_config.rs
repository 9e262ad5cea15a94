use crate::adapters::json::DEFAULT_JSON_INDENT;
use crate::core::serializer::Format;
use crate::utils::error::{Result, SocialError};
use crate::utils::validation::{validate_one_of, validate_path, validate_range, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_json_indent")]
    pub json_indent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_base_dir() -> String {
    ".".to_string()
}

fn default_format() -> String {
    "json".to_string()
}

fn default_json_indent() -> usize {
    DEFAULT_JSON_INDENT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            json_indent: default_json_indent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SocialError::storage(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) if path.as_ref().exists() => Self::from_file(path),
            Some(path) => {
                tracing::warn!(
                    "Config file {} not found, using defaults",
                    path.as_ref().display()
                );
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SocialError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SocialError::Config {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn default_format(&self) -> Result<Format> {
        self.export.default_format.parse()
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_path("storage.base_dir", &self.storage.base_dir)?;
        validate_one_of("export.default_format", &self.export.default_format, &Format::NAMES)?;
        validate_range("export.json_indent", self.export.json_indent, 0, 8)?;
        validate_one_of("logging.level", &self.logging.level, &LOG_LEVELS)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml_str(
            r#"
[storage]
base_dir = "./exports"

[export]
default_format = "xml"
json_indent = 2

[logging]
level = "debug"
json = true
"#,
        )
        .unwrap();

        assert_eq!(config.storage.base_dir, "./exports");
        assert_eq!(config.default_format().unwrap(), Format::Xml);
        assert_eq!(config.export.json_indent, 2);
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = AppConfig::from_toml_str("[export]\njson_indent = 4\n").unwrap();
        assert_eq!(config.storage.base_dir, ".");
        assert_eq!(config.export.default_format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("SOCIAL_GRAPH_TEST_DIR", "/tmp/social");
        let config =
            AppConfig::from_toml_str("[storage]\nbase_dir = \"${SOCIAL_GRAPH_TEST_DIR}/data\"\n").unwrap();
        assert_eq!(config.storage.base_dir, "/tmp/social/data");

        let untouched =
            AppConfig::from_toml_str("[storage]\nbase_dir = \"${SOCIAL_GRAPH_UNSET_VAR}\"\n").unwrap();
        assert_eq!(untouched.storage.base_dir, "${SOCIAL_GRAPH_UNSET_VAR}");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.export.default_format = "csv".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.export.json_indent = 20;
        assert!(config.validate().is_err());

        assert!(AppConfig::from_toml_str("[export\n").is_err());
    }
}
