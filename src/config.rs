use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StatementError};

/// Environment variable that overrides the configured PDF password.
pub const PDF_PASSWORD_ENV: &str = "STATEMENT_PDF_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gmail: GmailConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub statement: StatementConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    /// Mailbox search query selecting statement messages
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_token_cache_path")]
    pub token_cache_path: PathBuf,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            credentials_path: default_credentials_path(),
            token_cache_path: default_token_cache_path(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PdfConfig {
    /// Password for encrypted statement PDFs. The STATEMENT_PDF_PASSWORD
    /// environment variable takes precedence when set.
    #[serde(default)]
    pub password: Option<String>,
}

impl PdfConfig {
    /// Effective password: environment override first, then config file.
    pub fn password(&self) -> Option<String> {
        std::env::var(PDF_PASSWORD_ENV)
            .ok()
            .or_else(|| self.password.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementConfig {
    /// Currency code stripped from amount lines before numeric parsing
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
    /// Direction prefixes stripped from the start of description lines
    #[serde(default = "default_description_prefixes")]
    pub description_prefixes: Vec<String>,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            currency_code: default_currency_code(),
            description_prefixes: default_description_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory where fetched PDF attachments are saved
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    /// Directory where the assembled dataset CSV is written
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    #[serde(default = "default_dataset_filename")]
    pub dataset_filename: String,
}

impl StorageConfig {
    /// Full path of the dataset file written by an extraction run.
    pub fn dataset_path(&self) -> PathBuf {
        self.processed_dir.join(&self.dataset_filename)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            processed_dir: default_processed_dir(),
            dataset_filename: default_dataset_filename(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Remote model endpoint accepting a multipart CSV upload
    #[serde(default = "default_model_api_url")]
    pub model_api_url: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_api_url: default_model_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StatementError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| StatementError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gmail.query.trim().is_empty() {
            return Err(StatementError::ConfigError(
                "gmail.query must not be empty".to_string(),
            ));
        }
        if self.classifier.model_api_url.trim().is_empty() {
            return Err(StatementError::ConfigError(
                "classifier.model_api_url must not be empty".to_string(),
            ));
        }
        if self.storage.dataset_filename.trim().is_empty() {
            return Err(StatementError::ConfigError(
                "storage.dataset_filename must not be empty".to_string(),
            ));
        }
        if self.gmail.max_concurrent_requests == 0 {
            return Err(StatementError::ConfigError(
                "gmail.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_query() -> String {
    "label:transaction-statements has:attachment filename:pdf".to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_cache_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_max_concurrent() -> usize {
    4
}

fn default_currency_code() -> String {
    "INR".to_string()
}

fn default_description_prefixes() -> Vec<String> {
    vec!["Paid to".to_string(), "Received from".to_string()]
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed")
}

fn default_dataset_filename() -> String {
    "unlabeled_transactions.csv".to_string()
}

fn default_model_api_url() -> String {
    "https://model-cloud-api.onrender.com/predict".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.gmail.query,
            "label:transaction-statements has:attachment filename:pdf"
        );
        assert_eq!(config.statement.currency_code, "INR");
        assert_eq!(
            config.statement.description_prefixes,
            vec!["Paid to".to_string(), "Received from".to_string()]
        );
        assert_eq!(
            config.storage.dataset_path(),
            PathBuf::from("processed/unlabeled_transactions.csv")
        );
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [classifier]
            model_api_url = "http://localhost:9000/predict"

            [storage]
            processed_dir = "out"
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier.model_api_url, "http://localhost:9000/predict");
        assert_eq!(config.storage.processed_dir, PathBuf::from("out"));
        // Untouched sections keep defaults
        assert_eq!(config.storage.dataset_filename, "unlabeled_transactions.csv");
        assert_eq!(config.gmail.max_concurrent_requests, 4);
    }

    #[test]
    fn test_statement_section_overrides() {
        let config: Config = toml::from_str(
            r#"
            [statement]
            currency_code = "USD"
            description_prefixes = ["Sent to"]
            "#,
        )
        .unwrap();

        assert_eq!(config.statement.currency_code, "USD");
        assert_eq!(config.statement.description_prefixes, vec!["Sent to".to_string()]);
    }

    #[test]
    fn test_validate_rejects_empty_query() {
        let mut config = Config::default();
        config.gmail.query = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("does-not-exist.toml")).await.unwrap();
        assert_eq!(config.statement.currency_code, "INR");
    }
}
