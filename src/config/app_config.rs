use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

use crate::domain::DomainError;
use crate::domain::document::DocumentType;
use crate::domain::ingestion::{FilenamePolicy, IngestionConfig};
use crate::infrastructure::storage::{BlobStorageConfig, BlobStorageType};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ingestion: IngestionSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// A byte count written either as an integer or as `"50MB"`, `"512KB"`, `"1GB"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.trim().to_ascii_uppercase();

        let (digits, unit) = if let Some(n) = upper.strip_suffix("GB") {
            (n, GIB)
        } else if let Some(n) = upper.strip_suffix("MB") {
            (n, MIB)
        } else if let Some(n) = upper.strip_suffix("KB") {
            (n, KIB)
        } else {
            (upper.as_str(), 1)
        };

        digits
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(unit))
            .map(Self)
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(n) => Ok(Self(n)),
            Raw::Text(s) => Self::parse(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid byte size '{}'", s))),
        }
    }
}

/// Ingestion limits and policies as written in configuration files
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    pub max_file_size: ByteSize,
    pub allowed_extensions: Vec<String>,
    pub max_attachment_size: ByteSize,
    pub allowed_attachment_extensions: Vec<String>,
    pub legacy_encoding: String,
    pub default_document_type: DocumentType,
    pub filename_policy: FilenamePolicy,
    pub attachment_concurrency: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        let defaults = IngestionConfig::default();

        Self {
            max_file_size: ByteSize(defaults.max_file_size),
            allowed_extensions: defaults.allowed_extensions,
            max_attachment_size: ByteSize(defaults.max_attachment_size),
            allowed_attachment_extensions: defaults.allowed_attachment_extensions,
            legacy_encoding: "windows-949".to_string(),
            default_document_type: defaults.default_document_type,
            filename_policy: defaults.filename_policy,
            attachment_concurrency: defaults.attachment_concurrency,
        }
    }
}

impl IngestionSettings {
    pub fn to_ingestion_config(&self) -> Result<IngestionConfig, DomainError> {
        Ok(IngestionConfig::default()
            .with_max_file_size(self.max_file_size.bytes())
            .with_allowed_extensions(self.allowed_extensions.iter().map(String::as_str))
            .with_max_attachment_size(self.max_attachment_size.bytes())
            .with_allowed_attachment_extensions(
                self.allowed_attachment_extensions.iter().map(String::as_str),
            )
            .with_legacy_encoding_label(&self.legacy_encoding)?
            .with_default_document_type(self.default_document_type)
            .with_filename_policy(self.filename_policy)
            .with_attachment_concurrency(self.attachment_concurrency))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: String,
    pub root: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "local".to_string(),
            root: PathBuf::from("./uploads"),
        }
    }
}

impl StorageSettings {
    pub fn to_blob_config(&self) -> Result<BlobStorageConfig, DomainError> {
        match BlobStorageType::from_str(&self.backend) {
            Some(BlobStorageType::InMemory) => Ok(BlobStorageConfig::in_memory()),
            Some(BlobStorageType::Local) => Ok(BlobStorageConfig::local(self.root.clone())),
            None => Err(DomainError::configuration(format!(
                "Unknown storage backend '{}'",
                self.backend
            ))),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("ingestion.allowed_extensions")
                    .with_list_parse_key("ingestion.allowed_attachment_extensions"),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_parse() {
        assert_eq!(ByteSize::parse("50MB"), Some(ByteSize(50 * MIB)));
        assert_eq!(ByteSize::parse("512kb"), Some(ByteSize(512 * KIB)));
        assert_eq!(ByteSize::parse("1GB"), Some(ByteSize(GIB)));
        assert_eq!(ByteSize::parse(" 2048 "), Some(ByteSize(2048)));
        assert_eq!(ByteSize::parse("lots"), None);
        assert_eq!(ByteSize::parse("MB"), None);
    }

    #[test]
    fn test_byte_size_deserialize() {
        let from_text: ByteSize = serde_json::from_str("\"100MB\"").unwrap();
        let from_int: ByteSize = serde_json::from_str("4096").unwrap();

        assert_eq!(from_text, ByteSize(100 * MIB));
        assert_eq!(from_int, ByteSize(4096));
        assert!(serde_json::from_str::<ByteSize>("\"ten\"").is_err());
    }

    #[test]
    fn test_defaults_match_ingestion_config() {
        let config = AppConfig::default();
        let ingestion = config.ingestion.to_ingestion_config().unwrap();
        let defaults = IngestionConfig::default();

        assert_eq!(ingestion.max_file_size, defaults.max_file_size);
        assert_eq!(ingestion.allowed_extensions, defaults.allowed_extensions);
        assert_eq!(ingestion.max_attachment_size, 50 * MIB);
        assert_eq!(ingestion.legacy_encoding, defaults.legacy_encoding);
        assert_eq!(config.storage.root, PathBuf::from("./uploads"));
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: IngestionSettings = serde_json::from_str(
            r#"{"max_file_size": "10MB", "allowed_extensions": ["PDF", ".txt"], "filename_policy": "reject"}"#,
        )
        .unwrap();
        let config = settings.to_ingestion_config().unwrap();

        assert_eq!(config.max_file_size, 10 * MIB);
        assert_eq!(config.allowed_extensions, vec!["pdf", "txt"]);
        assert_eq!(config.filename_policy, FilenamePolicy::Reject);
        assert_eq!(config.attachment_concurrency, 1);
    }

    #[test]
    fn test_unknown_legacy_encoding() {
        let settings = IngestionSettings {
            legacy_encoding: "klingon".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            settings.to_ingestion_config(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_storage_backend() {
        let memory = StorageSettings {
            backend: "memory".to_string(),
            ..Default::default()
        };
        let unknown = StorageSettings {
            backend: "s3".to_string(),
            ..Default::default()
        };

        assert_eq!(
            memory.to_blob_config().unwrap().storage_type(),
            BlobStorageType::InMemory
        );
        assert!(unknown.to_blob_config().is_err());
    }
}
