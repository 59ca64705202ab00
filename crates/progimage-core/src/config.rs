//! Configuration module
//!
//! Settings are read from the environment (optionally seeded from a `.env`
//! file). Unparseable values fall back to their defaults rather than failing
//! startup; `validate` catches the combinations that cannot work.

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BUCKET, DEFAULT_INGEST_TIMEOUT, DEFAULT_SERVER_ADDR, DEFAULT_TRANSFORM_TIMEOUT,
    MAX_UPLOAD_BYTES,
};
use crate::storage_types::StorageBackend;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./data/images";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Process-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_addr: String,
    pub environment: String,
    pub log_format: LogFormat,
}

/// Image service configuration
#[derive(Clone, Debug)]
pub struct ImageServiceConfig {
    pub base: BaseConfig,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub local_storage_path: Option<String>,
    pub ensure_bucket: bool,
    // Pipeline limits
    pub max_upload_bytes: u64,
    pub ingest_timeout: Option<Duration>,
    pub transform_timeout: Option<Duration>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ImageServiceConfig>);

impl Config {
    fn as_service(&self) -> &ImageServiceConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ImageServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_service().validate()
    }

    pub fn server_addr(&self) -> &str {
        &self.as_service().base.server_addr
    }

    pub fn environment(&self) -> &str {
        &self.as_service().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_service().base.log_format
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_service().storage_backend
    }

    pub fn s3_bucket(&self) -> &str {
        &self.as_service().s3_bucket
    }

    pub fn s3_region(&self) -> &str {
        &self.as_service().s3_region
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_service().s3_endpoint.as_deref()
    }

    pub fn s3_credentials(&self) -> Option<(&str, &str)> {
        let cfg = self.as_service();
        match (&cfg.s3_access_key_id, &cfg.s3_secret_access_key) {
            (Some(key), Some(secret)) => Some((key.as_str(), secret.as_str())),
            _ => None,
        }
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_service().local_storage_path.as_deref()
    }

    pub fn ensure_bucket(&self) -> bool {
        self.as_service().ensure_bucket
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.as_service().max_upload_bytes
    }

    pub fn ingest_timeout(&self) -> Option<Duration> {
        self.as_service().ingest_timeout
    }

    pub fn transform_timeout(&self) -> Option<Duration> {
        self.as_service().transform_timeout
    }
}

impl ImageServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        const MAX_UPLOAD_SIZE_MB: u64 = MAX_UPLOAD_BYTES / (1024 * 1024);

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let log_format = match lookup("LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let base = BaseConfig {
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
            environment,
            log_format,
        };

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let max_upload_mb = lookup("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let ingest_timeout = parse_timeout(
            lookup("INGEST_TIMEOUT_SECS").as_deref(),
            DEFAULT_INGEST_TIMEOUT,
        );
        let transform_timeout = parse_timeout(
            lookup("TRANSFORM_TIMEOUT_SECS").as_deref(),
            DEFAULT_TRANSFORM_TIMEOUT,
        );

        let local_storage_path = lookup("LOCAL_STORAGE_PATH").or_else(|| {
            (storage_backend == StorageBackend::Local)
                .then(|| DEFAULT_LOCAL_STORAGE_PATH.to_string())
        });

        Ok(ImageServiceConfig {
            base,
            storage_backend,
            s3_bucket: lookup("S3_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            s3_region: lookup("S3_REGION")
                .or_else(|| lookup("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            s3_endpoint: lookup("S3_ENDPOINT").filter(|s| !s.trim().is_empty()),
            s3_access_key_id: lookup("S3_ACCESS_KEY_ID"),
            s3_secret_access_key: lookup("S3_SECRET_ACCESS_KEY"),
            local_storage_path,
            ensure_bucket: parse_bool(lookup("ENSURE_BUCKET").as_deref(), true),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            ingest_timeout,
            transform_timeout,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        match self.storage_backend {
            StorageBackend::S3 if self.s3_bucket.trim().is_empty() => {
                return Err(anyhow::anyhow!(
                    "S3_BUCKET must be set when STORAGE_BACKEND=s3"
                ));
            }
            StorageBackend::Local if self.local_storage_path.is_none() => {
                return Err(anyhow::anyhow!(
                    "LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local"
                ));
            }
            _ => {}
        }

        if self.s3_access_key_id.is_some() != self.s3_secret_access_key.is_some() {
            return Err(anyhow::anyhow!(
                "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together"
            ));
        }

        Ok(())
    }
}

/// `0` disables the deadline; garbage falls back to the default.
fn parse_timeout(value: Option<&str>, default: Duration) -> Option<Duration> {
    match value.map(|v| v.trim().parse::<u64>()) {
        Some(Ok(0)) => None,
        Some(Ok(secs)) => Some(Duration::from_secs(secs)),
        Some(Err(_)) | None => Some(default),
    }
}

fn parse_bool(value: Option<&str>, default: bool) -> bool {
    value
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
