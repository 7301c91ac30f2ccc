//! Server configuration loaded from environment variables

use std::time::Duration;

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:8080"
    pub bind_addr: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite connection string
    pub database_url: String,
    /// Maximum size of a single stored chunk record
    pub chunk_size: usize,
    /// Maximum accepted upload file size in bytes
    pub max_file_size: u64,
    /// Capacity of the LRU metadata cache
    pub cache_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Base URL of the OCR HTTP service
    pub endpoint: String,
    /// Per-item recognition timeout
    pub timeout: Duration,
    /// Maximum attempts per image (including the first)
    pub max_retries: u32,
    /// Base delay between retries; actual delay is base * attempt number
    pub retry_delay: Duration,
    /// Number of images recognized concurrently in a batch
    pub concurrency: usize,
}

/// Default chunk size: 2MB
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Default maximum upload size: 50MB per image
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            server: ServerConfig {
                bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
            },
            storage: StorageConfig {
                database_url: env_or("DATABASE_URL", "sqlite://manuscript.db"),
                chunk_size: env_parse("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
                max_file_size: env_parse("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?,
                cache_capacity: env_parse("CACHE_CAPACITY", 256)?,
            },
            ocr: OcrConfig {
                endpoint: env_or("OCR_ENDPOINT", "http://localhost:8868/predict/ocr_system"),
                timeout: Duration::from_secs(env_parse("OCR_TIMEOUT_SECS", 30u64)?),
                max_retries: env_parse("OCR_MAX_RETRIES", 3u32)?,
                retry_delay: Duration::from_millis(env_parse("OCR_RETRY_DELAY_MS", 1000u64)?),
                concurrency: env_parse("OCR_CONCURRENCY", 4usize)?,
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:8080".to_string(),
            },
            storage: StorageConfig {
                database_url: "sqlite://manuscript.db".to_string(),
                chunk_size: DEFAULT_CHUNK_SIZE,
                max_file_size: DEFAULT_MAX_FILE_SIZE,
                cache_capacity: 256,
            },
            ocr: OcrConfig {
                endpoint: "http://localhost:8868/predict/ocr_system".to_string(),
                timeout: Duration::from_secs(30),
                max_retries: 3,
                retry_delay: Duration::from_millis(1000),
                concurrency: 4,
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
