//! Configuration for batch processing runs

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{ImageToPdfConfig, OcrConfig, ReduceConfig};

/// Main batch configuration.
///
/// Built once and shared by the pool, the remote client and the collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Remote service endpoint
    #[serde(default)]
    pub api: ApiConfig,
    /// Per-call retry policy
    #[serde(default)]
    pub retry: RetryConfig,
    /// Worker pool settings
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// What happens to originals and timestamps
    #[serde(default)]
    pub production: FileProductionPolicy,
    /// Input file collection
    #[serde(default)]
    pub collection: CollectionConfig,
    /// Default reduce action settings
    #[serde(default)]
    pub reduce: ReduceConfig,
    /// Default OCR action settings
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Default image-to-PDF settings
    #[serde(default)]
    pub image_to_pdf: ImageToPdfConfig,
}

impl BatchConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: BatchConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts must be at least 1"));
        }
        if self.processing.worker_count == 0 {
            return Err(Error::config("processing.worker_count must be at least 1"));
        }
        if self.processing.ocr_page_chunk_length == 0 {
            return Err(Error::config(
                "processing.ocr_page_chunk_length must be at least 1",
            ));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(Error::config("api.base_url must not be empty"));
        }
        Ok(())
    }
}

/// Remote API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the document service
    pub base_url: String,
    /// Header carrying the API key
    pub api_key_header: String,
    /// Timeout for a single remote call in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.docbatch.example".to_string(),
            api_key_header: "X-Api-Key".to_string(),
            timeout_secs: 1800, // Large scans can take a long time server-side
        }
    }
}

/// Retry configuration for remote calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    /// Pause before the first retry
    pub base_delay_ms: u64,
    /// Added to the pause for each further retry
    pub delay_increment_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            delay_increment_ms: 1000,
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of worker threads
    pub worker_count: usize,
    /// Maximum pages sent in one OCR request
    pub ocr_page_chunk_length: u32,
    /// Largest input accepted, in bytes (usually advertised by the server)
    pub max_allowed_content_length: Option<u64>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            ocr_page_chunk_length: 20,
            max_allowed_content_length: None,
        }
    }
}

/// File production policy applied after each workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProductionPolicy {
    /// Reapply the original last-access and last-write times
    pub keep_write_and_access_time: bool,
    /// Delete the original once its output is produced elsewhere
    pub delete_original_on_success: bool,
}

/// Input collection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Walk folders recursively
    pub process_subfolders: bool,
    /// Restrict input to PDF files
    pub only_process_pdf: bool,
    /// `|`-separated extension allow-list, or `all`
    pub input_extensions: Option<String>,
    /// Warn when an input folder is also the destination
    pub warn_when_same_input_output_directory: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            process_subfolders: true,
            only_process_pdf: false,
            input_extensions: None,
            warn_when_same_input_output_directory: true,
        }
    }
}
