//! Configuration structures for the run-sheet pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the runsheet pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunsheetConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Extraction and segmentation configuration.
    pub extraction: ExtractionConfig,

    /// Quality-scorer weights.
    pub scoring: ScoreConfig,

    /// Merge/reconciliation configuration.
    pub merge: MergeConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,

    /// Minimum text length for line mode to count as usable.
    pub min_text_length: usize,

    /// Per-document extraction timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            min_text_length: 20,
            timeout_secs: 30,
        }
    }
}

/// Extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Prefer table-cell extraction over line-based text.
    pub prefer_table_mode: bool,

    /// Vertical tolerance (points) when grouping table cells into rows.
    pub row_tolerance: f32,

    /// Enable source-specific parser overrides.
    pub use_source_profiles: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            prefer_table_mode: true,
            row_tolerance: 5.0,
            use_source_profiles: true,
        }
    }
}

/// Quality-scorer weights; normalized before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Weight of non-null activity.
    pub activity_weight: f32,

    /// Weight of non-null address.
    pub address_weight: f32,

    /// Weight of non-null postcode.
    pub postcode_weight: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            activity_weight: 0.4,
            address_weight: 0.3,
            postcode_weight: 0.3,
        }
    }
}

/// Merge/reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Flag records whose protected fields could not be read.
    pub flag_unreadable: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { flag_unreadable: true }
    }
}

impl RunsheetConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
