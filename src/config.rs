//! Insight archive configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the insight snapshot inside a run directory
pub const INSIGHTS_FILE: &str = "insights.json";

/// Directory name of the similarity index inside a run directory
pub const INDEX_DIR: &str = "string_map";

/// Main insight archive configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Storage layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retrieval tuning constants
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Built-in similarity index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Diagnostic page log
    #[serde(default)]
    pub page_log: PageLogConfig,
}

impl ArchiveConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Storage layout configuration
///
/// One directory per run holds the index files plus the insight snapshot:
///
/// ```text
/// <memory_dir>/<run_subdir>/
/// ├── string_map/
/// │   └── string_pairs.json
/// └── insights.json
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for all archive data
    pub memory_dir: PathBuf,

    /// Subdirectory for this run
    pub run_subdir: String,

    /// Wipe the run directory before use
    pub reset: bool,
}

impl StorageConfig {
    /// Directory holding this run's data
    pub fn run_dir(&self) -> PathBuf {
        self.memory_dir.join(&self.run_subdir)
    }

    /// Path of the insight snapshot
    pub fn insights_path(&self) -> PathBuf {
        self.run_dir().join(INSIGHTS_FILE)
    }

    /// Directory of the built-in similarity index
    pub fn index_dir(&self) -> PathBuf {
        self.run_dir().join(INDEX_DIR)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let memory_dir = dirs_next::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("insight-archive");

        Self {
            memory_dir,
            run_subdir: "run1".to_string(),
            reset: false,
        }
    }
}

/// Retrieval tuning constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Approximate borderline between relevant and irrelevant topic matches.
    /// Each match contributes `relevance_threshold - distance`.
    pub relevance_threshold: f64,

    /// Nearest associations requested per topic
    pub n_results: usize,

    /// Matches at or beyond this distance are never returned by the index
    pub distance_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 1.7,
            n_results: 25,
            distance_threshold: 100.0,
        }
    }
}

/// Embedding model used by the built-in similarity index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Deterministic feature hashing; matches shared words only
    #[default]
    Hashing,
    /// all-MiniLM-L6-v2 sentence embeddings (`local-embeddings` feature)
    #[serde(rename = "minilm")]
    MiniLm,
}

/// Built-in similarity index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Embedding model
    pub embedder: EmbedderKind,

    /// Embedding dimensions used by the hashing embedder
    pub dimensions: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            embedder: EmbedderKind::Hashing,
            dimensions: 512,
        }
    }
}

/// Page log configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLogConfig {
    /// Write page lines to a file instead of tracing
    pub enabled: bool,

    /// Log file path (defaults to `<run_dir>/page_log.txt`)
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ArchiveConfig::default();
        assert!((config.retrieval.relevance_threshold - 1.7).abs() < f64::EPSILON);
        assert_eq!(config.retrieval.n_results, 25);
        assert!((config.retrieval.distance_threshold - 100.0).abs() < f64::EPSILON);
        assert_eq!(config.storage.run_subdir, "run1");
        assert!(!config.storage.reset);
        assert!(!config.page_log.enabled);
    }

    #[test]
    fn test_storage_paths() {
        let storage = StorageConfig {
            memory_dir: PathBuf::from("/data/memory"),
            run_subdir: "run7".to_string(),
            reset: false,
        };
        assert_eq!(storage.run_dir(), PathBuf::from("/data/memory/run7"));
        assert_eq!(
            storage.insights_path(),
            PathBuf::from("/data/memory/run7/insights.json")
        );
        assert_eq!(
            storage.index_dir(),
            PathBuf::from("/data/memory/run7/string_map")
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ArchiveConfig = toml::from_str(
            r#"
            [storage]
            memory_dir = "/tmp/mem"
            run_subdir = "eval"
            reset = true

            [retrieval]
            relevance_threshold = 1.5
            n_results = 10
            distance_threshold = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.memory_dir, PathBuf::from("/tmp/mem"));
        assert!(config.storage.reset);
        assert_eq!(config.retrieval.n_results, 10);
        assert_eq!(config.index.dimensions, 512);
        assert!(config.page_log.path.is_none());
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let config: ArchiveConfig = toml::from_str(
            r#"
            [retrieval]
            n_results = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.n_results, 5);
        assert!((config.retrieval.relevance_threshold - 1.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_embedder_selection_from_toml() {
        let config: ArchiveConfig = toml::from_str(
            r#"
            [index]
            embedder = "minilm"
            "#,
        )
        .unwrap();
        assert_eq!(config.index.embedder, EmbedderKind::MiniLm);
        assert_eq!(ArchiveConfig::default().index.embedder, EmbedderKind::Hashing);
    }

    #[test]
    fn test_from_file_reports_bad_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("archive.toml");
        std::fs::write(&path, "[retrieval\nn_results = ").unwrap();

        let err = ArchiveConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = ArchiveConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ArchiveConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.retrieval.n_results, config.retrieval.n_results);
        assert_eq!(parsed.storage.memory_dir, config.storage.memory_dir);
    }
}
