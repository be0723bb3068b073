//! Similarity index: topic strings mapped to opaque values, queried by distance
//!
//! The archive only depends on the `SimilarityIndex` trait. `LocalSimilarityIndex`
//! is the built-in implementation: an in-memory brute-force scan over
//! embeddings, snapshotted to `<dir>/string_pairs.json`. Every failure,
//! filesystem or embedding, surfaces as `Error::Index`; only an unparseable
//! snapshot is `StorageCorrupt`.

use super::embedder::{self, squared_l2, Embedder};
use super::snapshot;
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// File name of the pair snapshot inside the index directory
pub const PAIRS_FILE: &str = "string_pairs.json";

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    /// The stored key that matched
    pub key: String,
    /// Value associated with that key
    pub value: String,
    /// Non-negative distance, lower is more similar
    pub distance: f64,
}

/// Nearest-neighbour store of (key, value) associations
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Record an association
    async fn add(&self, key: &str, value: &str) -> Result<()>;

    /// Up to `top_k` associations whose key lies closer than
    /// `distance_threshold` to `key`, nearest first.
    async fn query(
        &self,
        key: &str,
        top_k: usize,
        distance_threshold: f64,
    ) -> Result<Vec<IndexMatch>>;

    /// Flush to durable storage
    async fn persist(&self) -> Result<()>;

    /// Drop every association, in memory and on disk
    async fn reset(&self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StringPair {
    key: String,
    value: String,
}

struct IndexEntry {
    pair: StringPair,
    embedding: Vec<f32>,
}

/// Directory-backed brute-force similarity index
pub struct LocalSimilarityIndex {
    dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    entries: Arc<RwLock<Vec<IndexEntry>>>,
}

impl LocalSimilarityIndex {
    /// Open the index in `dir` with the embedder selected by `config`
    pub async fn open(
        dir: impl Into<PathBuf>,
        reset: bool,
        config: &IndexConfig,
    ) -> Result<Self> {
        Self::with_embedder(dir, reset, embedder::from_config(config)?).await
    }

    /// Open the index in `dir` with a caller-supplied embedder.
    ///
    /// With `reset` the directory is wiped. Otherwise stored pairs are loaded
    /// and re-embedded; an unreadable snapshot is `StorageCorrupt`.
    pub async fn with_embedder(
        dir: impl Into<PathBuf>,
        reset: bool,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let dir = dir.into();

        if reset {
            tracing::info!("Resetting similarity index at {}", dir.display());
            wipe_dir(&dir).await?;
        } else {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| io_error("create", &dir, e))?;
        }

        let pairs: Vec<StringPair> = match snapshot::read(&dir.join(PAIRS_FILE)).await {
            Ok(pairs) => pairs.unwrap_or_default(),
            Err(Error::Io(e)) => return Err(io_error("read", &dir.join(PAIRS_FILE), e)),
            Err(e) => return Err(e),
        };
        let entries = pairs
            .into_iter()
            .map(|pair| {
                Ok(IndexEntry {
                    embedding: embedder.embed(&pair.key)?,
                    pair,
                })
            })
            .collect::<Result<Vec<IndexEntry>>>()?;

        if !entries.is_empty() {
            tracing::info!(
                "Loaded {} string pairs from {} ({})",
                entries.len(),
                dir.display(),
                embedder.model_name()
            );
        }

        Ok(Self {
            dir,
            embedder,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Index directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of stored associations
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SimilarityIndex for LocalSimilarityIndex {
    async fn add(&self, key: &str, value: &str) -> Result<()> {
        let embedding = self.embedder.embed(key)?;
        self.entries.write().await.push(IndexEntry {
            pair: StringPair {
                key: key.to_string(),
                value: value.to_string(),
            },
            embedding,
        });
        tracing::trace!("Indexed {:?} -> {}", key, value);
        Ok(())
    }

    async fn query(
        &self,
        key: &str,
        top_k: usize,
        distance_threshold: f64,
    ) -> Result<Vec<IndexMatch>> {
        let query = self.embedder.embed(key)?;
        let entries = self.entries.read().await;

        let mut matches: Vec<IndexMatch> = entries
            .iter()
            .map(|entry| IndexMatch {
                key: entry.pair.key.clone(),
                value: entry.pair.value.clone(),
                distance: squared_l2(&query, &entry.embedding) as f64,
            })
            .filter(|m| m.distance < distance_threshold)
            .collect();

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn persist(&self) -> Result<()> {
        let pairs: Vec<StringPair> = self
            .entries
            .read()
            .await
            .iter()
            .map(|e| e.pair.clone())
            .collect();

        snapshot::write_atomic(&self.dir.join(PAIRS_FILE), &pairs)
            .await
            .map_err(|e| Error::Index(format!("failed to save string pairs: {}", e)))
    }

    async fn reset(&self) -> Result<()> {
        self.entries.write().await.clear();
        wipe_dir(&self.dir).await
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Index(format!("failed to {} {}: {}", action, path.display(), e))
}

/// Delete `dir` if present and recreate it empty
async fn wipe_dir(dir: &Path) -> Result<()> {
    let exists = tokio::fs::try_exists(dir)
        .await
        .map_err(|e| io_error("inspect", dir, e))?;
    if exists {
        tokio::fs::remove_dir_all(dir)
            .await
            .map_err(|e| io_error("wipe", dir, e))?;
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| io_error("create", dir, e))
}
