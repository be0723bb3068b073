//! File-backed insight store
//!
//! Owns the id → `Insight` mapping and the id counter. `open` and `persist` are
//! the only places the mapping crosses the disk boundary; callers get read
//! access only.

use super::insight::Insight;
use super::snapshot;
use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Durable store of insights keyed by their dense string id
pub struct InsightStore {
    path: PathBuf,
    insights: HashMap<String, Insight>,
    next_id: u64,
}

impl InsightStore {
    /// Open the store at `path`.
    ///
    /// With `reset`, any existing snapshot is replaced by an empty one.
    /// Otherwise a prior snapshot is loaded and the counter resumes at its
    /// size. A snapshot that fails to parse is reported as `StorageCorrupt`.
    pub async fn open(path: impl Into<PathBuf>, reset: bool) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path,
            insights: HashMap::new(),
            next_id: 0,
        };

        if reset {
            tracing::info!("Resetting insight store at {}", store.path.display());
            store.persist().await?;
            return Ok(store);
        }

        if let Some(insights) = snapshot::read::<HashMap<String, Insight>>(&store.path).await? {
            store.next_id = insights.len() as u64;
            store.insights = insights;
            tracing::info!(
                "Loaded {} insights from {}",
                store.insights.len(),
                store.path.display()
            );
        }

        Ok(store)
    }

    /// Allocate the next id. Never returns an id already in the store.
    pub fn allocate_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = self.next_id.to_string();
            if !self.insights.contains_key(&id) {
                return id;
            }
        }
    }

    /// Store an insight under its id, returning the id
    pub fn put(&mut self, insight: Insight) -> String {
        let id = insight.id.clone();
        self.insights.insert(id.clone(), insight);
        id
    }

    /// Atomically write the full mapping to disk
    pub async fn persist(&self) -> Result<()> {
        tracing::debug!(
            "Saving {} insights to {}",
            self.insights.len(),
            self.path.display()
        );
        snapshot::write_atomic(&self.path, &self.insights).await
    }

    /// Drop every insight, restart ids at 1, and persist the empty mapping
    pub async fn reset(&mut self) -> Result<()> {
        self.insights.clear();
        self.next_id = 0;
        self.persist().await
    }

    /// Retrieve an insight by id
    pub fn get(&self, id: &str) -> Option<&Insight> {
        self.insights.get(id)
    }

    /// Iterate over all stored insights in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Insight> {
        self.insights.values()
    }

    pub fn len(&self) -> usize {
        self.insights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
    }

    /// Last id handed out (equals `len()` after every successful insert)
    pub fn next_id_counter(&self) -> u64 {
        self.next_id
    }

    /// Snapshot location
    pub fn path(&self) -> &Path {
        &self.path
    }
}
