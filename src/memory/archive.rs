//! Knowledge archive: topic-indexed insight storage and relevance retrieval
//!
//! Writes fan out to the insight store and the similarity index (one
//! association per topic), then both are persisted before the call returns.
//!
//! Retrieval queries the index once per topic and sums `threshold - distance`
//! over every match, bucketed by insight text. An insight reached through
//! several topics accumulates evidence; a lone weak match can go negative and
//! is dropped. Scores are not normalised by topic count.
//!
//! Failure model: the index and the store are two independent writes with no
//! transaction between them. If one persists and the other fails, the archive
//! stays inconsistent until the next successful write. Errors are surfaced to
//! the caller unchanged; nothing is retried or rolled back.

use super::index::{LocalSimilarityIndex, SimilarityIndex};
use super::insight::{demonstration_text, require_task_or_topics, require_topics, Insight};
use super::insight_store::InsightStore;
use super::page_log::{FilePageLog, PageLog, TracingPageLog};
use crate::config::{ArchiveConfig, RetrievalConfig};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Insight text mapped to its summed relevance score
pub type RelevanceMap = HashMap<String, f64>;

/// Topic-indexed insight archive
pub struct KnowledgeArchive {
    index: Arc<dyn SimilarityIndex>,
    store: InsightStore,
    page_log: Arc<dyn PageLog>,
    retrieval: RetrievalConfig,
}

impl KnowledgeArchive {
    /// Wire an archive from already-opened collaborators
    pub fn new(
        index: Arc<dyn SimilarityIndex>,
        store: InsightStore,
        page_log: Arc<dyn PageLog>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            store,
            page_log,
            retrieval,
        }
    }

    /// Open the built-in local index and insight store for the configured run
    pub async fn open(config: &ArchiveConfig) -> Result<Self> {
        let storage = &config.storage;
        let run_dir = storage.run_dir();
        tokio::fs::create_dir_all(&run_dir).await?;

        let page_log: Arc<dyn PageLog> = if config.page_log.enabled {
            let path = config
                .page_log
                .path
                .clone()
                .unwrap_or_else(|| run_dir.join("page_log.txt"));
            Arc::new(FilePageLog::create(path)?)
        } else {
            Arc::new(TracingPageLog)
        };
        page_log.append("Creating KnowledgeArchive");

        let index =
            LocalSimilarityIndex::open(storage.index_dir(), storage.reset, &config.index).await?;
        let store = InsightStore::open(storage.insights_path(), storage.reset).await?;

        page_log.append(&format!(
            "{} insights loaded from {}",
            store.len(),
            store.path().display()
        ));
        tracing::info!(
            "Opened knowledge archive at {} ({} insights)",
            run_dir.display(),
            store.len()
        );

        Ok(Self::new(
            Arc::new(index),
            store,
            page_log,
            config.retrieval.clone(),
        ))
    }

    /// Add an insight indexed under `topics`, returning its id.
    pub async fn add_insight(
        &mut self,
        insight_str: &str,
        task_str: Option<&str>,
        topics: &[String],
    ) -> Result<String> {
        self.insert(
            insight_str.to_string(),
            task_str.map(str::to_string),
            topics,
        )
        .await
    }

    /// Add a task together with a worked solution as a single insight.
    pub async fn add_demonstration(
        &mut self,
        task: &str,
        demonstration: &str,
        topics: &[String],
    ) -> Result<String> {
        self.insert(
            demonstration_text(task, demonstration),
            Some(task.to_string()),
            topics,
        )
        .await
    }

    async fn insert(
        &mut self,
        insight_str: String,
        task_str: Option<String>,
        topics: &[String],
    ) -> Result<String> {
        require_topics(topics)?;

        let id = self.store.allocate_id();
        let insight = Insight::new(id.clone(), insight_str, task_str, topics.to_vec())?;
        self.page_log
            .append(&format!("\nINSIGHT {}\n{}", id, insight.insight_str));
        self.store.put(insight);

        for topic in topics {
            self.page_log.append(&format!("  TOPIC = {}", topic));
            self.index.add(topic, &id).await?;
        }

        self.save().await?;
        tracing::info!("Added insight {} under {} topics", id, topics.len());
        Ok(id)
    }

    async fn save(&self) -> Result<()> {
        self.index.persist().await?;
        self.page_log.append(&format!(
            "Saving {} insights to {}",
            self.store.len(),
            self.store.path().display()
        ));
        self.store.persist().await
    }

    /// Insights relevant to the given topics, keyed by text.
    ///
    /// `task_str` is accepted for callers that have one, but only `topics`
    /// drive the query. The result is unordered; see [`Self::rank`].
    pub async fn get_relevant_insights(
        &self,
        task_str: Option<&str>,
        topics: &[String],
    ) -> Result<RelevanceMap> {
        require_task_or_topics(task_str, topics)?;

        let threshold = self.retrieval.relevance_threshold;
        let mut relevance = RelevanceMap::new();

        for topic in topics {
            let matches = self
                .index
                .query(
                    topic,
                    self.retrieval.n_results,
                    self.retrieval.distance_threshold,
                )
                .await?;
            tracing::debug!("Topic {:?} matched {} associations", topic, matches.len());

            for m in matches {
                let insight = self.store.get(&m.value).ok_or_else(|| {
                    Error::Index(format!(
                        "association {:?} -> {} references an unknown insight",
                        m.key, m.value
                    ))
                })?;
                *relevance.entry(insight.insight_str.clone()).or_insert(0.0) +=
                    threshold - m.distance;
            }
        }

        relevance.retain(|_, score| *score >= 0.0);

        self.page_log.append(&format!(
            "\n{} POTENTIALLY RELEVANT INSIGHTS",
            relevance.len()
        ));
        for (text, score) in &relevance {
            self.page_log
                .append(&format!("  INSIGHT: {}\n  RELEVANCE: {:.3}", text, score));
        }

        Ok(relevance)
    }

    /// Sort a relevance map by descending score (ties by text)
    pub fn rank(relevance: RelevanceMap) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = relevance.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }

    /// Wipe every insight and association, in memory and on disk
    pub async fn reset(&mut self) -> Result<()> {
        self.page_log.append("Resetting knowledge archive");
        self.index.reset().await?;
        self.store.reset().await?;
        tracing::info!("Knowledge archive reset");
        Ok(())
    }

    /// True if any insight is stored
    pub fn contains_insights(&self) -> bool {
        !self.store.is_empty()
    }

    /// Number of stored insights
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True if no insight is stored
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Look up an insight by id
    pub fn get_insight(&self, id: &str) -> Option<&Insight> {
        self.store.get(id)
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &InsightStore {
        &self.store
    }
}
