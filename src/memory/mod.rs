//! Memory system: topic-indexed insights
//!
//! Layer 1 (Index): topic strings mapped to insight ids by similarity.
//! Layer 2 (Store): durable id → insight snapshot.
//! Layer 3 (Archive): relevance aggregation across topics.

pub mod archive;
pub mod embedder;
pub mod index;
pub mod insight;
pub mod insight_store;
pub mod page_log;
pub mod snapshot;

pub use archive::{KnowledgeArchive, RelevanceMap};
pub use embedder::{Embedder, HashingEmbedder};
#[cfg(feature = "local-embeddings")]
pub use embedder::MiniLmEmbedder;
pub use index::{IndexMatch, LocalSimilarityIndex, SimilarityIndex};
pub use insight::Insight;
pub use insight_store::InsightStore;
pub use page_log::{FilePageLog, NoopPageLog, PageLog, TracingPageLog};
