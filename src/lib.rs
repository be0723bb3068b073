//! Insight Archive - persistent topic-indexed memory for task-solving agents
//!
//! Short natural-language lessons ("insights") learned from completed tasks
//! are stored under one or more topics. Retrieval matches new topics against
//! the stored ones by similarity and ranks insights by summed relevance.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    KnowledgeArchive                       │
//! │   add_insight / add_demonstration / get_relevant_insights │
//! └───────────┬──────────────────────────────┬───────────────┘
//!             │ topic → id                   │ id → insight
//! ┌───────────▼────────────┐     ┌───────────▼────────────┐
//! │    SimilarityIndex     │     │      InsightStore      │
//! │  (LocalSimilarityIndex │     │   insights.json        │
//! │   string_map/)         │     │   snapshot             │
//! └────────────────────────┘     └────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`memory`]: archive, index, store and their building blocks
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod memory;

pub use config::ArchiveConfig;
pub use error::{Error, Result};
pub use memory::{Insight, KnowledgeArchive, SimilarityIndex};
