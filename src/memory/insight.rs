//! Insight data types
//!
//! An insight is a short lesson learned from a completed task. It is indexed by
//! one or more topics and never changes after creation.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored lesson, indexed by topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Dense, 1-based identifier ("1", "2", ...)
    pub id: String,
    /// The lesson text
    pub insight_str: String,
    /// Originating task description, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_str: Option<String>,
    /// Topics this insight is indexed under (never empty)
    pub topics: Vec<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Insight {
    /// Create an insight, rejecting an empty topic list.
    pub fn new(
        id: impl Into<String>,
        insight_str: impl Into<String>,
        task_str: Option<String>,
        topics: Vec<String>,
    ) -> Result<Self> {
        require_topics(&topics)?;
        Ok(Self {
            id: id.into(),
            insight_str: insight_str.into(),
            task_str,
            topics,
            created_at: Utc::now(),
        })
    }
}

/// Text of an insight synthesized from a task and a worked solution.
pub fn demonstration_text(task: &str, demonstration: &str) -> String {
    format!(
        "Example task:\n\n{}\nExample solution:\n\n{}",
        task, demonstration
    )
}

/// The one topic rule shared by every write and read entry point.
pub fn require_topics(topics: &[String]) -> Result<()> {
    if topics.is_empty() {
        return Err(Error::InvalidArgument(
            "at least one topic is required".to_string(),
        ));
    }
    Ok(())
}

/// Retrieval needs a task or topics; topics are currently mandatory because
/// they are never derived from the task.
pub fn require_task_or_topics(task_str: Option<&str>, topics: &[String]) -> Result<()> {
    if task_str.is_none() && topics.is_empty() {
        return Err(Error::InvalidArgument(
            "either a task or a list of topics must be provided".to_string(),
        ));
    }
    require_topics(topics)
}
