//! Run report.
//!
//! A RunReport summarises one invocation of the batch job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a single batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run (log correlation only)
    pub id: Uuid,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of posts returned by the feed
    pub fetched: usize,

    /// Ids dropped because they were already published
    pub already_published: Vec<String>,

    /// Ids dropped because they appeared earlier in the same feed page
    #[serde(default)]
    pub repeated: Vec<String>,

    /// Ids skipped because they carry no images
    pub skipped_no_images: Vec<String>,

    /// Ids published during this run, in publish order
    pub published: Vec<String>,

    /// Ids that failed, with the error message
    pub failed: Vec<PostFailure>,

    /// True when nothing was sent to the destination on purpose
    #[serde(default)]
    pub dry_run: bool,
}

/// A post that could not be published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFailure {
    pub post_id: String,
    pub error: String,
}

impl RunReport {
    /// Start a new report
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            finished_at: None,
            fetched: 0,
            already_published: Vec::new(),
            repeated: Vec::new(),
            skipped_no_images: Vec::new(),
            published: Vec::new(),
            failed: Vec::new(),
            dry_run: false,
        }
    }

    pub fn record_failure(&mut self, post_id: impl Into<String>, error: impl ToString) {
        self.failed.push(PostFailure {
            post_id: post_id.into(),
            error: error.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Posts left after dropping known and repeated ids
    pub fn candidates(&self) -> usize {
        self.fetched
            .saturating_sub(self.already_published.len())
            .saturating_sub(self.repeated.len())
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
