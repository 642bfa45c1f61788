//! Core orchestration logic.
//!
//! This module contains:
//! - PostLog: Persisted set of published post ids
//! - MediaPublisher: Container → publish sequences
//! - Orchestrator: Main run loop

pub mod orchestrator;
pub mod post_log;
pub mod publisher;

// Re-export commonly used types
pub use orchestrator::{filter_new_posts, FilteredPosts, Orchestrator, RunSettings};
pub use post_log::{JsonFileLog, PostLog, ProcessedPosts};
pub use publisher::{MediaPublisher, PublishError, PublishMode, PublishStep, Target};
