//! crosspost - Bluesky to Instagram image republisher
//!
//! A single-run batch job: fetch the newest posts of one Bluesky account,
//! skip the ones already published, and republish the images of the rest to
//! an Instagram business account. Meant to be invoked by a scheduler.
//!
//! # Architecture
//!
//! Every run is strictly sequential:
//! - The feed is fetched once and filtered against the post log
//! - Each new post is published (single image, composite, or carousel)
//! - Each success is written to the post log immediately, so a killed run
//!   still remembers what it already published
//!
//! # Modules
//!
//! - `adapters`: External system integrations (Bluesky, ImgBB, Instagram)
//! - `core`: Orchestration logic (PostLog, MediaPublisher, Orchestrator)
//! - `domain`: Data structures (Post, MediaAsset, RunReport)
//! - `imaging`: Composite layouts and the raster compositor
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Publish new posts
//! crosspost run
//!
//! # Preview without publishing
//! crosspost run --dry-run
//!
//! # Inspect the post log
//! crosspost status
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod imaging;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use self::core::{MediaPublisher, Orchestrator, PublishMode};
pub use domain::{Post, RunReport};
pub use imaging::{CompositeLayout, LayoutMode};
