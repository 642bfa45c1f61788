//! Domain types for crosspost.
//!
//! This module contains the core data structures:
//! - Post: a source post and its images
//! - MediaAsset: an image on its way to the destination
//! - RunReport: outcome of one batch run

pub mod media;
pub mod post;
pub mod run;

// Re-export commonly used types
pub use media::MediaAsset;
pub use post::{ImageRef, Post};
pub use run::{PostFailure, RunReport};
