//! Image compositing.
//!
//! Merges several images into one canvas before a single-image publish.
//!
//! The module is split into:
//! - **Layout**: pure functions and types describing where each image goes
//! - **Compositor**: the [`Compositor`] trait and the [`RasterCompositor`]
//!   implementation backed by the `image` crate

pub mod compositor;
pub mod layout;

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

pub use compositor::RasterCompositor;
pub use layout::{
    fit_within, Color, CompositeLayout, Fit, LayoutMode, OutputFormat, Tile, MAX_JPEG_SIDE,
    MAX_POST_IMAGES,
};

/// Errors produced while composing images
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Compositing needs at least 2 images, got {0}")]
    TooFewImages(usize),

    #[error("Layout tiles must be non-empty, got {width}x{height}")]
    EmptyTile { width: u32, height: u32 },

    #[error("Canvas for {images} tiles of {width}x{height} is too large to encode")]
    CanvasTooLarge {
        images: usize,
        width: u32,
        height: u32,
    },

    #[error("Layout has {tiles} tiles but {images} images were given")]
    LayoutMismatch { images: usize, tiles: usize },

    #[error("Image {index} could not be decoded: {source}")]
    Decode {
        index: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode composite: {0}")]
    Encode(#[source] image::ImageError),
}

/// Combines an ordered sequence of encoded images into one encoded image
pub trait Compositor: Send + Sync {
    fn compose(&self, images: &[Vec<u8>], layout: &CompositeLayout)
        -> Result<Vec<u8>, ComposeError>;
}

/// Compose local image files and write the result to `output`
pub async fn compose_files(
    compositor: &dyn Compositor,
    inputs: &[impl AsRef<Path>],
    mode: &LayoutMode,
    format: OutputFormat,
    output: &Path,
) -> Result<CompositeLayout> {
    let mut images = Vec::with_capacity(inputs.len());
    for input in inputs {
        let input = input.as_ref();
        let bytes = tokio::fs::read(input)
            .await
            .with_context(|| format!("Failed to read image: {}", input.display()))?;
        images.push(bytes);
    }

    let layout = CompositeLayout::plan(mode, images.len(), format)?;
    let combined = compositor.compose(&images, &layout)?;

    tokio::fs::write(output, combined)
        .await
        .with_context(|| format!("Failed to write composite: {}", output.display()))?;

    Ok(layout)
}
