//! Raster compositor built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` |
//! | Fill tile | `DynamicImage::resize_to_fill` with `Lanczos3` |
//! | Contain tile | `DynamicImage::resize_exact` to [`fit_within`] |
//! | Place | `image::imageops::overlay` |
//! | Encode | `DynamicImage::write_to` (PNG, or JPEG after dropping alpha) |

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::debug;

use super::layout::{center_offset, fit_within, CompositeLayout, Fit, OutputFormat};
use super::{ComposeError, Compositor};

/// Compositor that decodes, scales and encodes in process
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterCompositor;

impl RasterCompositor {
    pub fn new() -> Self {
        Self
    }
}

fn decode(index: usize, bytes: &[u8]) -> Result<DynamicImage, ComposeError> {
    image::load_from_memory(bytes).map_err(|source| ComposeError::Decode { index, source })
}

fn encode(canvas: RgbaImage, format: OutputFormat) -> Result<Vec<u8>, ComposeError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        OutputFormat::Png => DynamicImage::ImageRgba8(canvas).write_to(&mut out, ImageFormat::Png),
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
            .write_to(&mut out, ImageFormat::Jpeg),
    }
    .map_err(ComposeError::Encode)?;
    Ok(out.into_inner())
}

impl Compositor for RasterCompositor {
    fn compose(
        &self,
        images: &[Vec<u8>],
        layout: &CompositeLayout,
    ) -> Result<Vec<u8>, ComposeError> {
        if images.len() < 2 {
            return Err(ComposeError::TooFewImages(images.len()));
        }
        if images.len() != layout.tiles.len() {
            return Err(ComposeError::LayoutMismatch {
                images: images.len(),
                tiles: layout.tiles.len(),
            });
        }

        // Decode everything first so a bad payload fails before any scaling work
        let decoded = images
            .iter()
            .enumerate()
            .map(|(i, bytes)| decode(i, bytes))
            .collect::<Result<Vec<_>, _>>()?;

        let mut canvas = RgbaImage::from_pixel(
            layout.canvas_width,
            layout.canvas_height,
            Rgba(layout.background.0),
        );

        for (img, tile) in decoded.iter().zip(&layout.tiles) {
            let (placed, x, y) = match layout.fit {
                Fit::Fill => (
                    img.resize_to_fill(tile.width, tile.height, FilterType::Lanczos3),
                    tile.x,
                    tile.y,
                ),
                Fit::Contain => {
                    let (w, h) = fit_within((img.width(), img.height()), (tile.width, tile.height));
                    (
                        img.resize_exact(w, h, FilterType::Lanczos3),
                        tile.x + center_offset(tile.width, w),
                        tile.y + center_offset(tile.height, h),
                    )
                }
            };

            debug!(
                src_w = img.width(),
                src_h = img.height(),
                w = placed.width(),
                h = placed.height(),
                x,
                y,
                "Placing image"
            );
            imageops::overlay(&mut canvas, &placed.to_rgba8(), x as i64, y as i64);
        }

        encode(canvas, layout.format)
    }
}
