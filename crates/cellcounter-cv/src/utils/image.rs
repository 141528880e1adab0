//! Image loading utilities

use crate::Result;
use anyhow::Context;
use cellcounter_core::{Point, Polygon};
use image::GrayImage;
use std::path::Path;

/// Image utility functions for the detection pipeline
pub struct ImageUtils;

impl ImageUtils {
    /// Load an image from disk as 8-bit grayscale.
    pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?;
        Ok(img.to_luma8())
    }

    /// Rectangular ROI covering the whole image.
    pub fn full_image_roi(image: &GrayImage) -> Polygon {
        let (w, h) = (image.width() as f64, image.height() as f64);
        // The constructor only rejects degenerate vertex sets
        Polygon::from_vertices([
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ])
        .expect("rectangle is a valid polygon")
    }
}
