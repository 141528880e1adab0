//! Cellcounter Computer Vision Library
//!
//! Detection adapter and a reference blob detector for locating cell
//! candidates in grid-chamber images. The adapter treats the detector as a
//! pluggable capability; any `CellDetector` implementation can stand in.

pub mod adapter;
pub mod blob;
pub mod utils;

// Re-export commonly used types
pub use adapter::{DetectionAdapter, DetectionError};
pub use blob::BlobDetector;
pub use utils::ImageUtils;

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV system
pub mod traits {
    use cellcounter_core::{DetectionParameters, Point};
    use image::GrayImage;

    /// The external detection capability: given an image and a validated
    /// parameter set, return candidate particle centers.
    ///
    /// Implementations must be deterministic for identical image and
    /// parameters. Parameter validation is the adapter's job; a detector
    /// may assume the set it receives is well-formed.
    pub trait CellDetector {
        fn detect(
            &self,
            image: &GrayImage,
            params: &DetectionParameters,
        ) -> crate::Result<Vec<Point>>;
    }
}
