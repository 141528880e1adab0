//! Detection adapter
//!
//! Single entry point between the counting engine and the detection
//! capability. Parameters are validated here, before any capability call;
//! a capability failure is surfaced unchanged, with no retries. Result
//! points are untagged; assignment to ROIs happens downstream via
//! containment tests.

use cellcounter_core::{DetectionParameters, ParameterError, Point, Polygon};
use image::GrayImage;
use thiserror::Error;

use crate::traits::CellDetector;

/// Failure of an adapter-mediated detection run.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// Rejected at the validation boundary; the capability was never called.
    #[error(transparent)]
    InvalidParameters(#[from] ParameterError),
    /// The external capability failed; prior results stay untouched.
    #[error("detection capability failed: {0}")]
    Failed(anyhow::Error),
}

/// Wraps a detection capability behind the validation boundary.
pub struct DetectionAdapter<D: CellDetector> {
    detector: D,
}

impl<D: CellDetector> DetectionAdapter<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    /// Run detection over a full image.
    pub fn detect(
        &self,
        image: &GrayImage,
        params: &DetectionParameters,
    ) -> Result<Vec<Point>, DetectionError> {
        params.validate()?;
        log::debug!(
            "running detection on {}x{} image (area {}..{})",
            image.width(),
            image.height(),
            params.min_area,
            params.max_area
        );
        self.detector
            .detect(image, params)
            .map_err(DetectionError::Failed)
    }

    /// Run detection and keep only candidates inside the given ROI.
    pub fn detect_in_roi(
        &self,
        image: &GrayImage,
        params: &DetectionParameters,
        roi: &Polygon,
    ) -> Result<Vec<Point>, DetectionError> {
        let points = self.detect(image, params)?;
        Ok(filter_by_roi(points, roi))
    }

    /// Detect over several images with one parameter set. Images belong to
    /// independent tabs, so runs may proceed in parallel.
    pub fn detect_batch(
        &self,
        images: &[GrayImage],
        params: &DetectionParameters,
    ) -> Result<Vec<Vec<Point>>, DetectionError>
    where
        D: Sync,
    {
        params.validate()?;

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            images
                .par_iter()
                .map(|image| {
                    self.detector
                        .detect(image, params)
                        .map_err(DetectionError::Failed)
                })
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            images
                .iter()
                .map(|image| {
                    self.detector
                        .detect(image, params)
                        .map_err(DetectionError::Failed)
                })
                .collect()
        }
    }
}

/// Drop candidates outside the ROI boundary (even-odd rule).
pub fn filter_by_roi(points: Vec<Point>, roi: &Polygon) -> Vec<Point> {
    points
        .into_iter()
        .filter(|&point| roi.contains(point))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Capability stub that records how often it was invoked.
    struct StubDetector {
        calls: AtomicUsize,
        points: Vec<Point>,
        fail: bool,
    }

    impl StubDetector {
        fn returning(points: Vec<Point>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                points,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                points: Vec::new(),
                fail: true,
            }
        }
    }

    impl CellDetector for StubDetector {
        fn detect(
            &self,
            _image: &GrayImage,
            _params: &DetectionParameters,
        ) -> crate::Result<Vec<Point>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("capability exploded");
            }
            Ok(self.points.clone())
        }
    }

    fn blank() -> GrayImage {
        GrayImage::new(10, 10)
    }

    #[test]
    fn test_invalid_params_never_reach_capability() {
        let adapter = DetectionAdapter::new(StubDetector::returning(vec![]));
        let params = DetectionParameters {
            min_area: 0.0,
            ..Default::default()
        };

        let err = adapter.detect(&blank(), &params).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidParameters(_)));
        assert_eq!(adapter.detector.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_capability_failure_surfaced_unchanged() {
        let adapter = DetectionAdapter::new(StubDetector::failing());
        let err = adapter
            .detect(&blank(), &DetectionParameters::default())
            .unwrap_err();
        assert!(matches!(err, DetectionError::Failed(_)));
        // Exactly one attempt; the adapter never retries.
        assert_eq!(adapter.detector.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_roi_filtering() {
        let inside = Point::new(5.0, 5.0);
        let outside = Point::new(50.0, 50.0);
        let adapter = DetectionAdapter::new(StubDetector::returning(vec![inside, outside]));
        let roi = Polygon::from_vertices([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ])
        .unwrap();

        let points = adapter
            .detect_in_roi(&blank(), &DetectionParameters::default(), &roi)
            .unwrap();
        assert_eq!(points, vec![inside]);
    }

    #[test]
    fn test_batch_detection() {
        let adapter = DetectionAdapter::new(StubDetector::returning(vec![Point::new(1.0, 1.0)]));
        let images = vec![blank(), blank(), blank()];
        let results = adapter
            .detect_batch(&images, &DetectionParameters::default())
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|points| points.len() == 1));
    }
}
