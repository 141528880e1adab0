//! Blob detection parameter set
//!
//! Strongly typed and checked at a single validation boundary before any
//! detection capability is invoked.

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

/// Parameters handed to the detection capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionParameters {
    /// Lowest binarization threshold of the sweep.
    pub min_threshold: f64,
    /// Highest binarization threshold of the sweep.
    pub max_threshold: f64,
    /// Sweep step between thresholds.
    pub threshold_step: f64,
    /// Minimum candidate blob area in square pixels.
    pub min_area: f64,
    /// Maximum candidate blob area in square pixels.
    pub max_area: f64,
    /// Whether candidates are filtered by circularity.
    pub use_circularity: bool,
    /// Circularity lower bound, 4*pi*area/perimeter^2, in (0, 1].
    pub min_circularity: f64,
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            min_threshold: 10.0,
            max_threshold: 220.0,
            threshold_step: 10.0,
            min_area: 20.0,
            max_area: 1000.0,
            use_circularity: true,
            min_circularity: 0.4,
        }
    }
}

impl DetectionParameters {
    /// Reject degenerate parameter sets before they reach a detector.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.min_area <= 0.0 {
            return Err(ParameterError::NonPositiveMinArea(self.min_area));
        }
        if self.min_area > self.max_area {
            return Err(ParameterError::AreaRangeInverted {
                min: self.min_area,
                max: self.max_area,
            });
        }
        if self.min_threshold >= self.max_threshold {
            return Err(ParameterError::ThresholdRangeInverted {
                min: self.min_threshold,
                max: self.max_threshold,
            });
        }
        if self.threshold_step <= 0.0 {
            return Err(ParameterError::NonPositiveThresholdStep(self.threshold_step));
        }
        if self.use_circularity && !(self.min_circularity > 0.0 && self.min_circularity <= 1.0) {
            return Err(ParameterError::CircularityOutOfRange(self.min_circularity));
        }
        Ok(())
    }
}
