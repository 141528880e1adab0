//! Error taxonomy for the counting engine
//!
//! Every variant here is a local, recoverable failure reported to the
//! caller; none terminates the process. Internal invariant violations
//! (e.g. an edit cursor outside the log) are debug assertions instead.

use thiserror::Error;

use crate::session::RoiId;

/// Malformed ROI operation. Recovered locally; never crashes a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("polygon is already closed")]
    AlreadyClosed,
    #[error("cannot close a polygon with {0} vertices (need at least 3)")]
    TooFewVertices(usize),
    #[error("polygon must be closed before it can be used as a ROI")]
    NotClosed,
}

/// Unknown chamber preset or counting region key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChamberError {
    #[error("unknown chamber preset key '{0}'")]
    UnknownPreset(String),
    #[error("chamber '{chamber}' has no counting region '{region}'")]
    UnknownRegion { chamber: String, region: String },
}

/// Detection parameter set rejected at the validation boundary.
///
/// Validation happens before any detection capability call; degenerate
/// area ranges are a known source of native detector crashes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("minimum blob area must be positive (got {0})")]
    NonPositiveMinArea(f64),
    #[error("minimum blob area {min} exceeds maximum {max}")]
    AreaRangeInverted { min: f64, max: f64 },
    #[error("threshold range is degenerate ({min}..{max})")]
    ThresholdRangeInverted { min: f64, max: f64 },
    #[error("threshold step must be positive (got {0})")]
    NonPositiveThresholdStep(f64),
    #[error("minimum circularity must lie in (0, 1] (got {0})")]
    CircularityOutOfRange(f64),
}

/// Failure of a per-tab session operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidParameters(#[from] ParameterError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Chamber(#[from] ChamberError),
    #[error("a detection run is in flight for this tab")]
    Busy,
    #[error("no ROI with id {0}")]
    RoiNotFound(RoiId),
    #[error("tab has been closed")]
    Closed,
}
