//! Cellcounter Core Engine
//!
//! Interactive counting and measurement engine for grid-chamber images:
//! ROI geometry, chamber presets, reconciliation of automatic detections
//! with manual corrections, undo history, and concentration math.

pub mod chamber;
pub mod correction;
pub mod error;
pub mod export;
pub mod geometry;
pub mod params;
pub mod results;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use chamber::{ChamberKind, ChamberPreset, ConcentrationUnit, CountingRegion};
pub use correction::{CorrectionStore, DetectedPoint, Edit, EditOp, PointSource};
pub use error::{ChamberError, GeometryError, ParameterError, SessionError};
pub use geometry::{Point, Polygon};
pub use params::DetectionParameters;
pub use results::{ResultRow, ResultTable};
pub use session::{DetectionJob, Roi, RoiId, Session};
pub use settings::{Settings, Theme};
