//! Per-tab session state and detection lifecycle
//!
//! One `Session` owns all mutable state for one imported image: its ROIs,
//! detection parameters, per-ROI correction stores and chamber selection.
//! Detection runs are handed out as jobs carrying a generation snapshot;
//! results arriving after a state-invalidating change are dropped rather
//! than applied to stale state, so a long-running detection can complete
//! off-thread while the tab is edited, switched away from, or closed.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::chamber::{ChamberKind, ChamberPreset, ConcentrationUnit, CountingRegion};
use crate::correction::{CorrectionStore, DetectedPoint};
use crate::error::{GeometryError, SessionError};
use crate::geometry::{Point, Polygon};
use crate::params::DetectionParameters;

/// ROI identifier, unique within its tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RoiId(u32);

impl fmt::Display for RoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A closed polygon with its tab-unique identifier.
#[derive(Debug, Clone, Serialize)]
pub struct Roi {
    pub id: RoiId,
    pub polygon: Polygon,
}

/// Snapshot handed to the detection runner.
///
/// Carries the tab generation at the time the run started; the session only
/// accepts the result if the generation still matches on arrival.
#[derive(Debug, Clone)]
pub struct DetectionJob {
    generation: u64,
    params: DetectionParameters,
}

impl DetectionJob {
    pub fn params(&self) -> &DetectionParameters {
        &self.params
    }
}

#[derive(Debug)]
struct RoiSlot {
    roi: Roi,
    store: CorrectionStore,
}

/// State of one image tab.
#[derive(Debug)]
pub struct Session {
    label: String,
    image: Option<PathBuf>,
    params: DetectionParameters,
    chamber: ChamberPreset,
    region: CountingRegion,
    /// Counted volume over one square in µL; prefilled from the chamber and
    /// region, operator-overridable for custom chambers.
    volume_per_square_ul: f64,
    dilution: f64,
    sample_volume_ml: f64,
    rois: Vec<RoiSlot>,
    next_roi_id: u32,
    generation: u64,
    in_flight: Option<u64>,
    closed: bool,
}

impl Session {
    /// New tab with Improved Neubauer defaults.
    pub fn new(label: impl Into<String>) -> Self {
        let chamber = *ChamberKind::ImprovedNeubauer.preset();
        let region = chamber.regions[0];
        Self {
            label: label.into(),
            image: None,
            params: DetectionParameters::default(),
            chamber,
            region,
            volume_per_square_ul: region.square_volume_ul(chamber.depth_mm),
            dilution: chamber.default_dilution,
            sample_volume_ml: 1.0,
            rois: Vec::new(),
            next_roi_id: 1,
            generation: 0,
            in_flight: None,
            closed: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    /// Attach or replace the tab's image. Invalidates any in-flight run.
    pub fn set_image(&mut self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.image = Some(path.into());
        self.invalidate();
        Ok(())
    }

    pub fn parameters(&self) -> &DetectionParameters {
        &self.params
    }

    /// Replace the detection parameters after validating them.
    ///
    /// A parameter change is a structural invalidation: an in-flight run was
    /// started under the old parameters and its result will be dropped.
    pub fn set_parameters(&mut self, params: DetectionParameters) -> Result<(), SessionError> {
        self.ensure_open()?;
        params.validate()?;
        if params != self.params {
            self.params = params;
            self.invalidate();
        }
        Ok(())
    }

    pub fn chamber(&self) -> &ChamberPreset {
        &self.chamber
    }

    pub fn region(&self) -> &CountingRegion {
        &self.region
    }

    pub fn unit(&self) -> ConcentrationUnit {
        self.chamber.unit
    }

    /// Select a chamber preset; resets the region to the preset's first
    /// layout and refills the per-square volume.
    pub fn set_chamber(&mut self, kind: ChamberKind) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.chamber = *kind.preset();
        self.region = self.chamber.regions[0];
        self.volume_per_square_ul = self.region.square_volume_ul(self.chamber.depth_mm);
        Ok(())
    }

    /// Select a chamber preset by its stable key.
    pub fn set_chamber_by_key(&mut self, key: &str) -> Result<(), SessionError> {
        let kind = ChamberKind::from_key(key)?;
        self.set_chamber(kind)
    }

    /// Select a counting region of the current chamber by its stable key.
    pub fn set_region(&mut self, key: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let region = *self.chamber.region(key)?;
        self.region = region;
        if self.chamber.kind != ChamberKind::Custom {
            self.volume_per_square_ul = region.square_volume_ul(self.chamber.depth_mm);
        }
        Ok(())
    }

    pub fn volume_per_square_ul(&self) -> f64 {
        self.volume_per_square_ul
    }

    /// Operator override of the per-square volume (custom chamber workflow).
    pub fn set_volume_per_square_ul(&mut self, volume_ul: f64) {
        self.volume_per_square_ul = volume_ul;
    }

    /// Total counted volume over the selected region, in µL.
    pub fn counting_volume_ul(&self) -> f64 {
        self.volume_per_square_ul * f64::from(self.region.squares)
    }

    pub fn dilution(&self) -> f64 {
        self.dilution
    }

    pub fn set_dilution(&mut self, dilution: f64) {
        self.dilution = dilution;
    }

    pub fn sample_volume_ml(&self) -> f64 {
        self.sample_volume_ml
    }

    pub fn set_sample_volume_ml(&mut self, volume_ml: f64) {
        self.sample_volume_ml = volume_ml;
    }

    // --- ROI set ---------------------------------------------------------

    pub fn rois(&self) -> impl Iterator<Item = &Roi> {
        self.rois.iter().map(|slot| &slot.roi)
    }

    pub fn roi(&self, id: RoiId) -> Option<&Roi> {
        self.rois
            .iter()
            .find(|slot| slot.roi.id == id)
            .map(|slot| &slot.roi)
    }

    /// Add a finalized ROI. The polygon must already be closed.
    pub fn add_roi(&mut self, polygon: Polygon) -> Result<RoiId, SessionError> {
        self.ensure_open()?;
        self.ensure_idle()?;
        if !polygon.is_closed() {
            return Err(GeometryError::NotClosed.into());
        }
        let id = RoiId(self.next_roi_id);
        self.next_roi_id += 1;
        self.rois.push(RoiSlot {
            roi: Roi { id, polygon },
            store: CorrectionStore::new(),
        });
        self.invalidate();
        Ok(id)
    }

    pub fn remove_roi(&mut self, id: RoiId) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.ensure_idle()?;
        let index = self
            .rois
            .iter()
            .position(|slot| slot.roi.id == id)
            .ok_or(SessionError::RoiNotFound(id))?;
        self.rois.remove(index);
        self.invalidate();
        Ok(())
    }

    /// Redefine a ROI's boundary. Membership of existing points is decided
    /// at query time, so this re-partitions points without recording edits.
    pub fn set_roi_polygon(&mut self, id: RoiId, polygon: Polygon) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.ensure_idle()?;
        if !polygon.is_closed() {
            return Err(GeometryError::NotClosed.into());
        }
        self.slot_mut(id)?.roi.polygon = polygon;
        Ok(())
    }

    // --- Manual corrections ----------------------------------------------

    pub fn store(&self, id: RoiId) -> Result<&CorrectionStore, SessionError> {
        self.rois
            .iter()
            .find(|slot| slot.roi.id == id)
            .map(|slot| &slot.store)
            .ok_or(SessionError::RoiNotFound(id))
    }

    pub fn add_manual(&mut self, id: RoiId, point: Point) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.ensure_idle()?;
        self.slot_mut(id)?.store.add_manual(point);
        Ok(())
    }

    pub fn remove_near(
        &mut self,
        id: RoiId,
        point: Point,
        tolerance: f64,
    ) -> Result<Option<Point>, SessionError> {
        self.ensure_open()?;
        self.ensure_idle()?;
        Ok(self.slot_mut(id)?.store.remove_near(point, tolerance))
    }

    pub fn undo(&mut self, id: RoiId) -> Result<bool, SessionError> {
        self.ensure_open()?;
        self.ensure_idle()?;
        Ok(self.slot_mut(id)?.store.undo())
    }

    pub fn redo(&mut self, id: RoiId) -> Result<bool, SessionError> {
        self.ensure_open()?;
        self.ensure_idle()?;
        Ok(self.slot_mut(id)?.store.redo())
    }

    // --- Queries -----------------------------------------------------------

    /// Reconciled points that currently fall inside the ROI's boundary.
    pub fn roi_points(&self, id: RoiId) -> Result<Vec<DetectedPoint>, SessionError> {
        let slot = self
            .rois
            .iter()
            .find(|slot| slot.roi.id == id)
            .ok_or(SessionError::RoiNotFound(id))?;
        Ok(slot
            .store
            .reconciled()
            .into_iter()
            .filter(|detected| slot.roi.polygon.contains(detected.point))
            .collect())
    }

    pub fn roi_count(&self, id: RoiId) -> Result<usize, SessionError> {
        Ok(self.roi_points(id)?.len())
    }

    /// Sum of counts over all ROIs of the tab.
    pub fn total_count(&self) -> usize {
        self.rois
            .iter()
            .map(|slot| {
                slot.store
                    .reconciled()
                    .iter()
                    .filter(|detected| slot.roi.polygon.contains(detected.point))
                    .count()
            })
            .sum()
    }

    // --- Detection lifecycle ----------------------------------------------

    /// Start a detection run: validates the parameters, latches the busy
    /// flag and returns the job snapshot for the runner.
    pub fn begin_detection(&mut self) -> Result<DetectionJob, SessionError> {
        self.ensure_open()?;
        if self.in_flight.is_some() {
            return Err(SessionError::Busy);
        }
        self.params.validate()?;
        self.in_flight = Some(self.generation);
        Ok(DetectionJob {
            generation: self.generation,
            params: self.params.clone(),
        })
    }

    /// Deliver a finished run. Returns `false` when the result is stale
    /// (the tab was closed or structurally changed since the job started);
    /// stale results are discarded without touching any correction store.
    pub fn apply_detection(&mut self, job: &DetectionJob, points: Vec<Point>) -> bool {
        if self.in_flight == Some(job.generation) {
            self.in_flight = None;
        }
        if self.closed || job.generation != self.generation {
            log::debug!(
                "tab '{}': dropping stale detection result (job generation {}, tab generation {})",
                self.label,
                job.generation,
                self.generation
            );
            return false;
        }
        log::debug!(
            "tab '{}': applying {} detected points to {} ROI(s)",
            self.label,
            points.len(),
            self.rois.len()
        );
        for slot in &mut self.rois {
            slot.store.set_auto_baseline(points.clone());
        }
        true
    }

    /// Abandon the in-flight run; its result will be dropped on arrival.
    pub fn cancel_detection(&mut self) {
        if self.in_flight.is_some() {
            self.invalidate();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Close the tab. Allowed while a run is in flight; the late result is
    /// discarded instead of repopulating a closed tab.
    pub fn close(&mut self) {
        self.closed = true;
        self.invalidate();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.in_flight.is_some() {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    fn slot_mut(&mut self, id: RoiId) -> Result<&mut RoiSlot, SessionError> {
        self.rois
            .iter_mut()
            .find(|slot| slot.roi.id == id)
            .ok_or(SessionError::RoiNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, side: f64) -> Polygon {
        Polygon::from_vertices([
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ])
        .unwrap()
    }

    #[test]
    fn test_open_polygon_rejected_as_roi() {
        let mut session = Session::new("tab 1");
        let mut open = Polygon::new();
        open.add_vertex(Point::new(0.0, 0.0)).unwrap();
        assert_eq!(
            session.add_roi(open),
            Err(SessionError::Geometry(GeometryError::NotClosed))
        );
    }

    #[test]
    fn test_roi_points_filtered_by_containment() {
        let mut session = Session::new("tab 1");
        let roi = session.add_roi(square(0.0, 0.0, 10.0)).unwrap();

        let job = session.begin_detection().unwrap();
        assert!(session.apply_detection(&job, vec![Point::new(5.0, 5.0), Point::new(50.0, 50.0)]));

        assert_eq!(session.roi_count(roi).unwrap(), 1);
        assert_eq!(session.store(roi).unwrap().reconciled().len(), 2);
    }

    #[test]
    fn test_recontainment_without_new_edits() {
        let mut session = Session::new("tab 1");
        let roi = session.add_roi(square(0.0, 0.0, 10.0)).unwrap();

        let job = session.begin_detection().unwrap();
        session.apply_detection(&job, vec![Point::new(5.0, 5.0), Point::new(20.0, 20.0)]);
        assert_eq!(session.roi_count(roi).unwrap(), 1);

        // Enlarging the boundary re-partitions points; the edit log stays empty.
        session.set_roi_polygon(roi, square(0.0, 0.0, 30.0)).unwrap();
        assert_eq!(session.roi_count(roi).unwrap(), 2);
        assert!(session.store(roi).unwrap().edits().is_empty());
    }

    #[test]
    fn test_busy_rejects_mutations_until_result_arrives() {
        let mut session = Session::new("tab 1");
        let roi = session.add_roi(square(0.0, 0.0, 10.0)).unwrap();

        let job = session.begin_detection().unwrap();
        assert!(session.is_busy());
        assert_eq!(session.begin_detection().unwrap_err(), SessionError::Busy);
        assert_eq!(
            session.add_manual(roi, Point::new(1.0, 1.0)).unwrap_err(),
            SessionError::Busy
        );
        assert_eq!(
            session.add_roi(square(20.0, 20.0, 5.0)).unwrap_err(),
            SessionError::Busy
        );

        assert!(session.apply_detection(&job, vec![]));
        assert!(!session.is_busy());
        session.add_manual(roi, Point::new(1.0, 1.0)).unwrap();
    }

    #[test]
    fn test_parameter_change_invalidates_in_flight_run() {
        let mut session = Session::new("tab 1");
        let roi = session.add_roi(square(0.0, 0.0, 10.0)).unwrap();

        let job = session.begin_detection().unwrap();
        let params = DetectionParameters {
            min_area: 50.0,
            ..session.parameters().clone()
        };
        session.set_parameters(params).unwrap();

        assert!(!session.apply_detection(&job, vec![Point::new(5.0, 5.0)]));
        assert_eq!(session.roi_count(roi).unwrap(), 0);
    }

    #[test]
    fn test_invalid_parameters_block_detection() {
        let mut session = Session::new("tab 1");
        let bad = DetectionParameters {
            min_area: 10.0,
            max_area: 1.0,
            ..Default::default()
        };
        assert!(session.set_parameters(bad.clone()).is_err());

        // The old parameters stay in effect and detection still runs.
        session.begin_detection().unwrap();
    }

    #[test]
    fn test_close_discards_late_result() {
        let mut session = Session::new("tab 1");
        session.add_roi(square(0.0, 0.0, 10.0)).unwrap();

        let job = session.begin_detection().unwrap();
        session.close();

        assert!(!session.apply_detection(&job, vec![Point::new(5.0, 5.0)]));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_cancel_discards_late_result() {
        let mut session = Session::new("tab 1");
        let roi = session.add_roi(square(0.0, 0.0, 10.0)).unwrap();

        let job = session.begin_detection().unwrap();
        session.cancel_detection();
        assert!(!session.is_busy());

        assert!(!session.apply_detection(&job, vec![Point::new(5.0, 5.0)]));
        assert!(session.store(roi).unwrap().auto_baseline().is_empty());
    }

    #[test]
    fn test_chamber_and_region_selection() {
        let mut session = Session::new("tab 1");
        session.set_chamber_by_key("fuchs-rosenthal").unwrap();
        assert_eq!(session.chamber().kind, ChamberKind::FuchsRosenthal);
        // 1 mm^2 * 0.2 mm depth
        assert!((session.volume_per_square_ul() - 0.2).abs() < 1e-12);

        session.set_region("four-large").unwrap();
        assert_eq!(session.region().squares, 4);
        assert!(session.set_region("four-corners").is_err());
    }
}
