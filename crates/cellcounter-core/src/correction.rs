//! Correction store: reconciling detections with manual edits
//!
//! One store per ROI. The automatic baseline and the ordered edit log are
//! the only state; the reconciled point set is always a pure replay of the
//! baseline plus edits up to the undo cursor, so repeated queries (e.g. for
//! preview rendering) can never accumulate drift.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geometry::Point;

/// Origin of a reconciled point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointSource {
    /// Produced by the detection capability.
    Auto,
    /// Added by the operator.
    Manual,
}

/// A point together with its origin tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectedPoint {
    pub point: Point,
    pub source: PointSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditOp {
    Add,
    Remove,
}

/// Append-only log entry. Replaying the log over the auto baseline yields
/// the current reconciled set; the log is the undo/redo source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edit {
    pub op: EditOp,
    pub point: Point,
    pub at: DateTime<Utc>,
}

/// Per-ROI merge of raw detections with manual add/remove corrections.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorrectionStore {
    auto_baseline: Vec<Point>,
    edits: Vec<Edit>,
    cursor: usize,
}

impl CorrectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the auto baseline after a (re-)detection run.
    ///
    /// Clears the edit log: a new detection run produces a materially
    /// different candidate set, and stale edits referencing old point
    /// positions would silently corrupt the reconciled set.
    pub fn set_auto_baseline(&mut self, points: Vec<Point>) {
        self.auto_baseline = points;
        self.edits.clear();
        self.cursor = 0;
    }

    pub fn auto_baseline(&self) -> &[Point] {
        &self.auto_baseline
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits[..self.cursor]
    }

    /// Record a manually added point.
    pub fn add_manual(&mut self, point: Point) {
        self.push_edit(EditOp::Add, point);
    }

    /// Remove the reconciled point closest to `point` within `tolerance`
    /// pixels. No-op (returns `None`) when nothing is close enough.
    pub fn remove_near(&mut self, point: Point, tolerance: f64) -> Option<Point> {
        let reconciled = self.reconciled();
        let index = nearest_index(&reconciled, point)?;
        let target = reconciled[index].point;
        if target.distance_to(point) > tolerance {
            return None;
        }
        self.push_edit(EditOp::Remove, target);
        Some(target)
    }

    /// Step the cursor one edit back. Returns whether anything was undone.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Step the cursor one edit forward. Returns whether anything was redone.
    pub fn redo(&mut self) -> bool {
        if self.cursor == self.edits.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.edits.len()
    }

    /// Current reconciled point set: the baseline tagged `Auto`, with edits
    /// up to the cursor replayed in order. Pure function of the store state.
    pub fn reconciled(&self) -> Vec<DetectedPoint> {
        debug_assert!(
            self.cursor <= self.edits.len(),
            "edit cursor {} outside log of {} entries",
            self.cursor,
            self.edits.len()
        );
        let mut points: Vec<DetectedPoint> = self
            .auto_baseline
            .iter()
            .map(|&point| DetectedPoint {
                point,
                source: PointSource::Auto,
            })
            .collect();
        for edit in &self.edits[..self.cursor] {
            match edit.op {
                EditOp::Add => points.push(DetectedPoint {
                    point: edit.point,
                    source: PointSource::Manual,
                }),
                EditOp::Remove => {
                    if let Some(index) = nearest_index(&points, edit.point) {
                        points.remove(index);
                    }
                }
            }
        }
        points
    }

    pub fn len(&self) -> usize {
        self.reconciled().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Any new edit after an undo discards the redo branch (linear history).
    fn push_edit(&mut self, op: EditOp, point: Point) {
        self.edits.truncate(self.cursor);
        self.edits.push(Edit {
            op,
            point,
            at: Utc::now(),
        });
        self.cursor = self.edits.len();
    }
}

/// Index of the point nearest to `target`, ties broken by lowest index so
/// that replay stays deterministic.
fn nearest_index(points: &[DetectedPoint], target: Point) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .min_by(|(i, a), (j, b)| {
            a.point
                .distance_to(target)
                .total_cmp(&b.point.distance_to(target))
                .then(i.cmp(j))
        })
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn points_of(store: &CorrectionStore) -> Vec<Point> {
        store.reconciled().iter().map(|d| d.point).collect()
    }

    #[test]
    fn test_reconciled_is_idempotent() {
        let mut store = CorrectionStore::new();
        store.set_auto_baseline(vec![p(1.0, 1.0), p(5.0, 5.0)]);
        store.add_manual(p(3.0, 3.0));
        assert_eq!(store.reconciled(), store.reconciled());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut store = CorrectionStore::new();
        store.set_auto_baseline(vec![p(1.0, 1.0)]);
        store.add_manual(p(2.0, 2.0));
        let with_edit = store.reconciled();

        assert!(store.undo());
        assert_eq!(store.len(), 1);
        assert!(store.redo());
        assert_eq!(store.reconciled(), with_edit);

        // No-ops at both boundaries
        assert!(!store.redo());
        assert!(store.undo());
        assert!(!store.undo());
    }

    #[test]
    fn test_remove_near_then_undo_restores_exactly() {
        let mut store = CorrectionStore::new();
        store.set_auto_baseline(vec![p(10.0, 10.0), p(50.0, 50.0)]);

        let removed = store.remove_near(p(11.0, 11.0), 5.0);
        assert_eq!(removed, Some(p(10.0, 10.0)));
        assert_eq!(points_of(&store), vec![p(50.0, 50.0)]);

        assert!(store.undo());
        let restored = store.reconciled();
        assert_eq!(restored[0].point, p(10.0, 10.0));
        assert_eq!(restored[0].source, PointSource::Auto);
    }

    #[test]
    fn test_remove_near_outside_tolerance_is_noop() {
        let mut store = CorrectionStore::new();
        store.set_auto_baseline(vec![p(10.0, 10.0)]);
        assert_eq!(store.remove_near(p(100.0, 100.0), 5.0), None);
        assert_eq!(store.len(), 1);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_remove_targets_manual_points_too() {
        let mut store = CorrectionStore::new();
        store.add_manual(p(7.0, 7.0));
        let removed = store.remove_near(p(7.5, 7.0), 2.0);
        assert_eq!(removed, Some(p(7.0, 7.0)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_new_edit_truncates_redo_branch() {
        let mut store = CorrectionStore::new();
        store.add_manual(p(1.0, 1.0));
        store.add_manual(p(2.0, 2.0));
        store.undo();
        store.add_manual(p(9.0, 9.0));

        assert!(!store.can_redo());
        assert_eq!(points_of(&store), vec![p(1.0, 1.0), p(9.0, 9.0)]);
    }

    #[test]
    fn test_set_auto_baseline_clears_edits() {
        let mut store = CorrectionStore::new();
        store.add_manual(p(3.0, 3.0));
        store.set_auto_baseline(vec![p(8.0, 8.0)]);

        let reconciled = store.reconciled();
        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].point, p(8.0, 8.0));
        assert_eq!(reconciled[0].source, PointSource::Auto);
        assert!(!store.can_undo() && !store.can_redo());
    }

    #[test]
    fn test_replay_remove_picks_nearest_deterministically() {
        let mut store = CorrectionStore::new();
        store.set_auto_baseline(vec![p(0.0, 0.0), p(4.0, 0.0)]);
        // Equidistant from both baseline points: lowest index wins.
        store.remove_near(p(2.0, 0.0), 3.0);
        assert_eq!(points_of(&store), vec![p(4.0, 0.0)]);
    }
}
