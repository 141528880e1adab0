//! Result aggregation
//!
//! Reduces sessions into per-ROI concentration rows plus one combined row.
//! Combined figures sum counts and counted volumes before dividing; they
//! are never an average of per-ROI concentrations, which would be biased
//! whenever the counted volumes differ.

use serde::Serialize;

use crate::chamber::concentration_from_volume;
use crate::session::Session;

/// One line of the result table. Derived data, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub tab_label: String,
    /// ROI id as text, or "combined" for the summary row.
    pub roi_label: String,
    pub count: usize,
    pub concentration: f64,
    pub unit: &'static str,
    pub sample_volume_ml: f64,
}

impl ResultRow {
    /// Cells in the whole sample, meaningful when the unit is per-mL.
    pub fn total_cells_in_sample(&self) -> f64 {
        self.concentration * self.sample_volume_ml
    }
}

/// Per-ROI rows followed by the combined row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Aggregate any number of tabs. The combined row reports in the unit
    /// of the first session.
    pub fn from_sessions(sessions: &[&Session]) -> Self {
        let mut rows = Vec::new();
        let mut combined_weighted_count = 0.0;
        let mut combined_volume_ul = 0.0;
        let mut combined_count = 0usize;
        let mut combined_sample_volume_ml = 0.0;

        for session in sessions {
            let volume_ul = session.counting_volume_ul();
            for roi in session.rois() {
                // Own ROI ids cannot be missing
                let count = session.roi_count(roi.id).unwrap_or(0);
                let concentration = concentration_from_volume(
                    count,
                    session.dilution(),
                    volume_ul,
                    session.unit(),
                );
                rows.push(ResultRow {
                    tab_label: session.label().to_string(),
                    roi_label: format!("ROI {}", roi.id),
                    count,
                    concentration,
                    unit: session.unit().label,
                    sample_volume_ml: session.sample_volume_ml(),
                });
                combined_count += count;
                combined_weighted_count += count as f64 * session.dilution();
                combined_volume_ul += volume_ul;
            }
            combined_sample_volume_ml += session.sample_volume_ml();
        }

        let unit = sessions
            .first()
            .map(|session| session.unit())
            .unwrap_or(crate::chamber::ConcentrationUnit::CELLS_PER_ML);
        let combined_concentration = if combined_volume_ul > 0.0 {
            combined_weighted_count * unit.scale / combined_volume_ul
        } else {
            0.0
        };
        rows.push(ResultRow {
            tab_label: "all".to_string(),
            roi_label: "combined".to_string(),
            count: combined_count,
            concentration: combined_concentration,
            unit: unit.label,
            sample_volume_ml: combined_sample_volume_ml,
        });

        Self { rows }
    }

    /// The summary row.
    pub fn combined(&self) -> &ResultRow {
        // from_sessions always appends it
        self.rows.last().expect("result table has a combined row")
    }

    /// Per-ROI rows, excluding the combined row.
    pub fn roi_rows(&self) -> &[ResultRow] {
        &self.rows[..self.rows.len() - 1]
    }
}
