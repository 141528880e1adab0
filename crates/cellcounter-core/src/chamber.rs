//! Chamber preset registry
//!
//! Static table of named counting-chamber geometries. Presets are immutable
//! process-wide data; lookups go through stable, language-independent keys
//! (display text is a presentation concern and never compared or persisted).
//!
//! Concentration is preset-parameterized rather than hard-coded: different
//! chamber families report in different units, so each preset carries the
//! scale converting cells per microliter into its documented convention.

use serde::{Deserialize, Serialize};

use crate::error::ChamberError;

/// Stable identifier of a chamber family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChamberKind {
    ImprovedNeubauer,
    Watson,
    FuchsRosenthal,
    BurkerTurk,
    Thoma,
    Custom,
}

impl ChamberKind {
    /// Persistence/lookup key. Never localized.
    pub fn as_key(self) -> &'static str {
        match self {
            ChamberKind::ImprovedNeubauer => "improved-neubauer",
            ChamberKind::Watson => "watson",
            ChamberKind::FuchsRosenthal => "fuchs-rosenthal",
            ChamberKind::BurkerTurk => "burker-turk",
            ChamberKind::Thoma => "thoma",
            ChamberKind::Custom => "custom",
        }
    }

    /// English display name; translation happens at render time only.
    pub fn display_name(self) -> &'static str {
        match self {
            ChamberKind::ImprovedNeubauer => "Improved Neubauer (Standard)",
            ChamberKind::Watson => "Watson (Disposable)",
            ChamberKind::FuchsRosenthal => "Fuchs-Rosenthal (CSF)",
            ChamberKind::BurkerTurk => "Burker-Turk",
            ChamberKind::Thoma => "Thoma",
            ChamberKind::Custom => "Custom",
        }
    }

    pub fn from_key(key: &str) -> Result<Self, ChamberError> {
        ALL_KINDS
            .iter()
            .copied()
            .find(|kind| kind.as_key() == key)
            .ok_or_else(|| ChamberError::UnknownPreset(key.to_string()))
    }

    pub fn preset(self) -> &'static ChamberPreset {
        match self {
            ChamberKind::ImprovedNeubauer => &IMPROVED_NEUBAUER,
            ChamberKind::Watson => &WATSON,
            ChamberKind::FuchsRosenthal => &FUCHS_ROSENTHAL,
            ChamberKind::BurkerTurk => &BURKER_TURK,
            ChamberKind::Thoma => &THOMA,
            ChamberKind::Custom => &CUSTOM,
        }
    }
}

const ALL_KINDS: [ChamberKind; 6] = [
    ChamberKind::ImprovedNeubauer,
    ChamberKind::Watson,
    ChamberKind::FuchsRosenthal,
    ChamberKind::BurkerTurk,
    ChamberKind::Thoma,
    ChamberKind::Custom,
];

/// Reporting unit of a concentration figure.
///
/// `scale` converts cells per microliter (= cells per mm^3) into this unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConcentrationUnit {
    pub label: &'static str,
    pub scale: f64,
}

impl ConcentrationUnit {
    pub const CELLS_PER_ML: Self = Self {
        label: "cells/mL",
        scale: 1000.0,
    };
    pub const CELLS_PER_UL: Self = Self {
        label: "cells/µL",
        scale: 1.0,
    };
}

/// One selectable counting layout within a chamber.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CountingRegion {
    /// Stable key, e.g. "four-corners".
    pub key: &'static str,
    /// English display label.
    pub label: &'static str,
    /// Number of squares the operator counts.
    pub squares: u32,
    /// Ruled area of one counted square in mm^2.
    pub square_area_mm2: f64,
}

impl CountingRegion {
    /// Volume over one counted square in microliters (mm^3).
    pub fn square_volume_ul(&self, depth_mm: f64) -> f64 {
        self.square_area_mm2 * depth_mm
    }
}

/// Geometry and reporting convention of one chamber family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChamberPreset {
    pub kind: ChamberKind,
    /// Default large-square ruled area in mm^2.
    pub square_area_mm2: f64,
    /// Chamber depth in mm.
    pub depth_mm: f64,
    pub default_dilution: f64,
    pub unit: ConcentrationUnit,
    pub regions: &'static [CountingRegion],
}

impl ChamberPreset {
    /// Look a preset up by its stable key.
    pub fn by_key(key: &str) -> Result<&'static ChamberPreset, ChamberError> {
        ChamberKind::from_key(key).map(ChamberKind::preset)
    }

    /// Look a counting region up by its stable key.
    pub fn region(&self, key: &str) -> Result<&'static CountingRegion, ChamberError> {
        self.regions
            .iter()
            .find(|region| region.key == key)
            .ok_or_else(|| ChamberError::UnknownRegion {
                chamber: self.kind.as_key().to_string(),
                region: key.to_string(),
            })
    }

    /// Concentration over one region, in this preset's reporting unit.
    pub fn concentration(&self, count: usize, dilution: f64, region: &CountingRegion) -> f64 {
        let volume_ul = region.square_volume_ul(self.depth_mm) * f64::from(region.squares);
        concentration_from_volume(count, dilution, volume_ul, self.unit)
    }
}

/// Shared formula: count over a counted volume, scaled to a reporting unit.
pub fn concentration_from_volume(
    count: usize,
    dilution: f64,
    volume_ul: f64,
    unit: ConcentrationUnit,
) -> f64 {
    if volume_ul <= 0.0 {
        return 0.0;
    }
    count as f64 * dilution * unit.scale / volume_ul
}

// Region tables follow the chamber layouts of the original counting
// protocols: standard 0.1 mm depth chambers count 1 mm^2 large squares or
// 0.04 mm^2 medium squares; Fuchs-Rosenthal is 0.2 mm deep.

const NEUBAUER_REGIONS: [CountingRegion; 4] = [
    CountingRegion {
        key: "four-corners",
        label: "4 Corners (Animal Cells)",
        squares: 4,
        square_area_mm2: 1.0,
    },
    CountingRegion {
        key: "one-center",
        label: "1 Center Square (Big)",
        squares: 1,
        square_area_mm2: 1.0,
    },
    CountingRegion {
        key: "five-medium",
        label: "5 Medium Squares (Small Cells)",
        squares: 5,
        square_area_mm2: 0.04,
    },
    CountingRegion {
        key: "full-plate",
        label: "Full Plate (25 Squares)",
        squares: 25,
        square_area_mm2: 1.0,
    },
];

const FUCHS_ROSENTHAL_REGIONS: [CountingRegion; 3] = [
    CountingRegion {
        key: "sixteen-large",
        label: "16 Large Squares (Total)",
        squares: 16,
        square_area_mm2: 1.0,
    },
    CountingRegion {
        key: "one-large",
        label: "1 Large Square",
        squares: 1,
        square_area_mm2: 1.0,
    },
    CountingRegion {
        key: "four-large",
        label: "4 Large Squares",
        squares: 4,
        square_area_mm2: 1.0,
    },
];

const THOMA_REGIONS: [CountingRegion; 2] = [
    CountingRegion {
        key: "center-square",
        label: "1 Center Square (25 Medium)",
        squares: 1,
        square_area_mm2: 1.0,
    },
    CountingRegion {
        key: "five-medium",
        label: "5 Medium Squares",
        squares: 5,
        square_area_mm2: 0.04,
    },
];

const CUSTOM_REGIONS: [CountingRegion; 1] = [CountingRegion {
    key: "custom",
    label: "Custom Configuration",
    squares: 1,
    square_area_mm2: 1.0,
}];

pub const IMPROVED_NEUBAUER: ChamberPreset = ChamberPreset {
    kind: ChamberKind::ImprovedNeubauer,
    square_area_mm2: 1.0,
    depth_mm: 0.1,
    default_dilution: 1.0,
    unit: ConcentrationUnit::CELLS_PER_ML,
    regions: &NEUBAUER_REGIONS,
};

pub const WATSON: ChamberPreset = ChamberPreset {
    kind: ChamberKind::Watson,
    square_area_mm2: 1.0,
    depth_mm: 0.1,
    default_dilution: 1.0,
    unit: ConcentrationUnit::CELLS_PER_ML,
    regions: &NEUBAUER_REGIONS,
};

pub const FUCHS_ROSENTHAL: ChamberPreset = ChamberPreset {
    kind: ChamberKind::FuchsRosenthal,
    square_area_mm2: 1.0,
    depth_mm: 0.2,
    default_dilution: 1.0,
    unit: ConcentrationUnit::CELLS_PER_ML,
    regions: &FUCHS_ROSENTHAL_REGIONS,
};

pub const BURKER_TURK: ChamberPreset = ChamberPreset {
    kind: ChamberKind::BurkerTurk,
    square_area_mm2: 1.0,
    depth_mm: 0.1,
    default_dilution: 1.0,
    unit: ConcentrationUnit::CELLS_PER_ML,
    regions: &NEUBAUER_REGIONS,
};

pub const THOMA: ChamberPreset = ChamberPreset {
    kind: ChamberKind::Thoma,
    square_area_mm2: 1.0,
    depth_mm: 0.1,
    default_dilution: 1.0,
    unit: ConcentrationUnit::CELLS_PER_ML,
    regions: &THOMA_REGIONS,
};

pub const CUSTOM: ChamberPreset = ChamberPreset {
    kind: ChamberKind::Custom,
    square_area_mm2: 1.0,
    depth_mm: 0.1,
    default_dilution: 1.0,
    unit: ConcentrationUnit::CELLS_PER_ML,
    regions: &CUSTOM_REGIONS,
};

/// All built-in presets, in menu order.
pub const PRESETS: [ChamberPreset; 6] = [
    IMPROVED_NEUBAUER,
    WATSON,
    FUCHS_ROSENTHAL,
    BURKER_TURK,
    THOMA,
    CUSTOM,
];
