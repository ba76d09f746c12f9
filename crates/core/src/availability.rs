//! Availability derivation
//!
//! Building occupancy and unit status are never stored; they derive
//! strictly from the candidate records' assignments. The aerial-map
//! heatmap color is a pure function of the sold ratio.

use std::collections::HashMap;

use crate::models::{
    BuildingId, BuildingStats, CandidateRecord, UnitCell, UnitPosition, UnitStatus, FLOORS,
    UNITS_PER_BUILDING,
};

/// Marker color for a fully available building (mint)
const AVAILABLE_RGB: (u8, u8, u8) = (52, 211, 153);

/// Marker color for a sold-out building (slate)
const SOLD_RGB: (u8, u8, u8) = (148, 163, 184);

/// Per-building selected/remaining counts over the whole dataset.
///
/// Each selected candidate counts against the building of its assigned
/// unit, falling back to the denormalized building key when unit-level
/// detail is absent. Remaining is floored at zero.
pub fn building_stats(candidates: &[CandidateRecord]) -> HashMap<BuildingId, BuildingStats> {
    let mut selected: HashMap<BuildingId, u32> = HashMap::new();
    for candidate in candidates {
        if let Some(building) = candidate.selected_building() {
            *selected.entry(building).or_insert(0) += 1;
        }
    }

    selected
        .into_iter()
        .map(|(building, count)| {
            if count > UNITS_PER_BUILDING {
                tracing::error!(
                    building = %building,
                    selected = count,
                    capacity = UNITS_PER_BUILDING,
                    "building over capacity; assignment atomicity was violated"
                );
                debug_assert!(false, "building {building} over capacity: {count}");
            }
            (building, BuildingStats::from_selected(count))
        })
        .collect()
}

/// The 44-cell floor plan of one building, ordered floor 1..11, each
/// floor left to right (unit2-west, unit2-east, unit1-west, unit1-east).
///
/// A cell is Sold iff some selected candidate's assignment points at it.
pub fn unit_grid(building: BuildingId, candidates: &[CandidateRecord]) -> Vec<UnitCell> {
    let mut cells = Vec::with_capacity(UNITS_PER_BUILDING as usize);
    for floor in 1..=FLOORS {
        for position in UnitPosition::ALL {
            cells.push(UnitCell::new(floor, position));
        }
    }

    for candidate in candidates {
        if !candidate.has_selected() {
            continue;
        }
        let Some(unit) = &candidate.assigned_unit else {
            continue;
        };
        if unit.building_id() != building {
            continue;
        }
        if let Some(cell) = cells.iter_mut().find(|c| c.code == unit.room_code) {
            cell.status = UnitStatus::Sold;
        }
    }

    cells
}

/// Available cells of a building (for the selectable-sizes listing)
pub fn available_units(building: BuildingId, candidates: &[CandidateRecord]) -> Vec<UnitCell> {
    unit_grid(building, candidates)
        .into_iter()
        .filter(|c| c.status == UnitStatus::Available)
        .collect()
}

/// Heatmap color for the aerial map: linear interpolation from the
/// available color to the sold color as the sold ratio rises 0 -> 1.
pub fn heatmap_color(sold_ratio: f64) -> (u8, u8, u8) {
    let t = sold_ratio.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    (
        lerp(AVAILABLE_RGB.0, SOLD_RGB.0),
        lerp(AVAILABLE_RGB.1, SOLD_RGB.1),
        lerp(AVAILABLE_RGB.2, SOLD_RGB.2),
    )
}

/// Discrete marker banding used by the aerial-map pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerVariant {
    Plenty,
    Low,
    Sold,
}

/// Plenty means at least 35% of the building still available.
pub fn marker_variant(stats: BuildingStats) -> MarkerVariant {
    if stats.remaining == 0 {
        return MarkerVariant::Sold;
    }
    let total = stats.selected + stats.remaining;
    if f64::from(stats.remaining) / f64::from(total) >= 0.35 {
        MarkerVariant::Plenty
    } else {
        MarkerVariant::Low
    }
}
