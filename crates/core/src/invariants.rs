//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::{CandidateRecord, Round, UNITS_PER_BUILDING};

/// Validate that a candidate record is internally consistent
pub fn assert_candidate_invariants(candidate: &CandidateRecord) {
    // A selection in either round carries an assigned unit
    debug_assert!(
        !(candidate.has_selected() && candidate.assigned_unit.is_none()),
        "candidate {} selected but carries no unit",
        candidate.query_no
    );

    // Round-1 winners never remain in the round-2 pool
    debug_assert!(
        !(candidate.status_for(Round::First).is_selected() && candidate.second_round_eligible),
        "candidate {} won round 1 but is still round-2 eligible",
        candidate.query_no
    );

    // Order number is the public handle and must exist
    debug_assert!(
        !candidate.query_no.trim().is_empty(),
        "candidate {} has empty order number",
        candidate.id
    );
}

/// Validate that no two candidates hold the same unit
pub fn assert_unique_assignments(candidates: &[CandidateRecord]) {
    let mut seen = HashSet::new();
    for candidate in candidates {
        if let Some(unit) = &candidate.assigned_unit {
            let key = (unit.district, unit.building_number, unit.room_code.clone());
            debug_assert!(
                seen.insert(key),
                "unit {}_{} {} assigned twice",
                unit.district.as_str(),
                unit.building_number,
                unit.room_code
            );
        }
    }
}

/// Validate that no building holds more assignments than it has units
pub fn assert_building_capacity(candidates: &[CandidateRecord]) {
    use std::collections::HashMap;
    let mut counts: HashMap<_, u32> = HashMap::new();
    for candidate in candidates {
        if let Some(unit) = &candidate.assigned_unit {
            *counts.entry(unit.building_id()).or_default() += 1;
        }
    }
    for (building, count) in counts {
        debug_assert!(
            count <= UNITS_PER_BUILDING,
            "building {building} holds {count} assignments, capacity {UNITS_PER_BUILDING}"
        );
    }
}
