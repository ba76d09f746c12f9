//! Anju Core Library
//!
//! Core models, availability derivation, session timing and storage for
//! the Anju housing selection platform.

pub mod auth;
pub mod availability;
pub mod error;
pub mod invariants;
pub mod models;
pub mod query;
pub mod selection;
pub mod storage;
pub mod timer;

pub use availability::{
    available_units, building_stats, heatmap_color, marker_variant, unit_grid, MarkerVariant,
};
pub use error::{Error, Result};
pub use models::*;
pub use query::{QueryOutcome, SEARCH_LIMIT};
pub use selection::{submit, AssignmentSummary};
pub use storage::{
    AdminEdit, CandidateRepository, CoordRepository, Database, OperatorRepository,
    SelectionSummary, Storage,
};
pub use timer::{
    AlertKind, SelectionTimer, TimerEvent, TimerPhase, SELECTION_WINDOW_MS, TICK_INTERVAL_MS,
};
