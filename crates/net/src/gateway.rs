//! Host-side application seam
//!
//! The server is transport only; everything domain-shaped goes through
//! this trait. The hosting application implements it over its own
//! storage, which keeps this crate free of any storage dependency.

use uuid::Uuid;

use crate::protocol::{
    AdminFields, AssignmentInfo, BuildingTally, CandidateInfo, CoordRecord, ErrorKind,
    InventoryUnit, SelectionRound, SessionInfo, SummaryInfo, UnitInfo,
};

/// Domain failure surfaced to the wire as a `Failure` message
#[derive(Debug, Clone)]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Successful login payload
#[derive(Debug, Clone)]
pub struct LoginInfo {
    pub token: String,
    pub display_name: String,
}

/// Operations the selection host exposes to collaborators
pub trait Gateway: Send + Sync + 'static {
    /// Authenticate an operator, minting a bearer token
    fn login(&self, username: &str, password: &str) -> GatewayResult<LoginInfo>;

    /// Check a bearer token before serving a request
    fn authorize(&self, token: &str) -> GatewayResult<()>;

    /// Exact candidate lookup within a round's pool
    fn lookup_candidate(&self, round: SelectionRound, code: &str) -> GatewayResult<CandidateInfo>;

    /// Fuzzy candidate search within a round's pool, capped
    fn search_candidates(
        &self,
        round: SelectionRound,
        query: &str,
    ) -> GatewayResult<Vec<CandidateInfo>>;

    /// Round pool listing, optionally narrowed to the still-unselected
    fn list_candidates(
        &self,
        round: SelectionRound,
        only_unselected: bool,
    ) -> GatewayResult<Vec<CandidateInfo>>;

    /// Back-office edit of a candidate's administrative columns
    fn update_candidate(&self, candidate_id: Uuid, fields: AdminFields) -> GatewayResult<()>;

    /// Bulk delete by explicit id list; returns the number removed
    fn delete_candidates(&self, ids: &[Uuid]) -> GatewayResult<u64>;

    /// Full availability grid for one building
    fn available_units(&self, building: &str) -> GatewayResult<Vec<UnitInfo>>;

    /// Every available unit across all registered buildings
    fn available_inventory(&self) -> GatewayResult<Vec<InventoryUnit>>;

    /// Occupancy tallies for every registered building
    fn building_stats(&self) -> GatewayResult<Vec<BuildingTally>>;

    /// The building marker registry
    fn coords(&self) -> GatewayResult<Vec<CoordRecord>>;

    /// Replace the marker registry; the batch arrives pre-normalized
    fn replace_coords(&self, coords: Vec<CoordRecord>) -> GatewayResult<()>;

    /// Open a selection window for a candidate
    fn begin_session(&self, candidate_id: Uuid, round: SelectionRound) -> GatewayResult<()>;

    /// Abort the current window
    fn reset_session(&self) -> GatewayResult<()>;

    /// Live timer state
    fn session_status(&self) -> GatewayResult<SessionInfo>;

    /// Commit a candidate's unit choice
    fn commit_selection(
        &self,
        candidate_id: Uuid,
        round: SelectionRound,
        building: &str,
        room_code: &str,
    ) -> GatewayResult<AssignmentInfo>;

    /// Dashboard counters
    fn stats(&self) -> GatewayResult<SummaryInfo>;
}
