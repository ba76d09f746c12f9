//! Network protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire.
//! The protocol is request/response: a collaborator sends a request,
//! the selection host answers with exactly one reply. Every request
//! except `Login` and `Ping` carries a bearer token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Selection round transmitted over the wire (mirrors the core Round
/// but decoupled from it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRound {
    First,
    Second,
}

/// Session timer phase as reported to collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Running,
    Finished,
    Locked,
}

/// Machine-readable failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadySelected,
    UnitTaken,
    SessionLocked,
    Validation,
    Unauthorized,
    Internal,
}

/// A candidate as shown to collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub id: Uuid,
    pub query_no: String,
    pub name: String,
    pub id_number: String,
    pub phone: String,
    pub village: String,
    pub town: String,
    pub selected: bool,
    pub assigned_building: Option<String>,
    pub assigned_room: Option<String>,
}

/// One unit in a building's availability grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitInfo {
    pub room_code: String,
    pub floor: u32,
    pub unit_number: u32,
    pub size_sqm: u32,
    pub available: bool,
}

/// An available unit across the whole site, keyed by its building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryUnit {
    pub building: String,
    pub room_code: String,
    pub floor: u32,
    pub unit_number: u32,
    pub size_sqm: u32,
}

/// Administrative columns of a candidate record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminFields {
    pub stay_no: Option<String>,
    pub archive_no: Option<String>,
    pub confirmer: Option<String>,
    pub checker: Option<String>,
}

/// Per-building occupancy for the map overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingTally {
    pub building: String,
    pub selected: u32,
    pub remaining: u32,
}

/// A building marker position uploaded by the annotation tool.
///
/// `top` and `left` arrive as raw numbers or percentage strings, or
/// not at all; [`CoordRecord::normalized`] settles them into the
/// stored "%" form, with "0%" for missing offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordRecord {
    pub id: String,
    pub label: String,
    pub zone: String,
    #[serde(default)]
    pub top: Option<String>,
    #[serde(default)]
    pub left: Option<String>,
}

impl CoordRecord {
    /// Validate required fields and normalize offsets to "%" strings
    pub fn normalized(mut self) -> Result<Self, String> {
        if self.id.trim().is_empty() || self.label.trim().is_empty() || self.zone.trim().is_empty()
        {
            return Err(format!("coordinate entry missing id/label/zone: {:?}", self.id));
        }
        self.top = Some(normalize_field(&self.top).ok_or_else(|| {
            format!("bad top offset for {}: {:?}", self.id, self.top)
        })?);
        self.left = Some(normalize_field(&self.left).ok_or_else(|| {
            format!("bad left offset for {}: {:?}", self.id, self.left)
        })?);
        Ok(self)
    }
}

fn normalize_field(raw: &Option<String>) -> Option<String> {
    match raw {
        Some(value) => normalize_offset(value),
        None => Some("0%".to_string()),
    }
}

fn normalize_offset(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Some(number) = raw.strip_suffix('%') {
        number.trim().parse::<f64>().ok()?;
        return Some(raw.to_string());
    }
    raw.parse::<f64>().ok().map(|v| format!("{v}%"))
}

/// Receipt for a committed selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentInfo {
    pub candidate_name: String,
    pub query_no: String,
    pub district: String,
    pub building_number: u32,
    pub unit_number: u32,
    pub room_code: String,
    pub floor: u32,
    pub size_sqm: u32,
}

/// Live session timer state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub phase: SessionPhase,
    pub remaining_ms: u64,
    pub progress: f64,
    pub candidate_id: Option<Uuid>,
}

/// Dashboard counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryInfo {
    pub date: String,
    pub today_selected: u32,
    pub pending: u32,
    pub total_selected: u32,
    pub total_units: u32,
}

/// Network protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Operator login with username and password
    Login { username: String, password: String },

    /// Login succeeded; `token` authorizes subsequent requests
    LoginOk { token: String, display_name: String },

    /// Exact candidate lookup by order number, ID number or phone
    LookupCandidate {
        token: String,
        round: SelectionRound,
        code: String,
    },

    /// One candidate resolved
    CandidateFound { candidate: Box<CandidateInfo> },

    /// Fuzzy candidate search within the round's pool
    SearchCandidates {
        token: String,
        round: SelectionRound,
        query: String,
    },

    /// Search results, capped server-side
    CandidateList { candidates: Vec<CandidateInfo> },

    /// Round pool listing, optionally only the still-unselected
    ListCandidates {
        token: String,
        round: SelectionRound,
        only_unselected: bool,
    },

    /// Back-office edit of a candidate's administrative columns
    UpdateCandidate {
        token: String,
        candidate_id: Uuid,
        fields: AdminFields,
    },

    /// Bulk delete by explicit id list
    DeleteCandidates { token: String, ids: Vec<Uuid> },

    /// How many records a bulk delete removed
    Deleted { count: u64 },

    /// Every available unit across all registered buildings
    AvailableInventory { token: String },

    /// Site-wide availability
    InventoryList { units: Vec<InventoryUnit> },

    /// Availability grid for one building, e.g. "西区_3"
    AvailableUnits { token: String, building: String },

    /// The building's 44-cell grid in floor-plan order
    UnitList { building: String, units: Vec<UnitInfo> },

    /// Per-building occupancy for every registered building
    BuildingStats { token: String },

    /// Occupancy tallies
    BuildingStatsList { tallies: Vec<BuildingTally> },

    /// Fetch the building marker registry
    GetBuildingCoords { token: String },

    /// The registry in display order
    BuildingCoords { coords: Vec<CoordRecord> },

    /// Replace the marker registry wholesale
    PutBuildingCoords {
        token: String,
        coords: Vec<CoordRecord>,
    },

    /// Open a 3-minute selection window for a candidate
    BeginSession {
        token: String,
        candidate_id: Uuid,
        round: SelectionRound,
    },

    /// Abort the current window and return the timer to idle
    ResetSession { token: String },

    /// Query the live timer state
    SessionStatus { token: String },

    /// Live timer state
    SessionState { session: SessionInfo },

    /// Commit a candidate's unit choice
    CommitSelection {
        token: String,
        candidate_id: Uuid,
        round: SelectionRound,
        building: String,
        room_code: String,
    },

    /// The selection went through
    SelectionCommitted { assignment: Box<AssignmentInfo> },

    /// Dashboard counters request
    Stats { token: String },

    /// Dashboard counters
    StatsInfo { summary: SummaryInfo },

    /// Generic success for requests with no payload to return
    Ack,

    /// Request failed
    Failure { kind: ErrorKind, message: String },

    /// Ping to keep connection alive
    Ping,

    /// Pong response to ping
    Pong,
}

impl Message {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// The bearer token carried by a request, if it carries one
    pub fn token(&self) -> Option<&str> {
        match self {
            Message::LookupCandidate { token, .. }
            | Message::SearchCandidates { token, .. }
            | Message::AvailableUnits { token, .. }
            | Message::BuildingStats { token }
            | Message::GetBuildingCoords { token }
            | Message::PutBuildingCoords { token, .. }
            | Message::ListCandidates { token, .. }
            | Message::UpdateCandidate { token, .. }
            | Message::DeleteCandidates { token, .. }
            | Message::AvailableInventory { token }
            | Message::BeginSession { token, .. }
            | Message::ResetSession { token }
            | Message::SessionStatus { token }
            | Message::CommitSelection { token, .. }
            | Message::Stats { token } => Some(token),
            _ => None,
        }
    }
}
