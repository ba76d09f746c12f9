//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, mock, future network backend).

use uuid::Uuid;

use super::candidates::{AdminEdit, SelectionSummary};
use super::Database;
use crate::error::Result;
use crate::models::{BuildingCoord, BuildingId, CandidateRecord, Operator, OperatorSession, Round, UnitRef};

/// Candidate repository operations
pub trait CandidateRepository {
    /// Insert a candidate record
    fn create_candidate(&self, candidate: &CandidateRecord) -> Result<()>;

    /// Find candidate by internal ID
    fn find_candidate_by_id(&self, id: Uuid) -> Result<Option<CandidateRecord>>;

    /// Exact lookup by order number, ID number or phone
    fn find_candidate_by_code(&self, code: &str) -> Result<Option<CandidateRecord>>;

    /// Round pool listing
    fn list_candidates_for_round(&self, round: Round) -> Result<Vec<CandidateRecord>>;

    /// Round pool members without a selection yet
    fn list_unselected_candidates(&self, round: Round) -> Result<Vec<CandidateRecord>>;

    /// Every record, regardless of round
    fn list_all_candidates(&self) -> Result<Vec<CandidateRecord>>;

    /// Fuzzy search within the round's pool, capped
    fn search_candidates(&self, round: Round, query: &str) -> Result<Vec<CandidateRecord>>;

    /// Atomic unit assignment
    fn apply_assignment(
        &self,
        candidate_id: Uuid,
        round: Round,
        unit: &UnitRef,
    ) -> Result<CandidateRecord>;

    /// Back-office edit of administrative columns
    fn update_administrative(&self, id: Uuid, edit: &AdminEdit) -> Result<()>;

    /// Bulk delete by id list
    fn delete_candidates(&self, ids: &[Uuid]) -> Result<u64>;

    /// Dashboard counters
    fn selection_summary(&self, total_units: u32) -> Result<SelectionSummary>;
}

/// Building coordinate repository operations
pub trait CoordRepository {
    /// All registered markers in display order
    fn list_coords(&self) -> Result<Vec<BuildingCoord>>;

    /// Replace the registry wholesale
    fn replace_coords(&self, coords: &[BuildingCoord]) -> Result<()>;

    /// Whether a building is registered
    fn building_registered(&self, building: &BuildingId) -> Result<bool>;

    /// Registered buildings as parsed ids
    fn registered_buildings(&self) -> Result<Vec<BuildingId>>;
}

/// Operator repository operations
pub trait OperatorRepository {
    /// Create an operator account
    fn create_operator(&self, operator: &Operator) -> Result<()>;

    /// Find operator by username
    fn find_operator_by_username(&self, username: &str) -> Result<Option<Operator>>;

    /// Find operator by ID
    fn find_operator_by_id(&self, id: Uuid) -> Result<Option<Operator>>;

    /// Update operator's last login time
    fn update_last_login(&self, operator_id: Uuid) -> Result<()>;

    /// Create a bearer-token session
    fn create_session(&self, session: &OperatorSession) -> Result<()>;

    /// Find a valid (non-expired) session by token
    fn find_valid_session(&self, token: &str) -> Result<Option<OperatorSession>>;

    /// Delete a session
    fn delete_session(&self, token: &str) -> Result<()>;

    /// Clean up expired sessions
    fn cleanup_expired_sessions(&self) -> Result<u64>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
/// Implementations may be backed by SQLite, mocks, or network.
pub trait Storage: CandidateRepository + CoordRepository + OperatorRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: CandidateRepository + CoordRepository + OperatorRepository {}

impl CandidateRepository for Database {
    fn create_candidate(&self, candidate: &CandidateRecord) -> Result<()> {
        self.candidates().create(candidate)
    }

    fn find_candidate_by_id(&self, id: Uuid) -> Result<Option<CandidateRecord>> {
        self.candidates().find_by_id(id)
    }

    fn find_candidate_by_code(&self, code: &str) -> Result<Option<CandidateRecord>> {
        self.candidates().find_by_code(code)
    }

    fn list_candidates_for_round(&self, round: Round) -> Result<Vec<CandidateRecord>> {
        self.candidates().list_for_round(round)
    }

    fn list_unselected_candidates(&self, round: Round) -> Result<Vec<CandidateRecord>> {
        self.candidates().list_unselected(round)
    }

    fn list_all_candidates(&self) -> Result<Vec<CandidateRecord>> {
        self.candidates().list_all()
    }

    fn search_candidates(&self, round: Round, query: &str) -> Result<Vec<CandidateRecord>> {
        self.candidates().search(round, query)
    }

    fn apply_assignment(
        &self,
        candidate_id: Uuid,
        round: Round,
        unit: &UnitRef,
    ) -> Result<CandidateRecord> {
        self.candidates().apply_assignment(candidate_id, round, unit)
    }

    fn update_administrative(&self, id: Uuid, edit: &AdminEdit) -> Result<()> {
        self.candidates().update_administrative(id, edit)
    }

    fn delete_candidates(&self, ids: &[Uuid]) -> Result<u64> {
        self.candidates().delete_many(ids)
    }

    fn selection_summary(&self, total_units: u32) -> Result<SelectionSummary> {
        self.candidates().summary(total_units)
    }
}

impl CoordRepository for Database {
    fn list_coords(&self) -> Result<Vec<BuildingCoord>> {
        self.coords().list()
    }

    fn replace_coords(&self, coords: &[BuildingCoord]) -> Result<()> {
        self.coords().replace_all(coords)
    }

    fn building_registered(&self, building: &BuildingId) -> Result<bool> {
        self.coords().contains(building)
    }

    fn registered_buildings(&self) -> Result<Vec<BuildingId>> {
        self.coords().building_ids()
    }
}

impl OperatorRepository for Database {
    fn create_operator(&self, operator: &Operator) -> Result<()> {
        self.operators().create(operator)
    }

    fn find_operator_by_username(&self, username: &str) -> Result<Option<Operator>> {
        self.operators().find_by_username(username)
    }

    fn find_operator_by_id(&self, id: Uuid) -> Result<Option<Operator>> {
        self.operators().find_by_id(id)
    }

    fn update_last_login(&self, operator_id: Uuid) -> Result<()> {
        self.operators().update_last_login(operator_id)
    }

    fn create_session(&self, session: &OperatorSession) -> Result<()> {
        self.operators().create_session(session)
    }

    fn find_valid_session(&self, token: &str) -> Result<Option<OperatorSession>> {
        self.operators().find_valid_session(token)
    }

    fn delete_session(&self, token: &str) -> Result<()> {
        self.operators().delete_session(token)
    }

    fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.operators().cleanup_expired_sessions()
    }
}
