//! Candidate (displaced household) model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::building::{BuildingId, District};

/// Selection round. Round two is open only to candidates who did not
/// select in round one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Round {
    First,
    Second,
}

impl Round {
    pub fn label(self) -> &'static str {
        match self {
            Round::First => "round 1",
            Round::Second => "round 2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    Unselected,
    Selected,
}

impl RoundStatus {
    pub fn is_selected(self) -> bool {
        matches!(self, RoundStatus::Selected)
    }
}

/// The unit a candidate has been assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRef {
    pub district: District,
    pub building_number: u32,
    pub unit_number: u32,
    pub room_code: String,
}

impl UnitRef {
    pub fn building_id(&self) -> BuildingId {
        BuildingId::new(self.district, self.building_number)
    }
}

/// One displaced-household entry in the selection dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: Uuid,
    /// Public order number, unique, e.g. "0001"
    pub query_no: String,
    pub name: String,
    pub id_number: String,
    pub phone: String,
    pub village: String,
    pub town: String,
    pub select_date: Option<NaiveDate>,
    pub first_round: RoundStatus,
    pub second_round: RoundStatus,
    /// Only candidates who did not select in round 1 may act in round 2
    pub second_round_eligible: bool,
    pub assigned_unit: Option<UnitRef>,
    /// Denormalized building key ("西区_3"); availability derivation
    /// falls back to it when unit-level detail is absent
    pub building_key: Option<String>,
    // Administrative fields, mutable only via back-office edit
    pub stay_no: Option<String>,
    pub archive_no: Option<String>,
    pub confirmer: Option<String>,
    pub checker: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// New record in the pre-selection state
    pub fn new(query_no: String, name: String, id_number: String, phone: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            query_no,
            name,
            id_number,
            phone,
            village: String::new(),
            town: String::new(),
            select_date: None,
            first_round: RoundStatus::Unselected,
            second_round: RoundStatus::Unselected,
            second_round_eligible: true,
            assigned_unit: None,
            building_key: None,
            stay_no: None,
            archive_no: None,
            confirmer: None,
            checker: None,
            created_at: Utc::now(),
        }
    }

    pub fn status_for(&self, round: Round) -> RoundStatus {
        match round {
            Round::First => self.first_round,
            Round::Second => self.second_round,
        }
    }

    /// Whether the candidate has selected in either round
    pub fn has_selected(&self) -> bool {
        self.first_round.is_selected() || self.second_round.is_selected()
    }

    /// Building the candidate's selection counts against, preferring the
    /// explicit unit reference over the denormalized key
    pub fn selected_building(&self) -> Option<BuildingId> {
        if !self.has_selected() {
            return None;
        }
        if let Some(unit) = &self.assigned_unit {
            return Some(unit.building_id());
        }
        self.building_key
            .as_deref()
            .and_then(|key| BuildingId::parse(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_candidate_unselected() {
        let c = CandidateRecord::new(
            "0001".into(),
            "张三".into(),
            "110101199001011234".into(),
            "13800138001".into(),
        );
        assert_eq!(c.first_round, RoundStatus::Unselected);
        assert!(c.second_round_eligible);
        assert!(!c.has_selected());
        assert!(c.selected_building().is_none());
    }

    #[test]
    fn test_selected_building_prefers_unit_ref() {
        let mut c = CandidateRecord::new("0002".into(), "李四".into(), "x".into(), "y".into());
        c.first_round = RoundStatus::Selected;
        c.building_key = Some("东区_9".into());
        c.assigned_unit = Some(UnitRef {
            district: District::West,
            building_number: 3,
            unit_number: 2,
            room_code: "0102".into(),
        });
        assert_eq!(
            c.selected_building().unwrap(),
            BuildingId::new(District::West, 3)
        );
    }

    #[test]
    fn test_selected_building_falls_back_to_key() {
        let mut c = CandidateRecord::new("0003".into(), "王五".into(), "x".into(), "y".into());
        c.second_round = RoundStatus::Selected;
        c.building_key = Some("东区_9".into());
        assert_eq!(
            c.selected_building().unwrap(),
            BuildingId::new(District::East, 9)
        );
    }
}
