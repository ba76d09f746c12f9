//! Network gateway over the application state
//!
//! Implements the transport crate's `Gateway` trait, translating wire
//! requests into core operations and core errors into wire failures.

use std::sync::Arc;

use uuid::Uuid;

use anju_core::{
    auth, building_stats, BuildingCoord, BuildingId, BuildingStats, CandidateRecord, District,
    Round, TimerPhase, UNITS_PER_BUILDING,
};
use anju_net::gateway::{Gateway, GatewayError, GatewayResult, LoginInfo};
use anju_net::protocol::{
    AdminFields, AssignmentInfo, BuildingTally, CandidateInfo, CoordRecord, ErrorKind,
    InventoryUnit, SelectionRound, SessionInfo, SessionPhase, SummaryInfo, UnitInfo,
};

use crate::state::AppState;

pub struct HostGateway {
    state: Arc<AppState>,
}

impl HostGateway {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

fn map_error(e: anju_core::Error) -> GatewayError {
    use anju_core::Error as E;
    let kind = match &e {
        E::NotFound(_) => ErrorKind::NotFound,
        E::AlreadySelected(_) => ErrorKind::AlreadySelected,
        E::UnitTaken(_) => ErrorKind::UnitTaken,
        E::SessionLocked => ErrorKind::SessionLocked,
        E::Validation(_) => ErrorKind::Validation,
        E::Unauthorized(_) => ErrorKind::Unauthorized,
        _ => ErrorKind::Internal,
    };
    GatewayError::new(kind, e.to_string())
}

fn wire_round(round: SelectionRound) -> Round {
    match round {
        SelectionRound::First => Round::First,
        SelectionRound::Second => Round::Second,
    }
}

fn candidate_info(c: &CandidateRecord) -> CandidateInfo {
    CandidateInfo {
        id: c.id,
        query_no: c.query_no.clone(),
        name: c.name.clone(),
        id_number: c.id_number.clone(),
        phone: c.phone.clone(),
        village: c.village.clone(),
        town: c.town.clone(),
        selected: c.has_selected(),
        assigned_building: c.assigned_unit.as_ref().map(|u| u.building_id().key()),
        assigned_room: c.assigned_unit.as_ref().map(|u| u.room_code.clone()),
    }
}

fn parse_building(key: &str) -> GatewayResult<BuildingId> {
    BuildingId::parse(key).map_err(map_error)
}

impl Gateway for HostGateway {
    fn login(&self, username: &str, password: &str) -> GatewayResult<LoginInfo> {
        let db = self.state.db.lock().unwrap();
        let (operator, session) =
            auth::login(&db, username, password, self.state.session_hours).map_err(map_error)?;
        Ok(LoginInfo {
            token: session.token,
            display_name: operator.display_name,
        })
    }

    fn authorize(&self, token: &str) -> GatewayResult<()> {
        let db = self.state.db.lock().unwrap();
        auth::authorize(&db, token).map(|_| ()).map_err(map_error)
    }

    fn lookup_candidate(&self, round: SelectionRound, code: &str) -> GatewayResult<CandidateInfo> {
        let round = wire_round(round);
        let db = self.state.db.lock().unwrap();
        let candidate = db
            .candidates()
            .find_by_code(code)
            .map_err(map_error)?
            .ok_or_else(|| GatewayError::new(ErrorKind::NotFound, "no such candidate"))?;
        // Round-1 winners are invisible to round-2 stations
        if round == Round::Second && !candidate.second_round_eligible {
            return Err(GatewayError::new(ErrorKind::NotFound, "no such candidate"));
        }
        Ok(candidate_info(&candidate))
    }

    fn search_candidates(
        &self,
        round: SelectionRound,
        query: &str,
    ) -> GatewayResult<Vec<CandidateInfo>> {
        let db = self.state.db.lock().unwrap();
        let hits = db
            .candidates()
            .search(wire_round(round), query)
            .map_err(map_error)?;
        Ok(hits.iter().map(candidate_info).collect())
    }

    fn list_candidates(
        &self,
        round: SelectionRound,
        only_unselected: bool,
    ) -> GatewayResult<Vec<CandidateInfo>> {
        let round = wire_round(round);
        let db = self.state.db.lock().unwrap();
        let pool = if only_unselected {
            db.candidates().list_unselected(round)
        } else {
            db.candidates().list_for_round(round)
        }
        .map_err(map_error)?;
        Ok(pool.iter().map(candidate_info).collect())
    }

    fn update_candidate(&self, candidate_id: Uuid, fields: AdminFields) -> GatewayResult<()> {
        let edit = anju_core::AdminEdit {
            stay_no: fields.stay_no,
            archive_no: fields.archive_no,
            confirmer: fields.confirmer,
            checker: fields.checker,
        };
        let db = self.state.db.lock().unwrap();
        db.candidates()
            .update_administrative(candidate_id, &edit)
            .map_err(map_error)
    }

    fn delete_candidates(&self, ids: &[Uuid]) -> GatewayResult<u64> {
        let db = self.state.db.lock().unwrap();
        db.candidates().delete_many(ids).map_err(map_error)
    }

    fn available_inventory(&self) -> GatewayResult<Vec<InventoryUnit>> {
        let db = self.state.db.lock().unwrap();
        let buildings = db.coords().building_ids().map_err(map_error)?;
        let candidates = db.candidates().list_all().map_err(map_error)?;

        let mut units = Vec::new();
        for building in buildings {
            for cell in anju_core::available_units(building, &candidates) {
                units.push(InventoryUnit {
                    building: building.key(),
                    room_code: cell.code,
                    floor: cell.floor,
                    unit_number: cell.position.unit_number(),
                    size_sqm: cell.size_sqm,
                });
            }
        }
        Ok(units)
    }

    fn available_units(&self, building: &str) -> GatewayResult<Vec<UnitInfo>> {
        let building = parse_building(building)?;
        let db = self.state.db.lock().unwrap();
        if !db.coords().contains(&building).map_err(map_error)? {
            return Err(GatewayError::new(
                ErrorKind::NotFound,
                format!("building {building} is not registered"),
            ));
        }
        let candidates = db.candidates().list_all().map_err(map_error)?;
        let units = anju_core::unit_grid(building, &candidates)
            .into_iter()
            .map(|cell| UnitInfo {
                room_code: cell.code.clone(),
                floor: cell.floor,
                unit_number: cell.position.unit_number(),
                size_sqm: cell.size_sqm,
                available: cell.status == anju_core::UnitStatus::Available,
            })
            .collect();
        Ok(units)
    }

    fn building_stats(&self) -> GatewayResult<Vec<BuildingTally>> {
        let db = self.state.db.lock().unwrap();
        let buildings = db.coords().building_ids().map_err(map_error)?;
        let candidates = db.candidates().list_all().map_err(map_error)?;
        let stats = building_stats(&candidates);

        // Registered buildings with no selections still show a full tally
        let tallies = buildings
            .into_iter()
            .map(|building| {
                let s = stats
                    .get(&building)
                    .copied()
                    .unwrap_or_else(|| BuildingStats::from_selected(0));
                BuildingTally {
                    building: building.key(),
                    selected: s.selected,
                    remaining: s.remaining,
                }
            })
            .collect();
        Ok(tallies)
    }

    fn coords(&self) -> GatewayResult<Vec<CoordRecord>> {
        let db = self.state.db.lock().unwrap();
        let coords = db.coords().list().map_err(map_error)?;
        Ok(coords
            .into_iter()
            .map(|c| CoordRecord {
                id: c.id,
                label: c.label,
                zone: c.zone.as_str().to_string(),
                top: Some(c.top),
                left: Some(c.left),
            })
            .collect())
    }

    fn replace_coords(&self, coords: Vec<CoordRecord>) -> GatewayResult<()> {
        let parsed: Vec<BuildingCoord> = coords
            .into_iter()
            .map(|c| {
                Ok(BuildingCoord {
                    zone: District::parse(&c.zone).map_err(map_error)?,
                    id: c.id,
                    label: c.label,
                    top: c.top.unwrap_or_else(|| "0%".into()),
                    left: c.left.unwrap_or_else(|| "0%".into()),
                })
            })
            .collect::<GatewayResult<_>>()?;

        let db = self.state.db.lock().unwrap();
        db.coords().replace_all(&parsed).map_err(map_error)
    }

    fn begin_session(&self, candidate_id: Uuid, round: SelectionRound) -> GatewayResult<()> {
        self.state
            .begin_session(candidate_id, wire_round(round))
            .map_err(map_error)
    }

    fn reset_session(&self) -> GatewayResult<()> {
        self.state.reset_session().map_err(map_error)
    }

    fn session_status(&self) -> GatewayResult<SessionInfo> {
        // Lock order is active then timer, matching begin/reset.
        let candidate_id = self.state.active_session().map(|s| s.candidate_id);
        let timer = self.state.timer.lock().unwrap();
        let phase = match timer.phase() {
            TimerPhase::Idle => SessionPhase::Idle,
            TimerPhase::Running => SessionPhase::Running,
            TimerPhase::Finished => SessionPhase::Finished,
            TimerPhase::Locked => SessionPhase::Locked,
        };
        Ok(SessionInfo {
            phase,
            remaining_ms: timer.remaining_ms(),
            progress: timer.progress(),
            candidate_id,
        })
    }

    fn commit_selection(
        &self,
        candidate_id: Uuid,
        round: SelectionRound,
        building: &str,
        room_code: &str,
    ) -> GatewayResult<AssignmentInfo> {
        let building = parse_building(building)?;
        let summary = self
            .state
            .submit_selection(candidate_id, wire_round(round), building, room_code)
            .map_err(map_error)?;
        Ok(AssignmentInfo {
            candidate_name: summary.candidate_name,
            query_no: summary.query_no,
            district: summary.district,
            building_number: summary.building_number,
            unit_number: summary.unit_number,
            room_code: summary.room_code,
            floor: summary.floor,
            size_sqm: summary.size_sqm,
        })
    }

    fn stats(&self) -> GatewayResult<SummaryInfo> {
        let db = self.state.db.lock().unwrap();
        let buildings = db.coords().building_ids().map_err(map_error)?;
        let total_units = buildings.len() as u32 * UNITS_PER_BUILDING;
        let summary = db.candidates().summary(total_units).map_err(map_error)?;
        Ok(SummaryInfo {
            date: summary.date,
            today_selected: summary.today_selected,
            pending: summary.pending,
            total_selected: summary.total_selected,
            total_units: summary.total_units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anju_core::{CandidateRecord, OperatorRepository};

    fn seeded_gateway() -> (HostGateway, Uuid) {
        let state = Arc::new(AppState::in_memory(12).unwrap());
        let candidate = CandidateRecord::new(
            "0001".into(),
            "测试一".into(),
            "id0001".into(),
            "1380001".into(),
        );
        {
            let db = state.db.lock().unwrap();
            db.candidates().create(&candidate).unwrap();
            db.coords()
                .replace_all(&[BuildingCoord {
                    id: "西区_3".into(),
                    label: "3号楼".into(),
                    zone: District::West,
                    top: "40%".into(),
                    left: "12%".into(),
                }])
                .unwrap();
            let operator = anju_core::Operator::new(
                "admin".into(),
                auth::hash_password("pw").unwrap(),
                "管理员".into(),
            );
            db.create_operator(&operator).unwrap();
        }
        (HostGateway::new(state), candidate.id)
    }

    #[test]
    fn test_login_and_authorize() {
        let (gateway, _) = seeded_gateway();
        let info = gateway.login("admin", "pw").unwrap();
        gateway.authorize(&info.token).unwrap();
        assert_eq!(gateway.authorize("bogus").unwrap_err().kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn test_full_selection_flow() {
        let (gateway, candidate_id) = seeded_gateway();

        let found = gateway
            .lookup_candidate(SelectionRound::First, "0001")
            .unwrap();
        assert_eq!(found.id, candidate_id);

        gateway
            .begin_session(candidate_id, SelectionRound::First)
            .unwrap();
        let session = gateway.session_status().unwrap();
        assert_eq!(session.phase, SessionPhase::Running);

        let units = gateway.available_units("西区_3").unwrap();
        assert_eq!(units.len(), UNITS_PER_BUILDING as usize);
        assert!(units.iter().all(|u| u.available));

        let assignment = gateway
            .commit_selection(candidate_id, SelectionRound::First, "西区_3", "0102")
            .unwrap();
        assert_eq!(assignment.size_sqm, 100);

        // The grid and tallies reflect the commit
        let units = gateway.available_units("西区_3").unwrap();
        let sold: Vec<_> = units.iter().filter(|u| !u.available).collect();
        assert_eq!(sold.len(), 1);
        assert_eq!(sold[0].room_code, "0102");

        let tallies = gateway.building_stats().unwrap();
        assert_eq!(tallies[0].selected, 1);
        assert_eq!(tallies[0].remaining, UNITS_PER_BUILDING - 1);
    }

    #[test]
    fn test_status_polling_does_not_block_session_control() {
        let (gateway, candidate_id) = seeded_gateway();
        let gateway = Arc::new(gateway);

        let poller = {
            let gateway = Arc::clone(&gateway);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    gateway.session_status().unwrap();
                }
            })
        };
        let controller = {
            let gateway = Arc::clone(&gateway);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let _ = gateway.begin_session(candidate_id, SelectionRound::First);
                    gateway.reset_session().unwrap();
                }
            })
        };

        poller.join().unwrap();
        controller.join().unwrap();
    }

    #[test]
    fn test_commit_without_open_window_refused() {
        let (gateway, candidate_id) = seeded_gateway();
        let err = gateway
            .commit_selection(candidate_id, SelectionRound::First, "西区_3", "0102")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionLocked);
    }

    #[test]
    fn test_round_two_lookup_hides_winner() {
        let (gateway, candidate_id) = seeded_gateway();
        gateway
            .begin_session(candidate_id, SelectionRound::First)
            .unwrap();
        gateway
            .commit_selection(candidate_id, SelectionRound::First, "西区_3", "0102")
            .unwrap();

        let err = gateway
            .lookup_candidate(SelectionRound::Second, "0001")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_admin_edit_and_listing() {
        let (gateway, candidate_id) = seeded_gateway();

        gateway
            .update_candidate(
                candidate_id,
                AdminFields {
                    archive_no: Some("DA-2024-0001".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let pool = gateway
            .list_candidates(SelectionRound::First, true)
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert!(!pool[0].selected);

        assert_eq!(gateway.delete_candidates(&[candidate_id]).unwrap(), 1);
        assert!(gateway
            .list_candidates(SelectionRound::First, false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_inventory_shrinks_after_commit() {
        let (gateway, candidate_id) = seeded_gateway();
        let before = gateway.available_inventory().unwrap();
        assert_eq!(before.len(), UNITS_PER_BUILDING as usize);

        gateway
            .begin_session(candidate_id, SelectionRound::First)
            .unwrap();
        gateway
            .commit_selection(candidate_id, SelectionRound::First, "西区_3", "0102")
            .unwrap();

        let after = gateway.available_inventory().unwrap();
        assert_eq!(after.len(), UNITS_PER_BUILDING as usize - 1);
        assert!(after.iter().all(|u| u.room_code != "0102"));
    }

    #[test]
    fn test_coords_roundtrip_through_wire_types() {
        let (gateway, _) = seeded_gateway();
        gateway
            .replace_coords(vec![CoordRecord {
                id: "东区_5".into(),
                label: "5号楼".into(),
                zone: "东区".into(),
                top: Some("55%".into()),
                left: Some("70%".into()),
            }])
            .unwrap();

        let coords = gateway.coords().unwrap();
        assert_eq!(coords.len(), 1);
        assert_eq!(coords[0].zone, "东区");

        let stats = gateway.stats().unwrap();
        assert_eq!(stats.total_units, UNITS_PER_BUILDING);
    }
}
