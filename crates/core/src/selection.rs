//! The selection transaction: one candidate, one unit, one window
//!
//! Glues the session timer, the building registry and the atomic
//! assignment together. Everything here either commits fully or leaves
//! the dataset untouched.

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{BuildingId, Round, UnitCell, UnitRef};
use crate::storage::Database;
use crate::timer::SelectionTimer;

/// Receipt for a committed selection, ready for display and print
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentSummary {
    pub candidate_name: String,
    pub query_no: String,
    pub district: String,
    pub building_number: u32,
    pub unit_number: u32,
    pub room_code: String,
    pub floor: u32,
    pub size_sqm: u32,
}

/// Commit a candidate's choice of unit.
///
/// Refuses outright when the session window is not open; validates the
/// room code and the building's registration before touching storage.
/// The timer moves to Finished only after the assignment commits, so a
/// storage refusal leaves the window running for another attempt.
#[instrument(skip(db, timer), fields(room = %room_code))]
pub fn submit(
    db: &Database,
    timer: &mut SelectionTimer,
    candidate_id: Uuid,
    round: Round,
    building: BuildingId,
    room_code: &str,
) -> Result<AssignmentSummary> {
    if !timer.is_running() {
        return Err(Error::SessionLocked);
    }

    let cell = UnitCell::from_room_code(room_code)?;

    if !db.coords().contains(&building)? {
        return Err(Error::NotFound(format!("building {building}")));
    }

    let unit = UnitRef {
        district: building.district,
        building_number: building.number,
        unit_number: cell.position.unit_number(),
        room_code: cell.code.clone(),
    };

    let record = db.candidates().apply_assignment(candidate_id, round, &unit)?;
    timer.finish();

    tracing::info!(
        candidate = %record.query_no,
        building = %building,
        room = %cell.code,
        "selection committed"
    );

    Ok(AssignmentSummary {
        candidate_name: record.name,
        query_no: record.query_no,
        district: building.district.as_str().to_string(),
        building_number: building.number,
        unit_number: unit.unit_number,
        room_code: unit.room_code,
        floor: cell.floor,
        size_sqm: cell.size_sqm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuildingCoord, CandidateRecord, District, RoundStatus};
    use crate::timer::TimerPhase;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    fn setup() -> (Database, SelectionTimer) {
        let db = Database::open_in_memory().unwrap();
        db.coords()
            .replace_all(&[
                BuildingCoord {
                    id: "西区_3".into(),
                    label: "3号楼".into(),
                    zone: District::West,
                    top: "40%".into(),
                    left: "12%".into(),
                },
                BuildingCoord {
                    id: "东区_5".into(),
                    label: "5号楼".into(),
                    zone: District::East,
                    top: "55%".into(),
                    left: "70%".into(),
                },
            ])
            .unwrap();
        let mut timer = SelectionTimer::new();
        timer.start(Instant::now());
        (db, timer)
    }

    fn seed_candidate(db: &Database, no: &str) -> CandidateRecord {
        let c = CandidateRecord::new(
            no.into(),
            format!("测试{no}"),
            format!("id{no}"),
            format!("138{no}"),
        );
        db.candidates().create(&c).unwrap();
        c
    }

    #[test]
    fn test_submit_happy_path() {
        let (db, mut timer) = setup();
        let c = seed_candidate(&db, "0001");

        let summary = submit(
            &db,
            &mut timer,
            c.id,
            Round::First,
            BuildingId::new(District::West, 3),
            "0102",
        )
        .unwrap();

        assert_eq!(summary.query_no, "0001");
        assert_eq!(summary.district, "西区");
        assert_eq!(summary.floor, 1);
        assert_eq!(summary.size_sqm, 100);
        assert_eq!(timer.phase(), TimerPhase::Finished);

        let record = db.candidates().find_by_id(c.id).unwrap().unwrap();
        assert_eq!(record.first_round, RoundStatus::Selected);
    }

    #[test]
    fn test_submit_after_lock_mutates_nothing() {
        let (db, mut timer) = setup();
        let c = seed_candidate(&db, "0001");

        // Drive the window to expiry
        let epoch = timer.epoch();
        timer.tick(epoch, Instant::now() + std::time::Duration::from_millis(180_100));
        assert!(timer.is_locked());

        let err = submit(
            &db,
            &mut timer,
            c.id,
            Round::First,
            BuildingId::new(District::West, 3),
            "0102",
        )
        .unwrap_err();
        assert!(matches!(err, Error::SessionLocked));

        let record = db.candidates().find_by_id(c.id).unwrap().unwrap();
        assert_eq!(record.first_round, RoundStatus::Unselected);
        assert!(record.assigned_unit.is_none());
    }

    #[test]
    fn test_submit_unregistered_building() {
        let (db, mut timer) = setup();
        let c = seed_candidate(&db, "0001");

        let err = submit(
            &db,
            &mut timer,
            c.id,
            Round::First,
            BuildingId::new(District::West, 99),
            "0102",
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        // Refusal leaves the window open
        assert!(timer.is_running());
    }

    #[test]
    fn test_submit_bad_room_code() {
        let (db, mut timer) = setup();
        let c = seed_candidate(&db, "0001");
        let building = BuildingId::new(District::West, 3);

        // Floor 12 does not exist
        let err = submit(&db, &mut timer, c.id, Round::First, building, "1201").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Malformed code
        let err = submit(&db, &mut timer, c.id, Round::First, building, "1x02").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_concurrent_submits_one_winner() {
        let (db, _) = setup();
        let a = seed_candidate(&db, "0001");
        let b = seed_candidate(&db, "0002");
        let db = Arc::new(Mutex::new(db));

        let building = BuildingId::new(District::East, 5);
        let mut handles = Vec::new();
        for id in [a.id, b.id] {
            let db = Arc::clone(&db);
            handles.push(std::thread::spawn(move || {
                let mut timer = SelectionTimer::new();
                timer.start(Instant::now());
                let db = db.lock().unwrap();
                submit(&db, &mut timer, id, Round::First, building, "0104")
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        let loss = results.into_iter().find(|r| r.is_err()).unwrap().unwrap_err();
        assert!(matches!(loss, Error::UnitTaken(_)));
    }

    #[test]
    fn test_round_two_refuses_settled_candidate() {
        let (db, mut timer) = setup();
        let c = seed_candidate(&db, "0001");
        let building = BuildingId::new(District::West, 3);

        submit(&db, &mut timer, c.id, Round::First, building, "0102").unwrap();

        timer.reset();
        timer.start(Instant::now());
        let err = submit(&db, &mut timer, c.id, Round::Second, building, "0202").unwrap_err();
        assert!(matches!(err, Error::AlreadySelected(_)));
    }
}
