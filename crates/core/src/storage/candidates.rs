//! Candidate dataset storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    parse_date_opt, parse_datetime, parse_district, parse_uuid, round_status_from_i32, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{CandidateRecord, Round, RoundStatus, UnitRef, UNITS_PER_BUILDING};
use crate::query::SEARCH_LIMIT;

const CANDIDATE_COLUMNS: &str = "id, query_no, name, id_number, phone, village, town, \
     select_date, first_round, second_round, second_round_eligible, \
     assigned_district, assigned_building, assigned_unit, assigned_room, building_key, \
     stay_no, archive_no, confirmer, checker, created_at";

/// Back-office edit of the administrative columns. The selection flow
/// never touches these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminEdit {
    pub stay_no: Option<String>,
    pub archive_no: Option<String>,
    pub confirmer: Option<String>,
    pub checker: Option<String>,
}

/// Read-only dashboard summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub date: String,
    pub today_selected: u32,
    pub pending: u32,
    pub total_selected: u32,
    pub total_units: u32,
}

pub struct CandidateStore<'a> {
    conn: &'a Connection,
}

impl<'a> CandidateStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new candidate record (dataset load / import)
    #[instrument(skip(self, candidate), fields(query_no = %candidate.query_no))]
    pub fn create(&self, candidate: &CandidateRecord) -> Result<()> {
        let unit = candidate.assigned_unit.as_ref();
        self.conn.execute(
            "INSERT INTO candidates (id, query_no, name, id_number, phone, village, town, \
             select_date, first_round, second_round, second_round_eligible, \
             assigned_district, assigned_building, assigned_unit, assigned_room, building_key, \
             stay_no, archive_no, confirmer, checker, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19, ?20, ?21)",
            params![
                candidate.id.to_string(),
                candidate.query_no,
                candidate.name,
                candidate.id_number,
                candidate.phone,
                candidate.village,
                candidate.town,
                candidate.select_date.map(|d| d.to_string()),
                candidate.first_round.is_selected() as i32,
                candidate.second_round.is_selected() as i32,
                candidate.second_round_eligible as i32,
                unit.map(|u| u.district.as_str()),
                unit.map(|u| u.building_number),
                unit.map(|u| u.unit_number),
                unit.map(|u| u.room_code.clone()),
                candidate.building_key,
                candidate.stay_no,
                candidate.archive_no,
                candidate.confirmer,
                candidate.checker,
                candidate.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find candidate by internal ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<CandidateRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = ?1"
        ))?;
        let candidate = stmt
            .query_row(params![id.to_string()], candidate_from_row)
            .optional()?;
        Ok(candidate)
    }

    /// Exact lookup by public code: order number, ID number or phone
    #[instrument(skip(self))]
    pub fn find_by_code(&self, code: &str) -> Result<Option<CandidateRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates \
             WHERE query_no = ?1 OR id_number = ?1 OR phone = ?1"
        ))?;
        let candidate = stmt.query_row(params![code], candidate_from_row).optional()?;
        Ok(candidate)
    }

    /// All candidates in the pool for a round. Round 2 excludes round-1
    /// winners via the eligibility flag.
    #[instrument(skip(self))]
    pub fn list_for_round(&self, round: Round) -> Result<Vec<CandidateRecord>> {
        let sql = match round {
            Round::First => format!(
                "SELECT {CANDIDATE_COLUMNS} FROM candidates ORDER BY query_no"
            ),
            Round::Second => format!(
                "SELECT {CANDIDATE_COLUMNS} FROM candidates \
                 WHERE second_round_eligible = 1 ORDER BY query_no"
            ),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let candidates = stmt
            .query_map([], candidate_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    /// Candidates still unselected for a round
    #[instrument(skip(self))]
    pub fn list_unselected(&self, round: Round) -> Result<Vec<CandidateRecord>> {
        let sql = match round {
            Round::First => format!(
                "SELECT {CANDIDATE_COLUMNS} FROM candidates \
                 WHERE first_round = 0 ORDER BY query_no"
            ),
            Round::Second => format!(
                "SELECT {CANDIDATE_COLUMNS} FROM candidates \
                 WHERE second_round_eligible = 1 AND second_round = 0 ORDER BY query_no"
            ),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let candidates = stmt
            .query_map([], candidate_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    /// Every record, regardless of round (dataset export / derivation)
    #[instrument(skip(self))]
    pub fn list_all(&self) -> Result<Vec<CandidateRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates ORDER BY query_no"
        ))?;
        let candidates = stmt
            .query_map([], candidate_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    /// Case-insensitive substring search over order number, name, ID
    /// number and phone, scoped to the round's pool. An empty query
    /// yields nothing, not everything. At most 10 rows.
    #[instrument(skip(self))]
    pub fn search(&self, round: Round, query: &str) -> Result<Vec<CandidateRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pool_filter = match round {
            Round::First => "1 = 1",
            Round::Second => "second_round_eligible = 1",
        };
        // LIKE metacharacters in the query text are literal characters
        // to the operator, so escape them.
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let sql = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates \
             WHERE {pool_filter} AND (\
                 query_no LIKE '%' || ?1 || '%' COLLATE NOCASE ESCAPE '\\' \
                 OR name LIKE '%' || ?1 || '%' COLLATE NOCASE ESCAPE '\\' \
                 OR id_number LIKE '%' || ?1 || '%' COLLATE NOCASE ESCAPE '\\' \
                 OR phone LIKE '%' || ?1 || '%' COLLATE NOCASE ESCAPE '\\') \
             ORDER BY query_no LIMIT {SEARCH_LIMIT}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let candidates = stmt
            .query_map(params![escaped], candidate_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    /// Atomically assign a unit to a candidate for a round.
    ///
    /// Fails with `AlreadySelected` when the candidate's status for the
    /// round is already Selected (or, for round 2, when round 1 already
    /// settled them), and with `UnitTaken` when another candidate holds
    /// the unit. The whole check-then-set runs in one SQL transaction;
    /// the partial unique index on the assignment columns backstops any
    /// interleaving the scan misses.
    #[instrument(skip(self, unit), fields(room = %unit.room_code))]
    pub fn apply_assignment(
        &self,
        candidate_id: Uuid,
        round: Round,
        unit: &UnitRef,
    ) -> Result<CandidateRecord> {
        let tx = self.conn.unchecked_transaction()?;

        let candidate = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = ?1"
            ))?;
            stmt.query_row(params![candidate_id.to_string()], candidate_from_row)
                .optional()?
                .ok_or_else(|| Error::NotFound(format!("candidate {candidate_id}")))?
        };

        if candidate.status_for(round).is_selected() {
            return Err(Error::AlreadySelected(round.label().to_string()));
        }
        if round == Round::Second
            && (candidate.first_round.is_selected() || !candidate.second_round_eligible)
        {
            return Err(Error::AlreadySelected(Round::First.label().to_string()));
        }

        let taken: u32 = tx.query_row(
            "SELECT COUNT(*) FROM candidates \
             WHERE assigned_district = ?1 AND assigned_building = ?2 AND assigned_room = ?3",
            params![unit.district.as_str(), unit.building_number, unit.room_code],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(Error::UnitTaken(format!(
                "{}_{} {}",
                unit.district.as_str(),
                unit.building_number,
                unit.room_code
            )));
        }

        let round_column = match round {
            Round::First => "first_round",
            Round::Second => "second_round",
        };
        // Round-1 winners are settled; they leave the round-2 pool.
        let eligible_clause = match round {
            Round::First => ", second_round_eligible = 0",
            Round::Second => "",
        };
        let updated = tx
            .execute(
                &format!(
                    "UPDATE candidates SET {round_column} = 1{eligible_clause}, \
                     assigned_district = ?1, assigned_building = ?2, assigned_unit = ?3, \
                     assigned_room = ?4, building_key = ?5, select_date = ?6 \
                     WHERE id = ?7"
                ),
                params![
                    unit.district.as_str(),
                    unit.building_number,
                    unit.unit_number,
                    unit.room_code,
                    unit.building_id().key(),
                    Utc::now().date_naive().to_string(),
                    candidate_id.to_string(),
                ],
            )
            .map_err(|e| match unique_violation(&e) {
                true => Error::UnitTaken(format!(
                    "{}_{} {}",
                    unit.district.as_str(),
                    unit.building_number,
                    unit.room_code
                )),
                false => Error::Database(e),
            })?;
        debug_assert_eq!(updated, 1);

        // Capacity is structurally bounded by the 44 distinct room codes,
        // so exceeding it means the atomicity guarantee broke.
        let selected: u32 = tx.query_row(
            "SELECT COUNT(*) FROM candidates \
             WHERE assigned_district = ?1 AND assigned_building = ?2",
            params![unit.district.as_str(), unit.building_number],
            |row| row.get(0),
        )?;
        if selected > UNITS_PER_BUILDING {
            tracing::error!(
                building = %unit.building_id(),
                selected,
                capacity = UNITS_PER_BUILDING,
                "building over capacity after assignment; rejecting"
            );
            debug_assert!(false, "building over capacity");
            return Err(Error::Inconsistency(format!(
                "building {} holds {selected} assignments, capacity {UNITS_PER_BUILDING}",
                unit.building_id()
            )));
        }

        let record = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = ?1"
            ))?;
            stmt.query_row(params![candidate_id.to_string()], candidate_from_row)?
        };
        tx.commit()?;
        Ok(record)
    }

    /// Back-office edit of administrative columns only
    #[instrument(skip(self, edit))]
    pub fn update_administrative(&self, id: Uuid, edit: &AdminEdit) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE candidates SET stay_no = ?1, archive_no = ?2, confirmer = ?3, checker = ?4 \
             WHERE id = ?5",
            params![
                edit.stay_no,
                edit.archive_no,
                edit.confirmer,
                edit.checker,
                id.to_string()
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("candidate {id}")));
        }
        Ok(())
    }

    /// Bulk delete by explicit id list. The confirmation step lives with
    /// the caller; this just deletes.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub fn delete_many(&self, ids: &[Uuid]) -> Result<u64> {
        let tx = self.conn.unchecked_transaction()?;
        let mut deleted = 0u64;
        for id in ids {
            deleted += tx.execute(
                "DELETE FROM candidates WHERE id = ?1",
                params![id.to_string()],
            )? as u64;
        }
        tx.commit()?;
        Ok(deleted)
    }

    /// Dashboard summary: today's selections, pending and total counts.
    /// `total_units` is the site capacity (registered buildings x 44).
    #[instrument(skip(self))]
    pub fn summary(&self, total_units: u32) -> Result<SelectionSummary> {
        let today = Utc::now().date_naive().to_string();
        let today_selected: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM candidates \
             WHERE (first_round = 1 OR second_round = 1) AND select_date = ?1",
            params![today],
            |row| row.get(0),
        )?;
        let total_selected: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM candidates WHERE first_round = 1 OR second_round = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(SelectionSummary {
            date: today,
            today_selected,
            pending: total_units.saturating_sub(total_selected),
            total_selected,
            total_units,
        })
    }
}

fn candidate_from_row(row: &Row<'_>) -> rusqlite::Result<CandidateRecord> {
    let assigned_district: Option<String> = row.get(11)?;
    let assigned_building: Option<u32> = row.get(12)?;
    let assigned_unit: Option<u32> = row.get(13)?;
    let assigned_room: Option<String> = row.get(14)?;

    let assigned = match (assigned_district, assigned_building, assigned_unit, assigned_room) {
        (Some(district), Some(building_number), Some(unit_number), Some(room_code)) => {
            Some(UnitRef {
                district: parse_district(&district)?,
                building_number,
                unit_number,
                room_code,
            })
        }
        _ => None,
    };

    Ok(CandidateRecord {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        query_no: row.get(1)?,
        name: row.get(2)?,
        id_number: row.get(3)?,
        phone: row.get(4)?,
        village: row.get(5)?,
        town: row.get(6)?,
        select_date: parse_date_opt(row.get::<_, Option<String>>(7)?)?,
        first_round: round_status_from_i32(row.get(8)?),
        second_round: round_status_from_i32(row.get(9)?),
        second_round_eligible: row.get::<_, i32>(10)? != 0,
        assigned_unit: assigned,
        building_key: row.get(15)?,
        stay_no: row.get(16)?,
        archive_no: row.get(17)?,
        confirmer: row.get(18)?,
        checker: row.get(19)?,
        created_at: parse_datetime(&row.get::<_, String>(20)?)?,
    })
}

fn unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
