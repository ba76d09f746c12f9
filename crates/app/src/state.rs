//! Application state management

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use directories::ProjectDirs;
use tracing::{info, instrument};
use uuid::Uuid;

use anju_core::{Database, Error, Result, Round, SelectionTimer};

use crate::config::AppConfig;

/// The candidate whose window is currently open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub candidate_id: Uuid,
    pub round: Round,
}

/// Main application state
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub timer: Arc<Mutex<SelectionTimer>>,
    pub active: Arc<Mutex<Option<ActiveSession>>>,
    pub session_hours: i64,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let db_path = match &config.database_path {
            Some(path) => path.clone(),
            None => Self::data_path()?.join("anju.db"),
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        info!(path = %db_path.display(), "Database opened");

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            timer: Arc::new(Mutex::new(SelectionTimer::new())),
            active: Arc::new(Mutex::new(None)),
            session_hours: config.session_hours,
        })
    }

    /// In-memory state for tests
    pub fn in_memory(session_hours: i64) -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
            timer: Arc::new(Mutex::new(SelectionTimer::new())),
            active: Arc::new(Mutex::new(None)),
            session_hours,
        })
    }

    fn data_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("cn", "anju", "anju").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Platform config file location
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("cn", "anju", "anju").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Open a 3-minute window for a candidate.
    ///
    /// Refused while another candidate's window is open; the operator
    /// resets first. The candidate must exist and must still be in the
    /// round's pool.
    #[instrument(skip(self))]
    pub fn begin_session(&self, candidate_id: Uuid, round: Round) -> Result<()> {
        let mut active = self.active.lock().unwrap();
        if self.timer.lock().unwrap().is_running() {
            return Err(Error::Validation("a selection window is already open".into()));
        }

        {
            let db = self.db.lock().unwrap();
            let candidate = db
                .candidates()
                .find_by_id(candidate_id)?
                .ok_or_else(|| Error::NotFound(format!("candidate {candidate_id}")))?;
            if candidate.status_for(round).is_selected() {
                return Err(Error::AlreadySelected(round.label().to_string()));
            }
            if round == Round::Second && !candidate.second_round_eligible {
                return Err(Error::AlreadySelected(Round::First.label().to_string()));
            }
        }

        let mut timer = self.timer.lock().unwrap();
        timer.reset();
        timer.start(Instant::now());
        *active = Some(ActiveSession {
            candidate_id,
            round,
        });
        info!(candidate_id = %candidate_id, "Selection window opened");
        Ok(())
    }

    /// Abort the current window, returning the timer to idle
    #[instrument(skip(self))]
    pub fn reset_session(&self) -> Result<()> {
        let mut active = self.active.lock().unwrap();
        self.timer.lock().unwrap().reset();
        *active = None;
        info!("Selection window reset");
        Ok(())
    }

    /// Commit the active candidate's unit choice
    #[instrument(skip(self))]
    pub fn submit_selection(
        &self,
        candidate_id: Uuid,
        round: Round,
        building: anju_core::BuildingId,
        room_code: &str,
    ) -> Result<anju_core::AssignmentSummary> {
        let active = self.active.lock().unwrap();
        match *active {
            Some(session)
                if session.candidate_id == candidate_id && session.round == round => {}
            _ => return Err(Error::SessionLocked),
        }
        drop(active);

        let db = self.db.lock().unwrap();
        let mut timer = self.timer.lock().unwrap();
        anju_core::submit(&db, &mut timer, candidate_id, round, building, room_code)
    }

    /// Clear the active candidate after the post-commit countdown
    pub fn clear_active(&self) {
        *self.active.lock().unwrap() = None;
    }

    pub fn active_session(&self) -> Option<ActiveSession> {
        *self.active.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anju_core::{BuildingCoord, BuildingId, CandidateRecord, District, TimerPhase};

    fn state_with_candidate() -> (AppState, CandidateRecord) {
        let state = AppState::in_memory(12).unwrap();
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
        }
        (state, candidate)
    }

    #[test]
    fn test_begin_submit_cycle() {
        let (state, candidate) = state_with_candidate();
        state.begin_session(candidate.id, Round::First).unwrap();
        assert!(state.timer.lock().unwrap().is_running());

        let summary = state
            .submit_selection(
                candidate.id,
                Round::First,
                BuildingId::new(District::West, 3),
                "0102",
            )
            .unwrap();
        assert_eq!(summary.size_sqm, 100);
        assert_eq!(state.timer.lock().unwrap().phase(), TimerPhase::Finished);
    }

    #[test]
    fn test_begin_refused_while_window_open() {
        let (state, candidate) = state_with_candidate();
        state.begin_session(candidate.id, Round::First).unwrap();
        let err = state.begin_session(candidate.id, Round::First).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_submit_for_inactive_candidate_refused() {
        let (state, candidate) = state_with_candidate();
        state.begin_session(candidate.id, Round::First).unwrap();

        let err = state
            .submit_selection(
                Uuid::new_v4(),
                Round::First,
                BuildingId::new(District::West, 3),
                "0102",
            )
            .unwrap_err();
        assert!(matches!(err, Error::SessionLocked));
    }

    #[test]
    fn test_reset_reopens() {
        let (state, candidate) = state_with_candidate();
        state.begin_session(candidate.id, Round::First).unwrap();
        state.reset_session().unwrap();
        assert!(state.active_session().is_none());
        state.begin_session(candidate.id, Round::First).unwrap();
    }

    #[test]
    fn test_begin_refuses_settled_candidate() {
        let (state, candidate) = state_with_candidate();
        state.begin_session(candidate.id, Round::First).unwrap();
        state
            .submit_selection(
                candidate.id,
                Round::First,
                BuildingId::new(District::West, 3),
                "0102",
            )
            .unwrap();
        state.clear_active();
        state.timer.lock().unwrap().reset();

        let err = state.begin_session(candidate.id, Round::Second).unwrap_err();
        assert!(matches!(err, Error::AlreadySelected(_)));
    }
}
