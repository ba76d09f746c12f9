//! SQLite storage layer for Anju

mod buildings;
mod candidates;
mod migrations;
mod operators;
mod parse;
mod traits;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

use crate::error::Result;

pub use buildings::CoordStore;
pub use candidates::{AdminEdit, CandidateStore, SelectionSummary};
pub use operators::OperatorStore;
pub use traits::{CandidateRepository, CoordRepository, OperatorRepository, Storage};

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get candidate store
    pub fn candidates(&self) -> CandidateStore<'_> {
        CandidateStore::new(&self.conn)
    }

    /// Get building coordinate store
    pub fn coords(&self) -> CoordStore<'_> {
        CoordStore::new(&self.conn)
    }

    /// Get operator store
    pub fn operators(&self) -> OperatorStore<'_> {
        OperatorStore::new(&self.conn)
    }
}
