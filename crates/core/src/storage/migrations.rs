//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Candidate (displaced household) records
            CREATE TABLE IF NOT EXISTS candidates (
                id TEXT PRIMARY KEY,
                query_no TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                id_number TEXT NOT NULL,
                phone TEXT NOT NULL,
                village TEXT NOT NULL DEFAULT '',
                town TEXT NOT NULL DEFAULT '',
                select_date TEXT,
                first_round INTEGER NOT NULL DEFAULT 0,
                second_round INTEGER NOT NULL DEFAULT 0,
                second_round_eligible INTEGER NOT NULL DEFAULT 1,
                assigned_district TEXT,
                assigned_building INTEGER,
                assigned_unit INTEGER,
                assigned_room TEXT,
                building_key TEXT,
                stay_no TEXT,
                archive_no TEXT,
                confirmer TEXT,
                checker TEXT,
                created_at TEXT NOT NULL
            );

            -- Operator accounts
            CREATE TABLE IF NOT EXISTS operators (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                display_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_login TEXT
            );

            -- Bearer-token sessions
            CREATE TABLE IF NOT EXISTS operator_sessions (
                token TEXT PRIMARY KEY,
                operator_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (operator_id) REFERENCES operators(id) ON DELETE CASCADE
            );

            -- Aerial-map building coordinates (ordered batch)
            CREATE TABLE IF NOT EXISTS building_coords (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                zone TEXT NOT NULL,
                top_pct TEXT NOT NULL,
                left_pct TEXT NOT NULL,
                sort_order INTEGER NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Indexes and the at-most-one-assignment guard",
        sql: r#"
            -- Search columns
            CREATE INDEX IF NOT EXISTS idx_candidates_query_no ON candidates(query_no);
            CREATE INDEX IF NOT EXISTS idx_candidates_id_number ON candidates(id_number);
            CREATE INDEX IF NOT EXISTS idx_candidates_phone ON candidates(phone);

            -- Round listings
            CREATE INDEX IF NOT EXISTS idx_candidates_first_round ON candidates(first_round);
            CREATE INDEX IF NOT EXISTS idx_candidates_second_round
                ON candidates(second_round_eligible, second_round);

            -- A unit may be referenced by at most one candidate. Backstop
            -- for the check-then-set in apply_assignment.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_candidates_assignment
                ON candidates(assigned_district, assigned_building, assigned_room)
                WHERE assigned_room IS NOT NULL;

            -- Session expiry sweeps
            CREATE INDEX IF NOT EXISTS idx_operator_sessions_expires
                ON operator_sessions(expires_at);
        "#,
    },
];

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;

    let current: u32 = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<u32>>(0)
        })?
        .unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        info!(
            version = migration.version,
            description = migration.description,
            "Applying migration"
        );
        conn.execute_batch(migration.sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
    }

    Ok(())
}
