//! Operator account and session storage operations

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_datetime_opt, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{Operator, OperatorSession};

pub struct OperatorStore<'a> {
    conn: &'a Connection,
}

impl<'a> OperatorStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new operator account
    #[instrument(skip(self, operator), fields(username = %operator.username))]
    pub fn create(&self, operator: &Operator) -> Result<()> {
        self.conn.execute(
            "INSERT INTO operators (id, username, password_hash, display_name, created_at, last_login) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                operator.id.to_string(),
                operator.username,
                operator.password_hash,
                operator.display_name,
                operator.created_at.to_rfc3339(),
                operator.last_login.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Find operator by username
    #[instrument(skip(self))]
    pub fn find_by_username(&self, username: &str) -> Result<Option<Operator>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, password_hash, display_name, created_at, last_login \
             FROM operators WHERE username = ?1",
        )?;

        let operator = stmt
            .query_row(params![username], |row| {
                Ok(Operator {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                    display_name: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?)?,
                    last_login: parse_datetime_opt(row.get::<_, Option<String>>(5)?)?,
                })
            })
            .optional()?;

        Ok(operator)
    }

    /// Find operator by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Operator>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, password_hash, display_name, created_at, last_login \
             FROM operators WHERE id = ?1",
        )?;

        let operator = stmt
            .query_row(params![id.to_string()], |row| {
                Ok(Operator {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                    display_name: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?)?,
                    last_login: parse_datetime_opt(row.get::<_, Option<String>>(5)?)?,
                })
            })
            .optional()?;

        Ok(operator)
    }

    /// Update last login time
    pub fn update_last_login(&self, operator_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE operators SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), operator_id.to_string()],
        )?;
        Ok(())
    }

    /// Create a bearer-token session
    #[instrument(skip(self, session), fields(operator_id = %session.operator_id))]
    pub fn create_session(&self, session: &OperatorSession) -> Result<()> {
        self.conn.execute(
            "INSERT INTO operator_sessions (token, operator_id, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token,
                session.operator_id.to_string(),
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find an unexpired session by its token
    #[instrument(skip(self, token))]
    pub fn find_valid_session(&self, token: &str) -> Result<Option<OperatorSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT token, operator_id, created_at, expires_at FROM operator_sessions \
             WHERE token = ?1 AND expires_at > ?2",
        )?;

        let now = Utc::now().to_rfc3339();
        let session = stmt
            .query_row(params![token, now], |row| {
                Ok(OperatorSession {
                    token: row.get(0)?,
                    operator_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    expires_at: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })
            .optional()?;

        Ok(session)
    }

    /// Delete a session (logout)
    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM operator_sessions WHERE token = ?1",
            params![token],
        )?;
        Ok(())
    }

    /// Clean up expired sessions
    pub fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM operator_sessions WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn seed_operator(db: &Database) -> Operator {
        let op = Operator::new("admin".into(), "hash".into(), "管理员".into());
        db.operators().create(&op).unwrap();
        op
    }

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let op = seed_operator(&db);

        let found = db.operators().find_by_username("admin").unwrap().unwrap();
        assert_eq!(found.id, op.id);
        assert_eq!(found.display_name, "管理员");
        assert!(db.operators().find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_session_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let op = seed_operator(&db);
        let store = db.operators();

        let session = OperatorSession::new(op.id, "tok-abc".into(), 12);
        store.create_session(&session).unwrap();

        let found = store.find_valid_session("tok-abc").unwrap().unwrap();
        assert_eq!(found.operator_id, op.id);

        store.delete_session("tok-abc").unwrap();
        assert!(store.find_valid_session("tok-abc").unwrap().is_none());
    }

    #[test]
    fn test_expired_session_not_found() {
        let db = Database::open_in_memory().unwrap();
        let op = seed_operator(&db);
        let store = db.operators();

        let mut session = OperatorSession::new(op.id, "tok-old".into(), 12);
        session.expires_at = Utc::now() - chrono::Duration::hours(1);
        store.create_session(&session).unwrap();

        assert!(store.find_valid_session("tok-old").unwrap().is_none());
        assert_eq!(store.cleanup_expired_sessions().unwrap(), 1);
    }
}
