//! Operator (back-office staff) account model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A staff account allowed to drive selection sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Operator {
    pub fn new(username: String, password_hash: String, display_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            display_name,
            created_at: Utc::now(),
            last_login: None,
        }
    }
}

/// Bearer-token session for a logged-in operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSession {
    pub token: String,
    pub operator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OperatorSession {
    pub fn new(operator_id: Uuid, token: String, duration_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            token,
            operator_id,
            created_at: now,
            expires_at: now + chrono::Duration::hours(duration_hours),
        }
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}
