//! Operator authentication: argon2 password hashing and bearer tokens

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::models::{Operator, OperatorSession};
use crate::storage::Database;

/// Default session lifetime
pub const SESSION_HOURS: i64 = 24;

const TOKEN_BYTES: usize = 24;

/// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Unauthorized(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Generate an opaque bearer token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Log an operator in, minting a bearer-token session.
///
/// Unknown username and wrong password produce the same error so the
/// response does not leak which accounts exist.
#[instrument(skip(db, password))]
pub fn login(
    db: &Database,
    username: &str,
    password: &str,
    session_hours: i64,
) -> Result<(Operator, OperatorSession)> {
    let operator = db
        .operators()
        .find_by_username(username)?
        .ok_or_else(|| Error::Unauthorized("invalid username or password".into()))?;

    if !verify_password(password, &operator.password_hash) {
        return Err(Error::Unauthorized("invalid username or password".into()));
    }

    let session = OperatorSession::new(operator.id, generate_token(), session_hours);
    db.operators().create_session(&session)?;
    db.operators().update_last_login(operator.id)?;
    tracing::info!(username = %operator.username, "operator logged in");
    Ok((operator, session))
}

/// Resolve a bearer token to its operator, or refuse
#[instrument(skip(db, token))]
pub fn authorize(db: &Database, token: &str) -> Result<Operator> {
    let session = db
        .operators()
        .find_valid_session(token)?
        .ok_or_else(|| Error::Unauthorized("invalid or expired token".into()))?;
    db.operators()
        .find_by_id(session.operator_id)?
        .ok_or_else(|| Error::Unauthorized("session operator no longer exists".into()))
}

/// Log a session out
pub fn logout(db: &Database, token: &str) -> Result<()> {
    db.operators().delete_session(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_operator(password: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        let op = Operator::new(
            "admin".into(),
            hash_password(password).unwrap(),
            "管理员".into(),
        );
        db.operators().create(&op).unwrap();
        db
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret", "not-a-phc-string"));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_login_and_authorize() {
        let db = db_with_operator("s3cret");
        let (operator, session) = login(&db, "admin", "s3cret", SESSION_HOURS).unwrap();
        assert_eq!(operator.username, "admin");

        let authorized = authorize(&db, &session.token).unwrap();
        assert_eq!(authorized.id, operator.id);
    }

    #[test]
    fn test_login_failures_do_not_distinguish() {
        let db = db_with_operator("s3cret");
        let wrong_pass = login(&db, "admin", "nope", SESSION_HOURS).unwrap_err();
        let wrong_user = login(&db, "ghost", "nope", SESSION_HOURS).unwrap_err();
        assert_eq!(wrong_pass.to_string(), wrong_user.to_string());
    }

    #[test]
    fn test_logout_invalidates_token() {
        let db = db_with_operator("s3cret");
        let (_, session) = login(&db, "admin", "s3cret", SESSION_HOURS).unwrap();
        logout(&db, &session.token).unwrap();
        assert!(authorize(&db, &session.token).is_err());
    }
}
