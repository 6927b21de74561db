//! Staff authentication for the administration endpoints: HTTP Basic credentials checked against
//! argon2 password hashes stored on `auth_user`.

use crate::error::AppError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::HeaderValue;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// False for an empty or unparsable hash: such a user cannot log in.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Username and password of one login attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Parse an `Authorization: Basic <base64(username:password)>` header value.
    pub fn from_basic(value: &HeaderValue) -> Result<Self, AppError> {
        let malformed = || AppError::Unauthorized("malformed basic credentials".into());
        let encoded = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Basic "))
            .ok_or_else(malformed)?;
        let decoded = STANDARD.decode(encoded.trim()).map_err(|_| malformed())?;
        let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
        let (username, password) = decoded.split_once(':').ok_or_else(malformed)?;
        Ok(Credentials {
            username: username.trim().to_string(),
            password: password.to_string(),
        })
    }
}

/// Why a login attempt was refused. The display text is what gets reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    #[error("login failed: no username given")]
    MissingUsername,
    #[error("login failed for existing user: {0}")]
    WrongPassword(String),
    #[error("login failed for unknown user: {0}")]
    UnknownUser(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn basic(raw: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(raw))).unwrap()
    }

    #[test]
    fn hashed_password_verifies_only_itself() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("s3cret!", &hash));
    }

    #[test]
    fn empty_hash_never_verifies() {
        assert!(!verify_password("", ""));
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[test]
    fn basic_credentials_keep_colons_in_password() {
        let creds = Credentials::from_basic(&basic("admin:a:b")).unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "a:b");
    }

    #[rstest]
    #[case("Bearer abc")]
    #[case("Basic !!!")]
    fn malformed_header_is_unauthorized(#[case] raw: &str) {
        let err = Credentials::from_basic(&HeaderValue::from_str(raw).unwrap()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn missing_separator_is_unauthorized() {
        assert!(Credentials::from_basic(&basic("admin")).is_err());
    }

    #[test]
    fn failure_messages_name_the_user() {
        assert_eq!(
            LoginFailure::WrongPassword("alice".into()).to_string(),
            "login failed for existing user: alice"
        );
        assert_eq!(
            LoginFailure::UnknownUser("bob".into()).to_string(),
            "login failed for unknown user: bob"
        );
        assert_eq!(LoginFailure::MissingUsername.to_string(), "login failed: no username given");
    }
}
