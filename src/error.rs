//! Unified application error taxonomy shared across services and the HTTP boundary.
//! Validation and authentication failures are recovered locally (redirect plus an
//! optional flash); store-connectivity failures degrade per-request and are never
//! fatal to the process.

use thiserror::Error;

/// Failures surfaced by the key-value store engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store did not answer within the configured deadline, or the engine failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The requested key does not exist.
    #[error("key not found")]
    NotFound,
    /// The key holds a value of a different kind than the operation expects
    /// (e.g. a list operation against a plain string key).
    #[error("wrong value kind for key '{0}'")]
    WrongKind(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("password must be at least {} characters", crate::auth::MIN_PASSWORD_LEN)]
    TooShort,
    #[error("password confirmation does not match password")]
    Mismatch,
    /// The username is already taken. The boundary deliberately gives the client
    /// no explicit message for this, only a redirect back to the register page.
    #[error("username already exists")]
    AlreadyExists,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginError {
    /// Covers both unknown-username and wrong-password so the two are
    /// indistinguishable to the client (no username enumeration).
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("not logged in")]
    Unauthenticated,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_propagates_through_service_errors() {
        let e = StoreError::Unavailable("timeout".into());
        assert_eq!(RegisterError::from(e.clone()), RegisterError::Store(e.clone()));
        assert_eq!(LoginError::from(e.clone()), LoginError::Store(e.clone()));
        assert_eq!(SubmitError::from(e.clone()), SubmitError::Store(e));
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            RegisterError::TooShort.to_string(),
            "password must be at least 5 characters"
        );
        assert_eq!(LoginError::InvalidCredentials.to_string(), "invalid credentials");
        assert_eq!(StoreError::NotFound.to_string(), "key not found");
        assert_eq!(
            StoreError::WrongKind("alice".into()).to_string(),
            "wrong value kind for key 'alice'"
        );
    }

    #[test]
    fn lookup_miss_and_wrong_password_share_one_variant() {
        // Both failure paths in login collapse into InvalidCredentials.
        let a = LoginError::InvalidCredentials;
        let b = LoginError::InvalidCredentials;
        assert_eq!(a, b);
    }
}
