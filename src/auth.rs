//! Credential storage and the authentication service.
//!
//! Credentials live in the KV store keyed by the bare username, value = PHC
//! password-hash string. Registration uses the store's atomic `set_if_absent`
//! so two concurrent registrations for the same new username cannot overwrite
//! each other; there is no check-then-set pair anywhere on this path.

use std::time::Duration;

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use crate::error::{LoginError, RegisterError, StoreError};
use crate::session::SessionManager;
use crate::store::{bounded, SharedKv};
use crate::tprintln;

pub const MIN_PASSWORD_LEN: usize = 5;

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Constant-time verification against a PHC string. Unparseable hashes verify
/// as false rather than erroring.
pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

/// Username -> password-hash records. At most one record per username; records
/// are never updated in place and never deleted.
#[derive(Clone)]
pub struct CredentialStore {
    kv: SharedKv,
    op_timeout: Duration,
}

impl CredentialStore {
    pub fn new(kv: SharedKv, op_timeout: Duration) -> Self {
        Self { kv, op_timeout }
    }

    pub async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        bounded(self.op_timeout, self.kv.exists(username)).await
    }

    /// Atomically claim the username. Returns false when it is already taken.
    pub async fn set_if_absent(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        bounded(self.op_timeout, self.kv.set_if_absent(username, password_hash)).await
    }

    pub async fn get(&self, username: &str) -> Result<String, StoreError> {
        match bounded(self.op_timeout, self.kv.get(username)).await? {
            Some(hash) => Ok(hash),
            None => Err(StoreError::NotFound),
        }
    }
}

/// Validates credentials against the credential store and establishes sessions.
#[derive(Clone)]
pub struct AuthService {
    creds: CredentialStore,
}

impl AuthService {
    pub fn new(creds: CredentialStore) -> Self {
        Self { creds }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.creds
    }

    /// Create a credential record for a new user.
    ///
    /// Validation order: length, then confirmation, then uniqueness.
    /// Uniqueness is enforced by the atomic conditional write, so a
    /// losing concurrent registration surfaces as `AlreadyExists` with the
    /// winner's hash untouched.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), RegisterError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(RegisterError::TooShort);
        }
        if password != confirm_password {
            return Err(RegisterError::Mismatch);
        }
        let phc = hash_password(password).map_err(|e| RegisterError::Hash(e.to_string()))?;
        if !self.creds.set_if_absent(username, &phc).await? {
            return Err(RegisterError::AlreadyExists);
        }
        tprintln!("auth.register user={}", username);
        Ok(())
    }

    /// Verify credentials and bind the username into the session on success.
    /// Unknown usernames and wrong passwords are indistinguishable to callers.
    pub async fn login(
        &self,
        sessions: &SessionManager,
        token: &str,
        username: &str,
        password: &str,
    ) -> Result<(), LoginError> {
        let hash = match self.creds.get(username).await {
            Ok(h) => h,
            Err(StoreError::NotFound) => return Err(LoginError::InvalidCredentials),
            Err(e) => return Err(LoginError::Store(e)),
        };
        if !verify_password(&hash, password) {
            return Err(LoginError::InvalidCredentials);
        }
        sessions.bind(token, username);
        tprintln!("auth.login user={}", username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let phc = hash_password("secret").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password(&phc, "secret"));
        assert!(!verify_password(&phc, "wrong"));
    }

    #[test]
    fn hashes_are_salted_per_call() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_verifies_false() {
        assert!(!verify_password("not-a-phc-string", "secret"));
    }
}
