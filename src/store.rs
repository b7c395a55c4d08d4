//!
//! droplog key-value store
//! -----------------------
//! The persistence backend for credentials and per-user submission lists. The
//! engine lives behind the `KvStore` trait so services take an injected handle
//! rather than a process-wide singleton, and so a remote client can replace the
//! embedded engine without touching the services.
//!
//! Key responsibilities:
//! - String keys with two value kinds: plain strings and ordered lists.
//! - Atomic single-operation semantics, including `set_if_absent` so callers
//!   never need a racy exists-then-set pair.
//! - A bounded-deadline wrapper so no request blocks indefinitely on the store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

pub mod memory;
#[cfg(test)]
mod store_tests;

pub use memory::MemoryStore;

/// Thread-safe handle to a store implementation, shared across services.
pub type SharedKv = Arc<dyn KvStore>;

/// Operations every store backend must provide. Each call is atomic with
/// respect to concurrent calls against the same key.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// True iff a value of any kind exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Fetch a plain string value. `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key` only if the key does not exist yet.
    /// Returns true when the write happened, false when the key was taken.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Push a value onto the head of the list at `key`, creating the list if
    /// absent. The head is always the most recent entry.
    async fn list_push_front(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Full contents of the list at `key`, head to tail. Empty when absent.
    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

/// Run a store call under a deadline. A timeout is reported as
/// `StoreError::Unavailable`, the same as any other connectivity failure.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>> + Send,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(StoreError::Unavailable(format!(
            "store call exceeded {}ms",
            limit.as_millis()
        ))),
    }
}
