//! Per-user submission history: authenticated appends into `<username>:data`
//! and lookback retrieval from `<username>:results`. The data list is
//! append-only, newest at the head; the results list is populated by an
//! external worker and read-only here.

use std::time::Duration;

use crate::error::{StoreError, SubmitError};
use crate::store::{bounded, SharedKv};

fn data_key(username: &str) -> String {
    format!("{}:data", username)
}

fn results_key(username: &str) -> String {
    format!("{}:results", username)
}

#[derive(Clone)]
pub struct SubmissionService {
    kv: SharedKv,
    op_timeout: Duration,
}

impl SubmissionService {
    pub fn new(kv: SharedKv, op_timeout: Duration) -> Self {
        Self { kv, op_timeout }
    }

    /// Append `input` to the head of the caller's data list. Anonymous callers
    /// are rejected before the store is touched.
    pub async fn submit(&self, username: Option<&str>, input: &str) -> Result<(), SubmitError> {
        let Some(username) = username else {
            return Err(SubmitError::Unauthenticated);
        };
        bounded(self.op_timeout, self.kv.list_push_front(&data_key(username), input)).await?;
        Ok(())
    }

    /// Full results list for the caller, head to tail. Anonymous callers get an
    /// empty list. Store failures are returned to the caller; the HTTP boundary
    /// chooses whether to degrade to empty-and-logged.
    pub async fn fetch_history(
        &self,
        username: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let Some(username) = username else {
            return Ok(Vec::new());
        };
        bounded(self.op_timeout, self.kv.list_range(&results_key(username))).await
    }

    /// The caller's own submissions, newest first. Not part of the page flow,
    /// but the natural read side of `submit` and used by tests.
    pub async fn submissions(&self, username: &str) -> Result<Vec<String>, StoreError> {
        bounded(self.op_timeout, self.kv.list_range(&data_key(username))).await
    }
}
