//! Session management: opaque cookie tokens mapped to a small per-client record
//! holding the bound username and the pending flash queue. Sessions expire by
//! TTL (swept in the background) or on process restart; the map is injected
//! state, not a process-wide singleton.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::tprintln;

pub type SessionToken = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// A short-lived, single-delivery notification: shown on the next render, then
/// discarded. A message flashed but never drained before expiry is lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug)]
struct SessionEntry {
    username: Option<String>,
    flash: Vec<Flash>,
    expires_at: Instant,
}

fn gen_token() -> String {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[derive(Clone)]
pub struct SessionManager {
    ttl: Duration,
    inner: Arc<RwLock<HashMap<SessionToken, SessionEntry>>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Resolve the token for a request: reuse `existing` if it names a live
    /// session, otherwise create an anonymous one. Returns the token plus
    /// whether it is newly issued (the caller must then set the cookie).
    pub fn ensure(&self, existing: Option<&str>) -> (SessionToken, bool) {
        if let Some(tok) = existing {
            if self.is_live(tok) {
                return (tok.to_string(), false);
            }
        }
        let token = gen_token();
        let entry = SessionEntry {
            username: None,
            flash: Vec::new(),
            expires_at: Instant::now() + self.ttl,
        };
        self.inner.write().insert(token.clone(), entry);
        tprintln!("session.issue ttl_secs={}", self.ttl.as_secs());
        (token, true)
    }

    fn is_live(&self, token: &str) -> bool {
        let now = Instant::now();
        let expired = {
            let map = self.inner.read();
            match map.get(token) {
                Some(ent) => {
                    if ent.expires_at > now {
                        return true;
                    }
                    true // present but expired; prune below
                }
                None => false,
            }
        };
        if expired {
            self.inner.write().remove(token);
        }
        false
    }

    /// Bind an authenticated identity into the session. Returns false when the
    /// token names no live session.
    pub fn bind(&self, token: &str, username: &str) -> bool {
        let mut map = self.inner.write();
        match map.get_mut(token) {
            Some(ent) => {
                ent.username = Some(username.to_string());
                tprintln!("session.bind user={}", username);
                true
            }
            None => false,
        }
    }

    /// The username bound to the session, if any. Expired sessions read as
    /// anonymous and are pruned.
    pub fn username_for(&self, token: &str) -> Option<String> {
        let now = Instant::now();
        let mut drop_key = false;
        let out = {
            let map = self.inner.read();
            match map.get(token) {
                Some(ent) if ent.expires_at > now => ent.username.clone(),
                Some(_) => {
                    drop_key = true;
                    None
                }
                None => None,
            }
        };
        if drop_key {
            self.inner.write().remove(token);
        }
        out
    }

    /// Enqueue a transient message for the next render.
    pub fn flash(&self, token: &str, severity: Severity, text: impl Into<String>) {
        let mut map = self.inner.write();
        if let Some(ent) = map.get_mut(token) {
            ent.flash.push(Flash { severity, text: text.into() });
        }
    }

    /// Return and clear all pending messages: at-most-once delivery per message.
    pub fn drain_flash(&self, token: &str) -> Vec<Flash> {
        let mut map = self.inner.write();
        match map.get_mut(token) {
            Some(ent) => std::mem::take(&mut ent.flash),
            None => Vec::new(),
        }
    }

    /// Drop the session entirely (logout). Returns true if it existed.
    pub fn destroy(&self, token: &str) -> bool {
        let removed = self.inner.write().remove(token).is_some();
        if removed {
            tprintln!("session.destroy");
        }
        removed
    }

    /// Remove expired sessions. Returns number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        let mut w = self.inner.write();
        let keys: Vec<SessionToken> = w
            .iter()
            .filter(|(_, ent)| now >= ent.expires_at)
            .map(|(k, _)| k.clone())
            .collect();
        for k in keys {
            if w.remove(&k).is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_reuses_live_sessions() {
        let sm = SessionManager::default();
        let (tok, fresh) = sm.ensure(None);
        assert!(fresh);
        let (tok2, fresh2) = sm.ensure(Some(&tok));
        assert_eq!(tok, tok2);
        assert!(!fresh2);
    }

    #[test]
    fn ensure_replaces_unknown_tokens() {
        let sm = SessionManager::default();
        let (tok, fresh) = sm.ensure(Some("forged-token"));
        assert!(fresh);
        assert_ne!(tok, "forged-token");
    }

    #[test]
    fn bind_and_lookup() {
        let sm = SessionManager::default();
        let (tok, _) = sm.ensure(None);
        assert_eq!(sm.username_for(&tok), None);
        assert!(sm.bind(&tok, "alice"));
        assert_eq!(sm.username_for(&tok).as_deref(), Some("alice"));
        assert!(!sm.bind("missing", "alice"));
    }

    #[test]
    fn drain_flash_delivers_at_most_once() {
        let sm = SessionManager::default();
        let (tok, _) = sm.ensure(None);
        sm.flash(&tok, Severity::Success, "Data submitted successfully.");
        sm.flash(&tok, Severity::Warning, "Please log in to submit data.");
        let first = sm.drain_flash(&tok);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].severity, Severity::Success);
        assert!(sm.drain_flash(&tok).is_empty());
    }

    #[test]
    fn expired_sessions_read_as_anonymous_and_sweep_away() {
        let sm = SessionManager::new(Duration::from_millis(0));
        let (tok, _) = sm.ensure(None);
        sm.bind(&tok, "alice");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(sm.username_for(&tok), None);

        let (tok2, _) = sm.ensure(None);
        let _ = tok2;
        std::thread::sleep(Duration::from_millis(5));
        let removed = sm.sweep();
        assert!(removed >= 1);
        assert!(sm.is_empty());
    }

    #[test]
    fn destroy_removes_binding() {
        let sm = SessionManager::default();
        let (tok, _) = sm.ensure(None);
        sm.bind(&tok, "alice");
        assert!(sm.destroy(&tok));
        assert!(!sm.destroy(&tok));
        assert_eq!(sm.username_for(&tok), None);
    }
}
