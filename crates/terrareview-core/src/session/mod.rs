//! Per-session state: the caller's credential and one-shot flash notices.
//!
//! [`SessionStore`] is injected into request handlers; there is no global
//! session state. Each entry is keyed by a [`SessionId`] carried in a signed
//! cookie (see [`cookie`]) and only touched by that session's requests.
//! An entry exists only once something has been stored for it; reads of an
//! unknown id see an empty session.

pub mod cookie;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

pub use cookie::{SessionError, SessionKey};

/// Default idle lifetime of a session.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An API key for the summarization endpoint.
///
/// Never empty. Format and scope are not checked. `Debug` output is
/// redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw key, trimming whitespace. Returns `None` when blank.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// The raw key, for the outbound request only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug)]
struct SessionData {
    credential: Option<Credential>,
    flashes: Vec<String>,
    last_seen: DateTime<Utc>,
}

impl SessionData {
    fn new() -> Self {
        Self {
            credential: None,
            flashes: Vec::new(),
            last_seen: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory session store. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionData>>>,
    idle_ttl: chrono::Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TTL)
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl: chrono::Duration::from_std(idle_ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, SessionData>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, SessionData>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a session as active. Returns `false` if it holds no state, or
    /// had expired and was dropped.
    pub fn touch(&self, id: SessionId) -> bool {
        let now = Utc::now();
        let mut sessions = self.write();
        match sessions.get_mut(&id) {
            Some(data) if now - data.last_seen <= self.idle_ttl => {
                data.last_seen = now;
                true
            }
            Some(_) => {
                sessions.remove(&id);
                debug!(session = %id, "session expired");
                false
            }
            None => false,
        }
    }

    /// Whether any state is stored for the session.
    pub fn contains(&self, id: SessionId) -> bool {
        self.read().contains_key(&id)
    }

    /// Run `f` on the session's entry, creating it on first write. Creating an
    /// entry sweeps expired ones first.
    fn with_entry<R>(&self, id: SessionId, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut sessions = self.write();
        if !sessions.contains_key(&id) {
            let removed = sweep(&mut sessions, self.idle_ttl);
            if removed > 0 {
                debug!(removed, "swept expired sessions");
            }
            debug!(session = %id, "session opened");
        }
        f(sessions.entry(id).or_insert_with(SessionData::new))
    }

    /// The stored credential, if any.
    pub fn credential(&self, id: SessionId) -> Option<Credential> {
        self.read().get(&id).and_then(|d| d.credential.clone())
    }

    /// Store a credential for the session, replacing any previous one.
    pub fn set_credential(&self, id: SessionId, credential: Credential) {
        self.with_entry(id, |data| data.credential = Some(credential));
    }

    /// Remove the stored credential. Idempotent; returns whether one was set.
    pub fn clear_credential(&self, id: SessionId) -> bool {
        self.write()
            .get_mut(&id)
            .and_then(|d| d.credential.take())
            .is_some()
    }

    /// Credential for this request: a submitted non-blank key is stored and
    /// used; otherwise the session's stored key is used.
    pub fn resolve_credential(&self, id: SessionId, submitted: Option<&str>) -> Option<Credential> {
        match submitted.and_then(Credential::new) {
            Some(credential) => {
                self.set_credential(id, credential.clone());
                Some(credential)
            }
            None => self.credential(id),
        }
    }

    /// Queue a notice for the session's next page render.
    pub fn push_flash(&self, id: SessionId, message: impl Into<String>) {
        let message = message.into();
        self.with_entry(id, |data| data.flashes.push(message));
    }

    /// Drain queued notices.
    pub fn take_flashes(&self, id: SessionId) -> Vec<String> {
        self.write()
            .get_mut(&id)
            .map(|d| std::mem::take(&mut d.flashes))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

fn sweep(sessions: &mut HashMap<SessionId, SessionData>, idle_ttl: chrono::Duration) -> usize {
    let now = Utc::now();
    let before = sessions.len();
    sessions.retain(|_, data| now - data.last_seen <= idle_ttl);
    before - sessions.len()
}
