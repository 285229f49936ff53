//! In-memory login sessions.
//!
//! A session is created on signup or login and identified by an opaque random
//! token that clients send back on every protected request. Sessions live only
//! in process memory; restarting the server logs everyone out.

use chie_board::User;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Upper bound on the configured lifetime (30 days).
const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// A logged-in user.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Token-keyed session table shared by all request handlers.
#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: TimeDelta,
}

impl SessionStore {
    /// Creates an empty store whose sessions last `ttl_secs` seconds.
    pub fn new(ttl_secs: u64) -> Self {
        let secs = ttl_secs.min(MAX_TTL_SECS) as i64;
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: TimeDelta::seconds(secs),
        }
    }

    /// Opens a new session for `user` and returns it.
    pub fn create(&self, user: User) -> Session {
        let now = Utc::now();
        let session = Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            user,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.write().insert(session.token.clone(), session.clone());
        tracing::debug!(ldap_id = %session.user.ldap_id, "session created");
        session
    }

    /// Looks up a live session. Expired sessions are dropped on access.
    pub fn get(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.read();
            match sessions.get(token) {
                None => return None,
                Some(session) if !session.is_expired_at(now) => return Some(session.clone()),
                Some(_) => {}
            }
        }
        self.write().remove(token);
        None
    }

    /// Ends a session. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.write().remove(token).is_some()
    }

    /// Removes every expired session and returns how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        before - sessions.len()
    }

    /// Number of stored sessions, expired or not.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned lock only means a panic happened mid-access; the map itself
    // is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(|poisoned| {
            tracing::error!("session store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(|poisoned| {
            tracing::error!("session store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
