//! In-memory session store
//!
//! Holds at most one planning session per user, plus the per-user
//! single-flight markers the engine uses to drop concurrent events.

use crate::state_machine::{Session, SessionUpdate};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found for user: {0}")]
    NotFound(String),
}

/// Thread-safe session store shared by the engine and the gateway
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Marks a user as having an event in flight until dropped
#[derive(Debug)]
pub struct InFlightGuard {
    user_id: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // Release even if another holder panicked while the set was locked
        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        in_flight.remove(&self.user_id);
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session, replacing any existing one for that user
    pub fn create(&self, session: Session) -> Option<Session> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(session.user_id.clone(), session)
    }

    pub fn get(&self, user_id: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(user_id).cloned()
    }

    /// Apply a single field update and return the updated session
    pub fn update(&self, user_id: &str, update: SessionUpdate) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(user_id)
            .ok_or_else(|| SessionError::NotFound(user_id.to_string()))?;
        session.apply(update);
        Ok(session.clone())
    }

    pub fn end(&self, user_id: &str) -> Option<Session> {
        self.sessions.lock().unwrap().remove(user_id)
    }

    /// Claim the user's single-flight slot; `None` if an event for that user
    /// is already being processed.
    pub fn try_begin(&self, user_id: &str) -> Option<InFlightGuard> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if !in_flight.insert(user_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            user_id: user_id.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_busy(&self, user_id: &str) -> bool {
        self.in_flight.lock().unwrap().contains(user_id)
    }

    /// Remove and return sessions idle for longer than `idle_timeout`.
    /// Users with an event in flight are left alone.
    pub fn expire_idle(&self, now: DateTime<Utc>, idle_timeout: Duration) -> Vec<Session> {
        let in_flight = self.in_flight.lock().unwrap();
        let mut sessions = self.sessions.lock().unwrap();

        let expired: Vec<String> = sessions
            .values()
            .filter(|s| !in_flight.contains(&s.user_id) && s.is_idle(now, idle_timeout))
            .map(|s| s.user_id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|user_id| sessions.remove(user_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
