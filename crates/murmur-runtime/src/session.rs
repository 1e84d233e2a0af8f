//! Bounded per-stream conversation windows.
//!
//! A window holds at most `capacity` turns, counting user and assistant turns
//! individually. Appending past capacity evicts the oldest turn. Sessions are
//! created lazily on first append and live until deleted; nothing is persisted.
//!
//! The store itself only guarantees per-call atomicity. Ordering of appends for
//! one stream is provided by the coordinator running at most one job per stream.

use std::collections::VecDeque;

use dashmap::DashMap;
use metrics::gauge;
use murmur_core::{StreamId, Turn, TurnRole};

use crate::metrics::SESSIONS_ACTIVE;

/// Default window capacity in turns.
pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Default)]
struct Session {
    turns: VecDeque<Turn>,
    next_seq: u64,
}

/// Per-stream windows of recent turns.
#[derive(Debug)]
pub struct SessionStore {
    capacity: usize,
    sessions: DashMap<StreamId, Session>,
}

impl SessionStore {
    /// Create a store whose windows hold at most `capacity` turns (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sessions: DashMap::new(),
        }
    }

    /// Window capacity in turns.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a turn, creating the session if needed and evicting the oldest
    /// turns beyond capacity. Returns the stored turn.
    pub fn append(&self, stream_id: &StreamId, role: TurnRole, text: impl Into<String>) -> Turn {
        let (turn, created) = {
            let mut created = false;
            let mut session = self.sessions.entry(stream_id.clone()).or_insert_with(|| {
                created = true;
                Session::default()
            });
            let turn = Turn {
                seq: session.next_seq,
                role,
                text: text.into(),
            };
            session.next_seq += 1;
            session.turns.push_back(turn.clone());
            while session.turns.len() > self.capacity {
                let _ = session.turns.pop_front();
            }
            (turn, created)
        };
        if created {
            self.report_size();
        }
        turn
    }

    /// Turns of the window, oldest first. Empty for an unknown stream.
    pub fn recent(&self, stream_id: &StreamId) -> Vec<Turn> {
        self.sessions
            .get(stream_id)
            .map(|s| s.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove the session. Returns whether one existed. Idempotent.
    pub fn delete(&self, stream_id: &StreamId) -> bool {
        let removed = self.sessions.remove(stream_id).is_some();
        if removed {
            self.report_size();
        }
        removed
    }

    /// Empty an existing session's window, keeping the session. No-op when absent.
    pub fn reset(&self, stream_id: &StreamId) -> bool {
        match self.sessions.get_mut(stream_id) {
            Some(mut session) => {
                session.turns.clear();
                true
            }
            None => false,
        }
    }

    /// Whether a session exists for `stream_id`.
    pub fn contains(&self, stream_id: &StreamId) -> bool {
        self.sessions.contains_key(stream_id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions exist.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // Must not be called while holding a shard guard.
    fn report_size(&self) {
        gauge!(SESSIONS_ACTIVE).set(self.sessions.len() as f64);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
