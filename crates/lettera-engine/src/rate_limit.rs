//! Daily message counter backing the advisory send limit.
//!
//! The counter resets when the local calendar date changes, or when 24 hours
//! have passed since the first counted message, whichever comes first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use lettera_core::{Clock, SessionState};
use lettera_store::kv::{read_json, write_json};
use lettera_store::{keys, KeyValueStore};
use parking_lot::Mutex;
use tracing::{debug, warn};

const WINDOW_HOURS: i64 = 24;

pub struct RateLimitTracker {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// Last state we tried to write. Authoritative while storage is failing.
    memory: Mutex<Option<SessionState>>,
    degraded: AtomicBool,
}

impl RateLimitTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            memory: Mutex::new(None),
            degraded: AtomicBool::new(false),
        }
    }

    /// Current usage, with the reset policy applied (and persisted if it fired).
    pub fn read(&self) -> SessionState {
        let stored = self.load();
        match self.reset(&stored) {
            Some(fresh) => {
                debug!(
                    previous = stored.message_count,
                    date_key = ?fresh.date_key,
                    "message counter reset"
                );
                self.persist(&fresh);
                fresh
            }
            None => stored,
        }
    }

    /// Count one message and return the new total.
    pub fn increment(&self) -> u32 {
        let mut state = self.read();
        state.message_count = state.message_count.saturating_add(1);
        if state.first_message_at.is_none() {
            state.first_message_at = Some(self.clock.now_utc());
        }
        if state.date_key.is_none() {
            state.date_key = Some(self.clock.today_key());
        }
        self.persist(&state);
        state.message_count
    }

    /// Whether storage writes are currently failing and the in-process
    /// counter is being used instead.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn reset(&self, state: &SessionState) -> Option<SessionState> {
        let today = self.clock.today_key();
        if let Some(key) = &state.date_key {
            if *key != today {
                return Some(SessionState {
                    message_count: 0,
                    first_message_at: None,
                    date_key: Some(today),
                });
            }
        }
        let first = state.first_message_at?;
        (self.clock.now_utc() - first >= Duration::hours(WINDOW_HOURS))
            .then(SessionState::default)
    }

    fn load(&self) -> SessionState {
        if self.is_degraded() {
            return self.memory.lock().clone().unwrap_or_default();
        }
        match read_json::<SessionState>(self.store.as_ref(), keys::SESSION) {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to read message counter, using in-process value");
                self.memory.lock().clone().unwrap_or_default()
            }
        }
    }

    fn persist(&self, state: &SessionState) {
        *self.memory.lock() = Some(state.clone());
        match write_json(self.store.as_ref(), keys::SESSION, state) {
            Ok(()) => self.degraded.store(false, Ordering::Relaxed),
            Err(e) => {
                if !self.degraded.swap(true, Ordering::Relaxed) {
                    warn!(error = %e, "failed to persist message counter, counting in memory");
                }
            }
        }
    }
}

/// Sending is blocked only once the ceiling is reached *and* a draft already
/// exists, so every user can finish at least one document per period.
pub fn is_limited(state: &SessionState, ceiling: u32, draft_present: bool, exempt: bool) -> bool {
    !exempt && draft_present && state.message_count >= ceiling
}
