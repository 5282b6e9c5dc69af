//! Redundant, best-effort persistence of the live conversation.
//!
//! Each piece of state lives in its own slot so a corrupt value only loses
//! that slot. Nothing here returns an error to the caller: storage failures
//! are logged and the conversation keeps running on in-memory state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lettera_core::{ChatMessage, Clock, RecoverySnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::kv::{read_json, write_json, KeyValueStore};

/// Storage slot names.
pub mod keys {
    pub const MESSAGES: &str = "lettera.messages";
    pub const DRAFT: &str = "lettera.draft";
    pub const CONTEXT_START: &str = "lettera.context_start";
    pub const RECOVERY: &str = "lettera.recovery";
    /// Owned by the rate-limit tracker; survives `clear_all`.
    pub const SESSION: &str = "lettera.session";

    pub const CONVERSATION_SLOTS: [&str; 4] = [MESSAGES, DRAFT, CONTEXT_START, RECOVERY];
}

/// Borrowed view of the in-memory state at startup.
#[derive(Clone, Copy, Debug)]
pub struct LiveView<'a> {
    pub messages: &'a [ChatMessage],
    pub draft_text: &'a str,
    pub pending_input: &'a str,
}

impl LiveView<'_> {
    fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.draft_text.trim().is_empty()
            && self.pending_input.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The snapshot should replace the (empty) live state.
    Restored(RecoverySnapshot),
    /// Live state was non-empty and was left alone.
    SkippedLiveState,
    NoSnapshot,
    /// Restore already ran for this instance.
    AlreadyRan,
}

pub struct PersistenceLayer {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    restore_ran: AtomicBool,
}

impl PersistenceLayer {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            restore_ran: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    pub fn load_messages(&self) -> Vec<ChatMessage> {
        self.load(keys::MESSAGES).unwrap_or_default()
    }

    pub fn save_messages(&self, messages: &[ChatMessage]) {
        self.save(keys::MESSAGES, messages);
    }

    pub fn load_draft(&self) -> String {
        self.load(keys::DRAFT).unwrap_or_default()
    }

    pub fn save_draft(&self, text: &str) {
        if text.is_empty() {
            self.remove(keys::DRAFT);
        } else {
            self.save(keys::DRAFT, text);
        }
    }

    pub fn load_context_start(&self) -> usize {
        self.load(keys::CONTEXT_START).unwrap_or(0)
    }

    pub fn save_context_start(&self, start: usize) {
        self.save(keys::CONTEXT_START, &start);
    }

    pub fn load_snapshot(&self) -> Option<RecoverySnapshot> {
        self.load(keys::RECOVERY)
    }

    /// Write the recovery snapshot. Called on every mutation.
    pub fn save_snapshot(&self, messages: &[ChatMessage], draft_text: &str, pending_input: &str) {
        let snapshot = RecoverySnapshot {
            updated_at: self.clock.now_utc(),
            pending_input: pending_input.to_string(),
            draft_text: draft_text.to_string(),
            messages: messages.to_vec(),
        };
        self.save(keys::RECOVERY, &snapshot);
    }

    /// Adopt the recovery snapshot when the live state is empty.
    ///
    /// Runs at most once per instance; later calls return `AlreadyRan`.
    #[instrument(skip_all)]
    pub fn restore_from_snapshot(&self, live: LiveView<'_>) -> RestoreOutcome {
        if self.restore_ran.swap(true, Ordering::SeqCst) {
            return RestoreOutcome::AlreadyRan;
        }
        let Some(snapshot) = self.load_snapshot() else {
            return RestoreOutcome::NoSnapshot;
        };
        if snapshot.is_empty() {
            return RestoreOutcome::NoSnapshot;
        }
        if !live.is_empty() {
            debug!("live state present, snapshot ignored");
            return RestoreOutcome::SkippedLiveState;
        }
        info!(
            messages = snapshot.messages.len(),
            has_draft = !snapshot.draft_text.trim().is_empty(),
            "restored conversation from recovery snapshot"
        );
        RestoreOutcome::Restored(snapshot)
    }

    /// Remove every conversation slot. The rate-limit slot is kept.
    #[instrument(skip(self))]
    pub fn clear_all(&self) {
        for key in keys::CONVERSATION_SLOTS {
            self.remove(key);
        }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match read_json(self.store.as_ref(), key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "failed to read slot");
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = write_json(self.store.as_ref(), key, value) {
            warn!(key, error = %e, "failed to write slot");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "failed to remove slot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use chrono::{FixedOffset, TimeZone, Utc};
    use lettera_core::ManualClock;

    fn msg(text: &str) -> ChatMessage {
        ChatMessage::user(text, Utc::now())
    }

    fn clock() -> Arc<ManualClock> {
        let tz = FixedOffset::east_opt(3600).unwrap();
        Arc::new(ManualClock::new(tz.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()))
    }

    fn layer() -> (Arc<MemoryKvStore>, PersistenceLayer) {
        let store = Arc::new(MemoryKvStore::new());
        let layer = PersistenceLayer::new(store.clone(), clock());
        (store, layer)
    }

    const EMPTY: LiveView<'static> = LiveView {
        messages: &[],
        draft_text: "",
        pending_input: "",
    };

    #[test]
    fn slots_round_trip() {
        let (_, layer) = layer();
        layer.save_messages(&[msg("uno"), msg("due")]);
        layer.save_draft("Gentile Sindaco");
        layer.save_context_start(2);

        assert_eq!(layer.load_messages().len(), 2);
        assert_eq!(layer.load_draft(), "Gentile Sindaco");
        assert_eq!(layer.load_context_start(), 2);
    }

    #[test]
    fn write_failures_are_swallowed() {
        let (store, layer) = layer();
        store.set_fail_writes(true);
        layer.save_messages(&[msg("uno")]);
        layer.save_snapshot(&[msg("uno")], "", "");
        layer.clear_all();
        store.set_fail_writes(false);
        assert!(layer.load_messages().is_empty());
    }

    #[test]
    fn read_failures_yield_defaults() {
        let (store, layer) = layer();
        layer.save_context_start(3);
        store.set_fail_reads(true);
        assert_eq!(layer.load_context_start(), 0);
        assert!(layer.load_snapshot().is_none());
    }

    #[test]
    fn corrupt_slot_only_loses_that_slot() {
        let (store, layer) = layer();
        layer.save_draft("Egregio Avvocato");
        store.set(keys::MESSAGES, "not json").unwrap();
        assert!(layer.load_messages().is_empty());
        assert_eq!(layer.load_draft(), "Egregio Avvocato");
    }

    #[test]
    fn restore_adopts_snapshot_into_empty_state() {
        let (_, layer) = layer();
        layer.save_snapshot(&[msg("ciao")], "bozza", "sto scrivendo");
        match layer.restore_from_snapshot(EMPTY) {
            RestoreOutcome::Restored(snap) => {
                assert_eq!(snap.messages.len(), 1);
                assert_eq!(snap.draft_text, "bozza");
                assert_eq!(snap.pending_input, "sto scrivendo");
            }
            other => panic!("expected Restored, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_stamped_by_injected_clock() {
        let store = Arc::new(MemoryKvStore::new());
        let clock = clock();
        let layer = PersistenceLayer::new(store, clock.clone());

        layer.save_snapshot(&[msg("uno")], "", "");
        assert_eq!(
            layer.load_snapshot().unwrap().updated_at,
            Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
        );

        clock.advance(chrono::Duration::minutes(5));
        layer.save_snapshot(&[msg("uno")], "", "ancora");
        assert_eq!(
            layer.load_snapshot().unwrap().updated_at,
            Utc.with_ymd_and_hms(2026, 3, 2, 8, 5, 0).unwrap()
        );
    }

    #[test]
    fn restore_never_clobbers_live_state() {
        let (_, layer) = layer();
        layer.save_snapshot(&[msg("vecchio")], "", "");
        let live = [msg("nuovo")];
        let outcome = layer.restore_from_snapshot(LiveView {
            messages: &live,
            draft_text: "",
            pending_input: "",
        });
        assert_eq!(outcome, RestoreOutcome::SkippedLiveState);
    }

    #[test]
    fn restore_runs_once() {
        let (_, layer) = layer();
        assert_eq!(layer.restore_from_snapshot(EMPTY), RestoreOutcome::NoSnapshot);
        layer.save_snapshot(&[msg("dopo")], "", "");
        assert_eq!(layer.restore_from_snapshot(EMPTY), RestoreOutcome::AlreadyRan);
    }

    #[test]
    fn clear_all_keeps_rate_limit_slot() {
        let (store, layer) = layer();
        layer.save_messages(&[msg("uno")]);
        layer.save_draft("bozza");
        layer.save_context_start(1);
        layer.save_snapshot(&[msg("uno")], "bozza", "");
        store.set(keys::SESSION, r#"{"messageCount":4}"#).unwrap();

        layer.clear_all();
        assert_eq!(store.len(), 1);
        assert!(store.get(keys::SESSION).unwrap().is_some());
    }
}
