use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::ChatMessage;

/// Daily usage counter, owned by the rate-limit tracker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub message_count: u32,
    #[serde(default)]
    pub first_message_at: Option<DateTime<Utc>>,
    /// Local calendar date (`YYYY-MM-DD`) the counter belongs to.
    #[serde(default)]
    pub date_key: Option<String>,
}

/// The export-ready letter text.
///
/// `generated_this_session` is only ever set by a successful extraction in the
/// running conversation. A draft read back from storage starts with it unset,
/// which keeps export actions disabled until the user produces a letter again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub text: String,
    pub generated_this_session: bool,
}

impl Draft {
    pub fn restored(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            generated_this_session: false,
        }
    }

    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            generated_this_session: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.generated_this_session = false;
    }
}

/// Denormalized copy of the live conversation used only for crash recovery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySnapshot {
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub pending_input: String,
    #[serde(default)]
    pub draft_text: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl RecoverySnapshot {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.draft_text.trim().is_empty()
            && self.pending_input.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn draft_flags() {
        let restored = Draft::restored("Spett.le Comune");
        assert!(!restored.generated_this_session);
        assert!(!restored.is_empty());

        let mut generated = Draft::generated("Gentile Direttore");
        assert!(generated.generated_this_session);
        generated.clear();
        assert!(generated.is_empty());
        assert!(!generated.generated_this_session);
    }

    #[test]
    fn whitespace_draft_is_empty() {
        assert!(Draft::restored("  \n\t").is_empty());
    }

    #[test]
    fn session_state_wire_shape() {
        let state = SessionState {
            message_count: 3,
            first_message_at: Some(Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()),
            date_key: Some("2026-01-05".into()),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["messageCount"], 3);
        assert_eq!(json["dateKey"], "2026-01-05");

        let legacy: SessionState = serde_json::from_str(r#"{"messageCount":7}"#).unwrap();
        assert_eq!(legacy.message_count, 7);
        assert!(legacy.first_message_at.is_none());
        assert!(legacy.date_key.is_none());
    }

    #[test]
    fn snapshot_emptiness() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let mut snap = RecoverySnapshot {
            updated_at: at,
            pending_input: String::new(),
            draft_text: " ".into(),
            messages: Vec::new(),
        };
        assert!(snap.is_empty());
        snap.pending_input = "bozza".into();
        assert!(!snap.is_empty());
    }
}
