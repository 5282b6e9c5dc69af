//! Which part of the message log is replayed to the completion service.
//!
//! History restored from a previous visit stays on screen but is not sent
//! again: the window starts after it until the user explicitly interacts.

use lettera_core::{ChatMessage, HistoryTurn, Role};
use lettera_letter::{is_draft_confirmation, strip_sentinels};

/// Prefix of the synthetic turn that re-injects the current draft.
pub const PREVIOUS_DRAFT_PREFIX: &str = "[Previously generated letter/document]: ";

/// How much of the draft must already appear in the window to skip re-injection.
const DRAFT_PROBE_CHARS: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextWindow {
    start: usize,
    explicitly_set: bool,
}

impl ContextWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// A window restored from storage. Not considered explicitly set for
    /// this session.
    pub fn restored(start: usize) -> Self {
        Self {
            start,
            explicitly_set: false,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn is_explicit(&self) -> bool {
        self.explicitly_set
    }

    /// Called after the message list changes. Keeps `start <= len` and moves
    /// the window past restored history. Returns whether `start` changed.
    pub fn on_render(&mut self, len: usize) -> bool {
        let before = self.start;
        if self.start > len {
            self.start = len;
        }
        if self.start == 0 && len > 0 && !self.explicitly_set {
            self.start = len;
        }
        self.start != before
    }

    /// The user interacted; stop auto-advancing.
    pub fn mark_explicit(&mut self) {
        self.explicitly_set = true;
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.explicitly_set = true;
    }

    /// Whether `messages` has no user turn inside the window yet.
    pub fn is_first_message(&self, messages: &[ChatMessage]) -> bool {
        !self.slice(messages).iter().any(ChatMessage::is_user)
    }

    /// History for the next request: the windowed log plus the outgoing
    /// user turn, then the current draft if the window no longer shows it.
    pub fn build(&self, messages: &[ChatMessage], outgoing: &str, draft: &str) -> Vec<HistoryTurn> {
        let mut turns: Vec<HistoryTurn> = self
            .slice(messages)
            .iter()
            .map(HistoryTurn::from)
            .chain(std::iter::once(HistoryTurn::new(Role::User, outgoing)))
            .filter(|turn| !is_draft_confirmation(&turn.content))
            .map(|turn| HistoryTurn::new(turn.role, strip_sentinels(&turn.content)))
            .collect();

        let draft = draft.trim();
        if !draft.is_empty() {
            let probe: String = draft.chars().take(DRAFT_PROBE_CHARS).collect();
            if !turns.iter().any(|turn| turn.content.contains(&probe)) {
                turns.push(HistoryTurn::new(
                    Role::Assistant,
                    format!("{PREVIOUS_DRAFT_PREFIX}{draft}"),
                ));
            }
        }
        turns
    }

    fn slice<'a>(&self, messages: &'a [ChatMessage]) -> &'a [ChatMessage] {
        &messages[self.start.min(messages.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lettera_core::Language;
    use lettera_letter::patterns;

    fn user(text: &str) -> ChatMessage {
        ChatMessage::user(text, Utc::now())
    }

    fn assistant(text: &str) -> ChatMessage {
        ChatMessage::assistant(text, Utc::now())
    }

    #[test]
    fn restored_history_is_inert() {
        let mut window = ContextWindow::new();
        assert!(window.on_render(4));
        assert_eq!(window.start(), 4);

        let log = vec![user("a"), assistant("b"), user("c"), assistant("d")];
        let turns = window.build(&log, "nuova domanda", "");
        assert_eq!(turns, vec![HistoryTurn::new(Role::User, "nuova domanda")]);
        assert!(window.is_first_message(&log));
    }

    #[test]
    fn explicit_window_stays_put() {
        let mut window = ContextWindow::new();
        window.mark_explicit();
        assert!(!window.on_render(1));
        assert_eq!(window.start(), 0);
    }

    #[test]
    fn start_is_clamped() {
        let mut window = ContextWindow::restored(9);
        window.mark_explicit();
        assert!(window.on_render(3));
        assert_eq!(window.start(), 3);
        assert!(window.on_render(0));
        assert_eq!(window.start(), 0);
    }

    #[test]
    fn pointer_never_exceeds_len() {
        let mut window = ContextWindow::restored(2);
        for len in [5, 1, 7, 0, 3] {
            window.on_render(len);
            assert!(window.start() <= len);
        }
    }

    #[test]
    fn clear_resets_and_pins() {
        let mut window = ContextWindow::restored(6);
        window.clear();
        assert_eq!(window.start(), 0);
        assert!(window.is_explicit());
        assert!(!window.on_render(2));
    }

    #[test]
    fn confirmations_dropped_and_sentinels_stripped() {
        let window = ContextWindow::new();
        let confirmation = patterns(Language::It).draft_confirmation;
        let log = vec![
            user("scrivi al comune"),
            assistant("---LETTERA---\nSpett.le Comune,\n---FINE LETTERA---"),
            assistant(confirmation),
        ];
        let turns = window.build(&log, "grazie", "");
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].content, "Spett.le Comune,");
        assert!(turns.iter().all(|t| t.content != confirmation));
        assert!(!window.is_first_message(&log));
    }

    #[test]
    fn draft_reinjected_when_out_of_window() {
        let draft = "Spett.le Ufficio Tributi,\ncon la presente chiedo l'annullamento dell'avviso.";
        let window = ContextWindow::restored(2);
        let log = vec![user("aiuto"), assistant(draft)];

        let turns = window.build(&log, "rendila più formale", draft);
        let last = turns.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, format!("{PREVIOUS_DRAFT_PREFIX}{draft}"));
    }

    #[test]
    fn draft_not_duplicated_when_visible() {
        let draft = "Gentile Direttore,\nle scrivo per segnalare un disservizio.";
        let window = ContextWindow::new();
        let log = vec![user("aiuto"), assistant(draft)];
        let turns = window.build(&log, "ok", draft);
        assert_eq!(turns.len(), 3);
        assert!(turns.iter().all(|t| !t.content.starts_with(PREVIOUS_DRAFT_PREFIX)));
    }
}
