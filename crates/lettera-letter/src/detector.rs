use crate::patterns::{CLOSER_LINE, OPENER_LINE, SENTINELS, SUBJECT_LINE};

/// Default minimum length (in characters) for heuristic classification.
pub const DEFAULT_MIN_LETTER_CHARS: usize = 250;

/// The three independent heuristic signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LetterSignals {
    pub opening: bool,
    pub closing: bool,
    pub subject: bool,
}

impl LetterSignals {
    pub fn count(&self) -> usize {
        usize::from(self.opening) + usize::from(self.closing) + usize::from(self.subject)
    }
}

/// Classifies whether an assistant reply contains a formal letter.
#[derive(Clone, Copy, Debug)]
pub struct LetterDetector {
    min_length: usize,
}

impl Default for LetterDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LETTER_CHARS)
    }
}

impl LetterDetector {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Sentinel pair wins outright; otherwise two of three signals plus length.
    pub fn is_letter(&self, text: &str) -> bool {
        if has_sentinel_pair(text) {
            return true;
        }
        self.signals(text).count() >= 2 && text.chars().count() > self.min_length
    }

    pub fn signals(&self, text: &str) -> LetterSignals {
        let mut signals = LetterSignals::default();
        for line in text.lines() {
            signals.opening |= OPENER_LINE.is_match(line);
            signals.closing |= CLOSER_LINE.is_match(line);
            signals.subject |= SUBJECT_LINE.is_match(line);
            if signals.count() == 3 {
                break;
            }
        }
        signals
    }
}

/// Byte range of the text between the first opening sentinel and its
/// matching close, if both are present in order.
pub(crate) fn sentinel_span(text: &str) -> Option<(usize, usize)> {
    SENTINELS
        .iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)? + open.len();
            let end = text[start..].find(close)? + start;
            Some((start, end))
        })
        .min_by_key(|(start, _)| *start)
}

pub fn has_sentinel_pair(text: &str) -> bool {
    sentinel_span(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITALIAN_LETTER: &str = "Oggetto: Richiesta di rimborso\n\n\
        Gentile Direttore,\n\n\
        con la presente desidero segnalare che il servizio di trasporto non è stato erogato \
        nei giorni indicati nel mio abbonamento mensile, nonostante il regolare pagamento. \
        Chiedo pertanto il rimborso della quota corrispondente entro trenta giorni.\n\n\
        Cordiali saluti\nMario Rossi";

    #[test]
    fn sentinels_win_regardless_of_signals() {
        let detector = LetterDetector::default();
        assert!(detector.is_letter("---LETTERA---\nciao\n---FINE LETTERA---"));
        assert!(detector.is_letter("x ---LETTER--- y ---END LETTER--- z"));
        assert_eq!(detector.signals("---LETTERA---\nciao\n---FINE LETTERA---").count(), 0);
    }

    #[test]
    fn unmatched_sentinels_fall_back_to_heuristics() {
        let detector = LetterDetector::default();
        assert!(!detector.is_letter("---LETTERA---\nciao"));
        assert!(!detector.is_letter("---FINE LETTERA--- prima ---LETTERA---"));
    }

    #[test]
    fn two_signals_and_length() {
        let detector = LetterDetector::default();
        let signals = detector.signals(ITALIAN_LETTER);
        assert_eq!(
            signals,
            LetterSignals {
                opening: true,
                closing: true,
                subject: true
            }
        );
        assert!(detector.is_letter(ITALIAN_LETTER));
    }

    #[test]
    fn greeting_alone_is_not_a_letter() {
        let detector = LetterDetector::default();
        let reply = format!("Gentile utente, {}", "grazie per la domanda. ".repeat(20));
        assert_eq!(detector.signals(&reply).count(), 1);
        assert!(!detector.is_letter(&reply));
    }

    #[test]
    fn short_text_with_signals_is_rejected() {
        let detector = LetterDetector::default();
        let short = "Dear John,\nthanks.\nKind regards\nAnn";
        assert_eq!(detector.signals(short).count(), 2);
        assert!(!detector.is_letter(short));
        assert!(LetterDetector::new(10).is_letter(short));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let body = "è".repeat(120);
        let text = format!("Sehr geehrte Frau Weber,\n{body}\nMit freundlichen Grüßen");
        // 240 bytes of accents, but only ~170 characters
        assert!(text.len() > 250);
        assert!(!LetterDetector::default().is_letter(&text));
    }
}
