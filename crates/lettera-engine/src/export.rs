//! Ways a finished draft leaves the app: clipboard, print view, `mailto:`
//! link and the "save to case" payload.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lettera_core::{ChatMessage, Clock, ConversationId, Draft, Language};
use lettera_letter::{patterns, subject_of};
use lettera_store::TtlCache;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// RFC 3986 unreserved characters pass through; everything else is encoded.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const ADDRESS: &AsciiSet = &QUERY_VALUE.remove(b'@').remove(b'+').remove(b',');

const DEFAULT_TITLE: &str = "Lettera";

const PRINT_CSS: &str = "body{font-family:Georgia,serif;max-width:42em;margin:3em auto;line-height:1.5}\
p{margin:0 0 1em}@media print{body{margin:0}}";

/// A `mailto:` link for the draft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MailtoLink {
    Complete(String),
    /// The body did not fit; the caller should copy the draft to the
    /// clipboard and show `hint`.
    BodyOmitted { url: String, hint: &'static str },
}

impl MailtoLink {
    pub fn url(&self) -> &str {
        match self {
            Self::Complete(url) | Self::BodyOmitted { url, .. } => url,
        }
    }
}

/// Conversation handed over to a case file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseMigrationPayload {
    pub messages: Vec<ChatMessage>,
    pub draft_text: String,
    pub saved_at: DateTime<Utc>,
}

impl CaseMigrationPayload {
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self)
            .map_err(|e| EngineError::Internal(format!("case payload encoding: {e}")))
    }
}

/// Export surfaces over a non-empty draft.
#[derive(Clone, Debug)]
pub struct DraftExport {
    draft: String,
    messages: Vec<ChatMessage>,
    language: Language,
}

impl DraftExport {
    /// `None` unless the draft was extracted in this session. A draft read
    /// back from storage keeps every export disabled.
    pub fn new(draft: &Draft, messages: &[ChatMessage], language: Language) -> Option<Self> {
        if !draft.generated_this_session || draft.is_empty() {
            return None;
        }
        Some(Self {
            draft: draft.text.trim().to_string(),
            messages: messages.to_vec(),
            language,
        })
    }

    pub fn subject(&self) -> Option<String> {
        subject_of(&self.draft)
    }

    pub fn clipboard_text(&self) -> String {
        self.draft
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Standalone HTML page suitable for the browser's print dialog.
    pub fn printable_html(&self) -> String {
        let title = escape_html(&self.subject().unwrap_or_else(|| DEFAULT_TITLE.to_string()));
        let mut body = String::new();
        let mut paragraph: Vec<String> = Vec::new();
        for line in self.draft.lines().chain(std::iter::once("")) {
            if line.trim().is_empty() {
                if !paragraph.is_empty() {
                    body.push_str("<p>");
                    body.push_str(&paragraph.join("<br>\n"));
                    body.push_str("</p>\n");
                    paragraph.clear();
                }
            } else {
                paragraph.push(escape_html(line.trim_end()));
            }
        }
        format!(
            "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{title}</title>\n<style>{PRINT_CSS}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
            lang = self.language.code(),
        )
    }

    /// `mailto:` link with subject and body, falling back to a body-less
    /// link when the full URL would exceed `max_len` bytes.
    pub fn mailto(&self, to: &str, max_len: usize) -> MailtoLink {
        let mut url = format!("mailto:{}", utf8_percent_encode(to.trim(), ADDRESS));
        let mut separator = '?';
        if let Some(subject) = self.subject() {
            url.push(separator);
            url.push_str("subject=");
            url.extend(utf8_percent_encode(&subject, QUERY_VALUE));
            separator = '&';
        }

        let body = self.draft.replace("\r\n", "\n").replace('\n', "\r\n");
        let full = format!(
            "{url}{separator}body={}",
            utf8_percent_encode(&body, QUERY_VALUE)
        );
        if full.len() <= max_len {
            MailtoLink::Complete(full)
        } else {
            MailtoLink::BodyOmitted {
                url,
                hint: patterns(self.language).mailto_paste_hint,
            }
        }
    }

    pub fn case_payload(&self, saved_at: DateTime<Utc>) -> CaseMigrationPayload {
        CaseMigrationPayload {
            messages: self.messages.clone(),
            draft_text: self.draft.clone(),
            saved_at,
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remembers which conversations declined the "save to case" offer.
pub struct SaveOffer {
    declined: TtlCache<ConversationId, ()>,
}

impl SaveOffer {
    const CAPACITY: usize = 64;

    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            declined: TtlCache::new(ttl, Self::CAPACITY, clock),
        }
    }

    /// Offer once a draft has been generated in this session, unless the
    /// user already said no for this conversation.
    pub fn should_offer(&self, conversation: &ConversationId, draft: &Draft) -> bool {
        draft.generated_this_session && !draft.is_empty() && !self.declined.contains(conversation)
    }

    pub fn decline(&self, conversation: &ConversationId) {
        self.declined.insert(conversation.clone(), ());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use lettera_core::ManualClock;

    const DRAFT: &str = "Spett.le Comune di Bologna,\n\n\
        Oggetto: Rimborso TARI & interessi\n\n\
        chiedo il rimborso <entro 30 giorni>.\n\n\
        Cordiali saluti\nMario Rossi";

    fn export() -> DraftExport {
        let messages = vec![ChatMessage::user("scrivi", Utc::now())];
        DraftExport::new(&Draft::generated(DRAFT), &messages, Language::It).unwrap()
    }

    #[test]
    fn no_draft_no_export() {
        assert!(DraftExport::new(&Draft::default(), &[], Language::It).is_none());
        assert!(DraftExport::new(&Draft::generated("  \n"), &[], Language::It).is_none());
    }

    #[test]
    fn restored_draft_does_not_export() {
        assert!(DraftExport::new(&Draft::restored(DRAFT), &[], Language::It).is_none());
        assert!(DraftExport::new(&Draft::generated(DRAFT), &[], Language::It).is_some());
    }

    #[test]
    fn clipboard_trims_trailing_space() {
        let draft = Draft::generated("Gentile Anna,   \nciao \n");
        let export = DraftExport::new(&draft, &[], Language::It).unwrap();
        assert_eq!(export.clipboard_text(), "Gentile Anna,\nciao");
    }

    #[test]
    fn printable_html_escapes_and_paragraphs() {
        let html = export().printable_html();
        assert!(html.contains("<html lang=\"it\">"));
        assert!(html.contains("<title>Rimborso TARI &amp; interessi</title>"));
        assert!(html.contains("<p>chiedo il rimborso &lt;entro 30 giorni&gt;.</p>"));
        assert!(html.contains("<p>Cordiali saluti<br>\nMario Rossi</p>"));
        assert_eq!(html.matches("<p>").count(), 4);
    }

    #[test]
    fn mailto_encodes_subject_and_body() {
        let link = export().mailto("ufficio.tributi@comune.bo.it", 4000);
        let MailtoLink::Complete(url) = link else {
            panic!("expected full link");
        };
        assert!(url.starts_with("mailto:ufficio.tributi@comune.bo.it?subject=Rimborso%20TARI%20%26%20interessi&body="));
        assert!(url.contains("Spett.le%20Comune%20di%20Bologna%2C%0D%0A%0D%0AOggetto"));
        assert!(!url.contains(' '));
    }

    #[test]
    fn long_mailto_drops_body() {
        let link = export().mailto("a@b.it", 120);
        match &link {
            MailtoLink::BodyOmitted { url, hint } => {
                assert!(!url.contains("body="));
                assert!(url.len() <= 120);
                assert_eq!(*hint, patterns(Language::It).mailto_paste_hint);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
        assert!(link.url().starts_with("mailto:a@b.it?subject="));
    }

    #[test]
    fn case_payload_wire_shape() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let payload = export().case_payload(at);
        let json: serde_json::Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        assert_eq!(json["draftText"], DRAFT);
        assert_eq!(json["savedAt"], "2026-03-02T09:30:00Z");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn declined_offer_expires() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let clock = Arc::new(ManualClock::new(tz.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()));
        let offers = SaveOffer::new(Duration::from_secs(3600), clock.clone());
        let conversation = ConversationId::new();
        let draft = Draft::generated(DRAFT);

        assert!(offers.should_offer(&conversation, &draft));
        assert!(!offers.should_offer(&conversation, &Draft::restored(DRAFT)));

        offers.decline(&conversation);
        assert!(!offers.should_offer(&conversation, &draft));
        assert!(offers.should_offer(&ConversationId::new(), &draft));

        clock.advance(chrono::Duration::minutes(61));
        assert!(offers.should_offer(&conversation, &draft));
    }
}
