//! Settings type definitions.
//!
//! All types use camelCase JSON and `#[serde(default)]`, so a settings file
//! only needs the keys it wants to change.

use std::time::Duration;

use lettera_core::Language;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LetteraSettings {
    /// UI language used for synthetic messages and OCR hints.
    pub language: Language,
    pub rate_limit: RateLimitSettings,
    pub detector: DetectorSettings,
    pub extractor: ExtractorSettings,
    pub search: SearchSettings,
    pub session: SessionSettings,
    pub export: ExportSettings,
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

impl Default for LetteraSettings {
    fn default() -> Self {
        Self {
            language: Language::BASE,
            rate_limit: RateLimitSettings::default(),
            detector: DetectorSettings::default(),
            extractor: ExtractorSettings::default(),
            search: SearchSettings::default(),
            session: SessionSettings::default(),
            export: ExportSettings::default(),
            service: ServiceSettings::default(),
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl LetteraSettings {
    /// Reject values that would make the pipeline misbehave rather than merely be slow.
    pub fn validate(&self) -> crate::Result<()> {
        if self.rate_limit.daily_ceiling == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "rateLimit.dailyCeiling must be at least 1".into(),
            ));
        }
        if self.extractor.min_draft_chars > self.extractor.fallback_min_chars {
            return Err(crate::SettingsError::InvalidValue(
                "extractor.minDraftChars must not exceed extractor.fallbackMinChars".into(),
            ));
        }
        if self.search.timeout_ms == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "search.timeoutMs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitSettings {
    /// User messages per local day before further messages are blocked
    /// (only once a draft exists).
    pub daily_ceiling: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self { daily_ceiling: 20 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorSettings {
    /// Heuristic letter classification needs more than this many characters.
    pub min_letter_chars: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_letter_chars: 250,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractorSettings {
    /// Whole-text fallback only applies above this length.
    pub fallback_min_chars: usize,
    /// Shortest extraction accepted as a draft.
    pub min_draft_chars: usize,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            fallback_min_chars: 200,
            min_draft_chars: 80,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 8_000,
            max_results: 5,
        }
    }
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Conversation is wiped after this much inactivity.
    pub idle_timeout_secs: u64,
    /// How often the watchdog checks for inactivity.
    pub watchdog_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
            watchdog_interval_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    /// Longest `mailto:` URL produced before falling back to the clipboard.
    pub mailto_max_url_len: usize,
    /// How long a declined "save to case" offer stays declined.
    pub save_offer_ttl_secs: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            mailto_max_url_len: 1_800,
            save_offer_ttl_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceSettings {
    /// Base URL of the backend exposing `/chat`, `/ocr` and `/legal-search`.
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// OCR results are reused for identical uploads within this window.
    pub ocr_cache_ttl_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787/api".to_string(),
            request_timeout_ms: 90_000,
            ocr_cache_ttl_secs: 10 * 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// SQLite file backing the key-value slots. Empty means in-memory only.
    pub db_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: crate::loader::lettera_home()
                .join("database")
                .join("lettera.db")
                .to_string_lossy()
                .into_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = LetteraSettings::default();
        assert_eq!(s.language, Language::It);
        assert_eq!(s.rate_limit.daily_ceiling, 20);
        assert_eq!(s.detector.min_letter_chars, 250);
        assert_eq!(s.extractor.fallback_min_chars, 200);
        assert_eq!(s.search.timeout(), Duration::from_secs(8));
        assert_eq!(s.session.idle_timeout_secs, 1800);
        assert!(s.storage.db_path.ends_with("lettera.db"));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: LetteraSettings =
            serde_json::from_str(r#"{"language":"de","rateLimit":{"dailyCeiling":5}}"#).unwrap();
        assert_eq!(s.language, Language::De);
        assert_eq!(s.rate_limit.daily_ceiling, 5);
        assert_eq!(s.search.max_results, 5);
    }

    #[test]
    fn validate_rejects_zero_ceiling() {
        let mut s = LetteraSettings::default();
        s.rate_limit.daily_ceiling = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_lengths() {
        let mut s = LetteraSettings::default();
        s.extractor.min_draft_chars = 500;
        assert!(s.validate().is_err());
    }
}
