//! Formal-letter detection and extraction over multilingual assistant replies.
//!
//! All language knowledge lives in [`patterns`]; the detector and extractor
//! iterate that table without per-language code paths.

pub mod detector;
pub mod extractor;
pub mod patterns;

pub use detector::{has_sentinel_pair, LetterDetector, LetterSignals, DEFAULT_MIN_LETTER_CHARS};
pub use extractor::{looks_like_summary, LetterExtractor, DEFAULT_FALLBACK_MIN_CHARS};
pub use patterns::{
    is_draft_confirmation, needs_legal_sources, patterns, strip_sentinels, subject_of,
    LanguagePatterns, SENTINELS,
};
