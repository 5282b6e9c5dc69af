use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// UI languages the pipeline classifies and answers in.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    It,
    En,
    De,
    Fr,
    Es,
    Pt,
    Ro,
    Pl,
}

impl Language {
    /// Language used when a per-language lookup has no entry.
    pub const BASE: Language = Language::It;

    pub const ALL: [Language; 8] = [
        Language::It,
        Language::En,
        Language::De,
        Language::Fr,
        Language::Es,
        Language::Pt,
        Language::Ro,
        Language::Pl,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::It => "it",
            Self::En => "en",
            Self::De => "de",
            Self::Fr => "fr",
            Self::Es => "es",
            Self::Pt => "pt",
            Self::Ro => "ro",
            Self::Pl => "pl",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::BASE
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    /// Accepts bare codes and BCP 47 tags (`de`, `de-AT`, `pt_BR`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == primary)
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_and_tags() {
        assert_eq!("it".parse::<Language>().unwrap(), Language::It);
        assert_eq!("DE-at".parse::<Language>().unwrap(), Language::De);
        assert_eq!("pt_BR".parse::<Language>().unwrap(), Language::Pt);
        assert!("xx".parse::<Language>().is_err());
        assert!("".parse::<Language>().is_err());
    }

    #[test]
    fn serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Language::Ro).unwrap(), r#""ro""#);
        let parsed: Language = serde_json::from_str(r#""pl""#).unwrap();
        assert_eq!(parsed, Language::Pl);
    }

    #[test]
    fn display_matches_code() {
        for lang in Language::ALL {
            assert_eq!(lang.to_string(), lang.code());
        }
    }

    #[test]
    fn base_is_default() {
        assert_eq!(Language::default(), Language::BASE);
    }
}
