//! Languages and their plural rules.
//!
//! Plural handling across the engine is driven by a named rule enum instead
//! of raw integers; the wire values (`msgstr[n]` indices, `_pl_<n>`
//! placeholder suffixes) only appear at the format edges. Each language
//! carries the ordered list of rules its plural forms use, derived from a
//! curated CLDR-style table of common locales.

use std::collections::BTreeMap;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;

/// One CLDR plural category, in the fixed wire order `0..=5`.
///
/// `Other` doubles as the singular default: every non-pluralized translation
/// is stored under it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PluralRule {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralRule {
    /// The wire value of this rule (0–5).
    pub fn number(self) -> u8 {
        match self {
            PluralRule::Zero => 0,
            PluralRule::One => 1,
            PluralRule::Two => 2,
            PluralRule::Few => 3,
            PluralRule::Many => 4,
            PluralRule::Other => 5,
        }
    }

    /// Maps a wire value back to a rule.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(PluralRule::Zero),
            1 => Some(PluralRule::One),
            2 => Some(PluralRule::Two),
            3 => Some(PluralRule::Few),
            4 => Some(PluralRule::Many),
            5 => Some(PluralRule::Other),
            _ => None,
        }
    }
}

impl Default for PluralRule {
    fn default() -> Self {
        PluralRule::Other
    }
}

impl std::fmt::Display for PluralRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A language the engine can import from or compile for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Normalized language code (e.g. `en`, `pt-br`, `sr`).
    pub code: String,

    /// The ordered plural rules of this language's forms.
    pub rules: Vec<PluralRule>,
}

impl Language {
    pub fn new(code: impl Into<String>, rules: Vec<PluralRule>) -> Self {
        Language {
            code: code.into(),
            rules,
        }
    }

    /// The ordered plural rules used by this language.
    pub fn plural_rules(&self) -> &[PluralRule] {
        &self.rules
    }

    /// The number of plural forms this language uses.
    pub fn nplurals(&self) -> usize {
        self.rules.len()
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s)
    }
}

lazy_static! {
    /// Static mapping from base language subtag to the ordered plural rules
    /// of the language (CLDR-style, cardinals).
    static ref RULE_TABLE: BTreeMap<&'static str, Vec<PluralRule>> = {
        use PluralRule::*;
        let mut m: BTreeMap<&'static str, Vec<PluralRule>> = BTreeMap::new();

        // One/Other (most Indo-European languages without complex rules)
        for code in [
            "en", "de", "nl", "sv", "da", "nb", "nn", "no", "is", "fi", "et", "fa", "hi",
            "bn", "gu", "ta", "te", "kn", "ml", "mr", "it", "es", "pt", "mk", "el", "eu",
            "gl", "af", "sw", "ur", "fil", "tl", "tr", "id", "ms", "fr", "hy", "kab",
            "ca", "hu", "sq", "bg", "yi",
        ] {
            m.insert(code, vec![One, Other]);
        }

        // Only Other (East/Southeast Asian common cases)
        for code in ["ja", "zh", "ko", "th", "vi", "km", "lo", "my", "yue"] {
            m.insert(code, vec![Other]);
        }

        // Slavic (Russian group)
        for code in ["ru", "uk", "be", "sr", "hr", "bs", "sh"] {
            m.insert(code, vec![One, Few, Many, Other]);
        }

        // Polish
        m.insert("pl", vec![One, Few, Many, Other]);

        // Czech/Slovak
        for code in ["cs", "sk"] {
            m.insert(code, vec![One, Few, Other]);
        }

        // Slovenian
        m.insert("sl", vec![One, Two, Few, Other]);

        // Lithuanian
        m.insert("lt", vec![One, Few, Other]);

        // Latvian
        m.insert("lv", vec![Zero, One, Other]);

        // Irish Gaelic
        m.insert("ga", vec![One, Two, Few, Many, Other]);

        // Romanian
        m.insert("ro", vec![One, Few, Other]);

        // Arabic
        m.insert("ar", vec![Zero, One, Two, Few, Many, Other]);

        // Hebrew
        m.insert("he", vec![One, Two, Many, Other]);

        m
    };

    /// Legacy and alternate codes accepted on lookup.
    static ref ALIASES: BTreeMap<&'static str, &'static str> = {
        let mut m = BTreeMap::new();
        m.insert("iw", "he");
        m.insert("in", "id");
        m.insert("ji", "yi");
        m
    };
}

/// Looks up a language by code or alias.
///
/// Accepts underscores for hyphens (`pt_BR`), strips `@modifier` suffixes
/// (`sr@latin`), and falls back to the base language subtag when the full
/// code is not in the table. Fails with [`Error::UnknownLanguage`] otherwise.
pub fn lookup(code_or_alias: &str) -> Result<Language, Error> {
    let normalized = code_or_alias.trim().replace('_', "-").to_ascii_lowercase();
    let without_modifier = match normalized.find('@') {
        Some(pos) => &normalized[..pos],
        None => normalized.as_str(),
    };

    let resolve = |code: &str| -> Option<Language> {
        let code = ALIASES.get(code).copied().unwrap_or(code);
        RULE_TABLE
            .get(code)
            .map(|rules| Language::new(code, rules.clone()))
    };

    if let Some(language) = resolve(without_modifier) {
        return Ok(language);
    }

    // Fall back to the base subtag of a region-qualified code.
    if let Ok(id) = without_modifier.parse::<LanguageIdentifier>() {
        if let Some(language) = resolve(id.language.as_str()) {
            return Ok(language);
        }
    }

    tracing::warn!(code = code_or_alias, "unknown language requested");
    Err(Error::UnknownLanguage(code_or_alias.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_numbers_round_trip() {
        for n in 0..=5 {
            let rule = PluralRule::from_number(n).unwrap();
            assert_eq!(rule.number(), n);
        }
        assert!(PluralRule::from_number(6).is_none());
    }

    #[test]
    fn test_default_rule_is_other() {
        assert_eq!(PluralRule::default(), PluralRule::Other);
    }

    #[test]
    fn test_lookup_basic() {
        let en = lookup("en").unwrap();
        assert_eq!(en.code, "en");
        assert_eq!(en.nplurals(), 2);

        let ar = lookup("ar").unwrap();
        assert_eq!(ar.nplurals(), 6);
        assert_eq!(ar.plural_rules()[0], PluralRule::Zero);

        let ja = lookup("ja").unwrap();
        assert_eq!(ja.plural_rules(), &[PluralRule::Other]);
    }

    #[test]
    fn test_lookup_aliases_and_normalization() {
        assert_eq!(lookup("iw").unwrap().code, "he");
        assert_eq!(lookup("pt_BR").unwrap().code, "pt");
        assert_eq!(lookup("sr_RS@latin").unwrap().code, "sr");
        assert_eq!(lookup("EN").unwrap().code, "en");
    }

    #[test]
    fn test_lookup_unknown_fails() {
        assert!(matches!(
            lookup("zz-invalid"),
            Err(Error::UnknownLanguage(_))
        ));
    }

    #[test]
    fn test_russian_rules_ordered() {
        let ru = lookup("ru").unwrap();
        assert_eq!(
            ru.plural_rules(),
            &[
                PluralRule::One,
                PluralRule::Few,
                PluralRule::Many,
                PluralRule::Other
            ]
        );
    }
}
