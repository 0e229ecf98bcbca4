//! Language utilities for reconciling provider language vocabularies
//!
//! Upstreams disagree on how languages are spelled: OpenSubtitles and SubDL use
//! two-letter codes, BSPlayer three-letter ISO 639-2 codes, SubSource and
//! Addic7ed English language names. These helpers convert between them.

use isolang::Language;
use serde::{Deserialize, Serialize};

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("dut", "nld"),
    ("fre", "fra"),
    ("geo", "kat"),
    ("ger", "deu"),
    ("gre", "ell"),
    ("ice", "isl"),
    ("mac", "mkd"),
    ("may", "msa"),
    ("per", "fas"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// English names used by subtitle sites whose ISO name is spelled differently
const NAME_ALIASES: &[(&str, &str)] = &[
    ("greek", "el"),
    ("farsi", "fa"),
    ("norwegian", "no"),
    ("chinese", "zh"),
];

fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    PART2B_TO_PART2T
        .iter()
        .find(|(part2b, _)| *part2b == code)
        .map(|(_, part2t)| *part2t)
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Option<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code).map(|lang| lang.to_639_3().to_string()),
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                Some(normalized_code)
            } else {
                part2b_to_part2t(&normalized_code).map(str::to_string)
            }
        }
        _ => None,
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Option<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)?;
    Some(lang.to_639_1().map(str::to_string).unwrap_or(part2t))
}

/// Canonical lowercase code for whatever an upstream put in its language field
///
/// Known ISO codes are folded to their two-letter form, anything else is
/// returned lowercased as-is (e.g. `pt-br`).
pub fn canonical_language_code(raw: &str) -> String {
    let trimmed = raw.trim();
    normalize_to_part1_or_part2t(trimmed).unwrap_or_else(|| trimmed.to_lowercase())
}

/// Resolve an English language name such as `"Portuguese (Brazilian)"` to a code
pub fn language_code_from_name(name: &str) -> Option<String> {
    let base = name.split('(').next().unwrap_or_default().trim().to_lowercase();
    if base.is_empty() {
        return None;
    }

    if let Some((_, code)) = NAME_ALIASES.iter().find(|(alias, _)| *alias == base) {
        return Some(code.to_string());
    }

    // isolang stores names capitalized
    let mut chars = base.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => return None,
    };

    Language::from_name(&capitalized)
        .map(|lang| lang.to_639_1().map(str::to_string).unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// How a provider's language name is matched against requested codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageMatch {
    /// A requested code matches when it is contained in the language name
    #[default]
    Substring,
    /// The language name is resolved to a code that must equal a requested code
    Name,
}

impl LanguageMatch {
    /// Whether `language_name` satisfies any of the requested codes
    pub fn matches(&self, requested: &[String], language_name: &str) -> bool {
        match self {
            Self::Substring => {
                let name = language_name.to_lowercase();
                requested.iter().any(|code| name.contains(&code.to_lowercase()))
            }
            Self::Name => match language_code_from_name(language_name) {
                Some(code) => requested
                    .iter()
                    .any(|requested_code| canonical_language_code(requested_code) == code),
                None => false,
            },
        }
    }
}
