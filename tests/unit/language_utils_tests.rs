/*!
 * Tests for language utility functions
 */

use subgate::language_utils::{
    LanguageMatch, canonical_language_code, language_code_from_name, normalize_to_part1_or_part2t,
    normalize_to_part2t,
};

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("eng").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");

    // Case insensitivity
    assert_eq!(normalize_to_part2t("EN").unwrap(), "eng");

    // Whitespace
    assert_eq!(normalize_to_part2t(" es ").unwrap(), "spa");

    assert!(normalize_to_part2t("xx").is_none());
    assert!(normalize_to_part2t("english").is_none());
}

#[test]
fn test_normalize_to_part1_or_part2t_shouldPreferTwoLetterCodes() {
    assert_eq!(normalize_to_part1_or_part2t("eng").unwrap(), "en");
    assert_eq!(normalize_to_part1_or_part2t("ger").unwrap(), "de");
    assert_eq!(normalize_to_part1_or_part2t("pt").unwrap(), "pt");
}

#[test]
fn test_canonical_language_code_withUnknownCode_shouldLowercase() {
    assert_eq!(canonical_language_code("EN"), "en");
    assert_eq!(canonical_language_code("spa"), "es");
    assert_eq!(canonical_language_code("pt-BR"), "pt-br");
    assert_eq!(canonical_language_code(""), "");
}

#[test]
fn test_language_code_from_name_withSiteNames_shouldResolve() {
    assert_eq!(language_code_from_name("English").as_deref(), Some("en"));
    assert_eq!(language_code_from_name("French (Canadian)").as_deref(), Some("fr"));
    assert_eq!(language_code_from_name("Greek").as_deref(), Some("el"));
    assert_eq!(language_code_from_name("Farsi/Persian"), None);
    assert_eq!(language_code_from_name(""), None);
}

#[test]
fn test_languageMatch_substring_shouldMatchInsideName() {
    let requested = vec!["en".to_string()];
    assert!(LanguageMatch::Substring.matches(&requested, "English"));
    assert!(!LanguageMatch::Substring.matches(&requested, "German"));
    assert!(!LanguageMatch::Substring.matches(&[], "English"));
}

#[test]
fn test_languageMatch_name_shouldCompareResolvedCodes() {
    let requested = vec!["spa".to_string()];
    assert!(LanguageMatch::Name.matches(&requested, "Spanish (Latin America)"));
    assert!(!LanguageMatch::Name.matches(&requested, "English"));
    assert!(!LanguageMatch::Name.matches(&requested, "Klingon"));
}
