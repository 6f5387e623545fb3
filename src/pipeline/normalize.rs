//! Script-aware canonicalization of surface forms
//!
//! Hebrew words lose their cantillation (chant accents) but keep consonants
//! and vowel points. Greek words are never touched: breathing marks and
//! accents distinguish lexical forms.

use super::data::Script;
use unicode_normalization::UnicodeNormalization;

const MAQAF: char = '\u{05BE}';
const METEG: char = '\u{05BD}';
const PASEQ: char = '\u{05C0}';
const SOF_PASUQ: char = '\u{05C3}';
const NUN_HAFUKHA: char = '\u{05C6}';
const COMBINING_GRAPHEME_JOINER: char = '\u{034F}';

/// Punctuation stripped from a word before any lookup
const WORD_PUNCTUATION: &[char] = &['.', ',', ';', ':', '·', '\u{0387}', '\u{037E}', '(', ')'];

/// Canonical lookup key for a surface form
pub fn normalize(surface_text: &str, script: Script) -> String {
    match script {
        Script::Greek => surface_text.to_string(),
        Script::Hebrew => normalize_hebrew(surface_text),
    }
}

/// Whether `c` is a Hebrew cantillation mark (U+0591..=U+05AF)
pub fn is_cantillation(c: char) -> bool {
    ('\u{0591}'..='\u{05AF}').contains(&c)
}

fn normalize_hebrew(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    for c in word.nfd() {
        match c {
            c if is_cantillation(c) => {}
            METEG | COMBINING_GRAPHEME_JOINER => {}
            PASEQ | SOF_PASUQ | NUN_HAFUKHA => {}
            '-' | MAQAF => out.push(MAQAF),
            c => out.push(c),
        }
    }
    out.trim().to_string()
}

/// Strip sentence punctuation glued to a word
pub fn clean_punctuation(word: &str) -> String {
    word.chars()
        .filter(|c| !WORD_PUNCTUATION.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Canonical key used by every dictionary tier: punctuation removed, then
/// script normalization applied
pub fn canonical_key(surface_text: &str, script: Script) -> String {
    normalize(&clean_punctuation(surface_text), script)
}

/// Remove Latin/Greek combining diacritics (U+0300..=U+036F) after NFD
///
/// Only used as a last-resort glossary lookup variant; canonical keys keep
/// their diacritics.
pub fn strip_combining_marks(text: &str) -> String {
    text.nfd()
        .filter(|c| !('\u{0300}'..='\u{036F}').contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Hebrew ==========

    #[test]
    fn test_hebrew_cantillation_is_stripped() {
        // "the king" with zaqef qatan (U+0594) vs. bare pointed form
        let with_accent = "הַמֶּ֔לֶךְ";
        let bare = "הַמֶּלֶךְ";
        assert_eq!(normalize(with_accent, Script::Hebrew), normalize(bare, Script::Hebrew));
        assert!(!normalize(with_accent, Script::Hebrew).chars().any(is_cantillation));
    }

    #[test]
    fn test_hebrew_vowel_points_are_preserved() {
        let normalized = normalize("שָׁנָ֔ה", Script::Hebrew);
        assert!(normalized.contains('\u{05B8}')); // qamats
        assert!(normalized.contains('\u{05C1}')); // shin dot
        assert_eq!(normalized.chars().filter(|c| *c == 'נ').count(), 1);
    }

    #[test]
    fn test_hebrew_distinct_vowels_stay_distinct() {
        // Different vocalization is a different word
        assert_ne!(
            normalize("מֶלֶךְ", Script::Hebrew),
            normalize("מָלַךְ", Script::Hebrew)
        );
    }

    #[test]
    fn test_hebrew_maqaf_collapses() {
        assert_eq!(
            normalize("בְּנֵי-", Script::Hebrew),
            normalize("בְּנֵי־", Script::Hebrew)
        );
    }

    #[test]
    fn test_hebrew_paragraph_marks_and_paseq_dropped() {
        assert_eq!(normalize("כֹּ֣ה ׀", Script::Hebrew), normalize("כֹּה", Script::Hebrew));
        assert_eq!(normalize("הָאָֽרֶץ׃", Script::Hebrew), normalize("הָאָרֶץ", Script::Hebrew));
    }

    #[test]
    fn test_hebrew_normalization_is_idempotent() {
        let once = normalize("וַֽיַּחֲנ֖וּ", Script::Hebrew);
        assert_eq!(normalize(&once, Script::Hebrew), once);
    }

    // ========== Greek ==========

    #[test]
    fn test_greek_is_unchanged() {
        for word in ["λόγος", "ἐν", "ἀρχῇ", "Θεός", "ὁ"] {
            assert_eq!(normalize(word, Script::Greek), word);
        }
    }

    #[test]
    fn test_greek_accent_variants_stay_distinct() {
        assert_ne!(normalize("λόγος", Script::Greek), normalize("λογος", Script::Greek));
        assert_ne!(normalize("ἐν", Script::Greek), normalize("ἑν", Script::Greek));
    }

    // ========== Punctuation ==========

    #[test]
    fn test_clean_punctuation() {
        assert_eq!(clean_punctuation("λόγος,"), "λόγος");
        assert_eq!(clean_punctuation("(Θεός)"), "Θεός");
        assert_eq!(clean_punctuation("ἀρχῇ·"), "ἀρχῇ");
        assert_eq!(clean_punctuation("λόγος;"), "λόγος");
    }

    #[test]
    fn test_canonical_key_keeps_greek_accents() {
        assert_eq!(canonical_key("λόγος.", Script::Greek), "λόγος");
    }

    #[test]
    fn test_strip_combining_marks() {
        assert_eq!(strip_combining_marks("λόγος"), "λογος");
        assert_eq!(strip_combining_marks("plain"), "plain");
    }
}
