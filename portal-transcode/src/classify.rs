//! Heuristic detection of Kruti Dev text.
//!
//! There is no reliable way to tell glyph-encoded Hindi from Latin text; this
//! looks for very common function words as they appear in the legacy
//! encoding. False positives and negatives are expected.

/// Share of Devanagari code points above which text counts as converted,
/// expressed as a ratio `NUMERATOR / DENOMINATOR`.
pub const DEVANAGARI_SHARE: (usize, usize) = (3, 10);

/// Postpositions, copulas and conjunctions in their Kruti Dev spelling.
pub const LEGACY_MARKERS: &[&str] = &[
    "dk",    // का
    "dh",    // की
    "ds",    // के
    "dks",   // को
    "esa",   // में
    "ls",    // से
    "ij",    // पर
    "gS",    // है
    "gSa",   // हैं
    "Fkk",   // था
    "Fkh",   // थी
    "Fks",   // थे
    "vkSj",  // और
    "rFkk",  // तथा
    "fd",    // कि
    "Hkh",   // भी
    ";g",    // यह
    "tks",   // जो
    "fd;k",  // किया
    "x;k",   // गया
];

/// True iff `text` looks like Kruti Dev rather than Unicode or plain Latin.
pub fn classify(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    if devanagari_exceeds_share(text) {
        return false;
    }
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != ';'))
        .any(|token| is_marker(token) || is_marker(token.trim_end_matches(LEGACY_PUNCTUATION)))
}

/// Danda and comma as Kruti Dev draws them; they cling to the word before.
const LEGACY_PUNCTUATION: [char; 2] = ['A', ']'];

fn is_marker(token: &str) -> bool {
    LEGACY_MARKERS.contains(&token)
}

fn devanagari_exceeds_share(text: &str) -> bool {
    let mut total = 0usize;
    let mut devanagari = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if is_devanagari(c) {
            devanagari += 1;
        }
    }
    let (num, den) = DEVANAGARI_SHARE;
    total > 0 && devanagari * den > total * num
}

pub(crate) fn is_devanagari(c: char) -> bool {
    matches!(c, '\u{0900}'..='\u{097F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_legacy_function_words() {
        assert!(classify(";g ,d ijh{kk gS"));
        assert!(classify("vkosnu Lohd`r fd;k x;k"));
    }

    #[test]
    fn plain_english_is_not_legacy() {
        assert!(!classify("File forwarded to the section officer."));
        assert!(!classify(""));
        assert!(!classify("   "));
    }

    #[test]
    fn devanagari_share_above_threshold_wins_over_markers() {
        assert!(!classify("यह परीक्षा gS"));
    }

    #[test]
    fn exactly_thirty_percent_still_checks_markers() {
        // 3 Devanagari of 10 non-space characters.
        assert!(classify("राम gS abcde"));
    }

    #[test]
    fn punctuation_around_markers_is_ignored() {
        assert!(classify("(gS)"));
        assert!(classify("Report: ;g."));
    }

    #[test]
    fn trailing_danda_and_comma_are_stripped() {
        assert!(classify("dksbZ vkifÙk ugha gSA"));
        assert!(classify("vkosnu Lohd`r dk]"));
        assert!(!classify("USA"));
    }
}
