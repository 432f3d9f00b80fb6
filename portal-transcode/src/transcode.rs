//! Literal table plus the three contextual reordering passes.
use crate::rules::{
    GlyphMapping, ANUSVARA, NUKTA, PRE_BASE_I, PRE_BASE_I_NASAL, RA, REPH, VIRAMA, VOWEL_SIGN_I,
};

/// Convert Kruti Dev glyph text to Unicode Devanagari.
///
/// Never fails. The table rewrites every Latin letter, so text that is not
/// Kruti Dev comes back garbled; callers that are unsure should go through
/// [`crate::autoconvert`] instead.
pub fn transcode(text: &str) -> String {
    transcode_with(&GlyphMapping::krutidev(), text)
}

pub fn transcode_with(mapping: &GlyphMapping, text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let literal = mapping.apply(text);
    let mut chars: Vec<char> = literal.chars().collect();

    relocate_pre_base(&mut chars, PRE_BASE_I, &[VOWEL_SIGN_I]);
    relocate_pre_base(&mut chars, PRE_BASE_I_NASAL, &[VOWEL_SIGN_I, ANUSVARA]);
    relocate_reph(&mut chars);
    clean_virama(&mut chars);

    chars.into_iter().collect()
}

/// Move a pre-base marker to after the consonant it precedes, emitting
/// `signs` in its place. When that consonant is the head of a conjunct
/// (`C ् C ...`) the signs land after the whole cluster. A nukta stays
/// with its consonant.
///
/// Runs until no marker remains; every iteration removes one marker.
fn relocate_pre_base(chars: &mut Vec<char>, marker: char, signs: &[char]) {
    while let Some(pos) = chars.iter().position(|&c| c == marker) {
        let start = pos + 1;
        let next = chars.get(start).copied();

        match next {
            Some(c) if !c.is_whitespace() => {
                let mut end = skip_nukta(chars, start + 1);
                while chars.get(end) == Some(&VIRAMA) && chars.get(end + 1).is_some() {
                    end = skip_nukta(chars, end + 2);
                }
                let cluster: Vec<char> = chars[start..end].to_vec();
                chars.splice(
                    pos..end,
                    cluster.into_iter().chain(signs.iter().copied()),
                );
            }
            _ => {
                chars.splice(pos..start, signs.iter().copied());
            }
        }
    }
}

/// Rewrite every reph marker as `र्` placed before the syllable it trails,
/// walking left over the vowel signs already attached to that syllable.
fn relocate_reph(chars: &mut Vec<char>) {
    while let Some(pos) = chars.iter().position(|&c| c == REPH) {
        let mut insert_at = pos;
        while insert_at > 0 && is_vowel_sign(chars[insert_at - 1]) {
            insert_at -= 1;
        }
        if insert_at > 0 && chars[insert_at - 1] == NUKTA {
            insert_at -= 1;
        }
        if insert_at > 0 {
            insert_at -= 1;
        }
        chars.remove(pos);
        chars.splice(insert_at..insert_at, [RA, VIRAMA]);
    }
}

fn skip_nukta(chars: &[char], at: usize) -> usize {
    if chars.get(at) == Some(&NUKTA) {
        at + 1
    } else {
        at
    }
}

/// Drop virama artefacts: doubled, before an independent vowel, before
/// whitespace.
fn clean_virama(chars: &mut Vec<char>) {
    let mut out = Vec::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == VIRAMA {
            match chars.get(i + 1) {
                Some(&next) if next == VIRAMA => continue,
                Some(&next) if is_independent_vowel(next) => continue,
                Some(&next) if next.is_whitespace() => continue,
                _ => {}
            }
        }
        out.push(c);
    }
    *chars = out;
}

pub(crate) fn is_vowel_sign(c: char) -> bool {
    matches!(c, '\u{093E}'..='\u{094C}' | '\u{0901}'..='\u{0903}')
}

fn is_independent_vowel(c: char) -> bool {
    matches!(c, '\u{0904}'..='\u{0914}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_base_marker_swaps_with_next_consonant() {
        assert_eq!(transcode("fd;k"), "किया");
    }

    #[test]
    fn pre_base_marker_lands_after_conjunct() {
        assert_eq!(transcode("fLFkr"), "स्थित");
    }

    #[test]
    fn nasal_pre_base_marker_adds_anusvara() {
        assert_eq!(transcode("Çlg"), "सिंह");
        assert_eq!(transcode("Çlg"), transcode("flag"));
    }

    #[test]
    fn reph_moves_past_vowel_signs() {
        assert_eq!(transcode("ikVhZ"), "पार्टी");
    }

    #[test]
    fn nukta_stays_with_its_consonant() {
        assert_eq!(transcode("fQ+"), "\u{92b}\u{93c}\u{93f}");
        assert_eq!(transcode("M+hZ"), "\u{930}\u{94d}\u{921}\u{93c}\u{940}");
    }

    #[test]
    fn reph_before_bare_consonant() {
        assert_eq!(transcode("deZ"), "कर्म");
    }

    #[test]
    fn trailing_markers_do_not_panic() {
        assert_eq!(transcode("f"), "\u{093F}");
        assert_eq!(transcode("Z"), "र्");
        assert_eq!(transcode("d f"), "क \u{093F}");
    }

    #[test]
    fn virama_cleanup() {
        assert_eq!(transcode("D x"), "क ग");
        let mut chars: Vec<char> = "क््ष".chars().collect();
        clean_virama(&mut chars);
        assert_eq!(chars.into_iter().collect::<String>(), "क्ष");
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(transcode(""), "");
    }
}
