//! The ordered literal rewrite table for Kruti Dev 010 glyph text.
//!
//! Each entry is applied as a global literal replace over the output of the
//! previous entry. Order is load-bearing: multi-byte sequences sit ahead of
//! the single bytes they contain (`vks` before `vk` before `v`, `Fk` before
//! `F`, every consonant-plus-`k` form before the bare `k` vowel sign), and
//! the late punctuation entries emit characters whose own rules have already
//! run (`¾` becomes `=` only after `=` has been rewritten).
//!
//! The marker bytes `f`, `Ç` and `Z` are deliberately absent; they are
//! handled by the contextual passes in [`crate::transcode`].

/// Pre-base short-i marker: glyph sits before the consonant it follows.
pub const PRE_BASE_I: char = 'f';
/// Pre-base short-i with nasalisation.
pub const PRE_BASE_I_NASAL: char = 'Ç';
/// Reph: half-ra drawn after the syllable it precedes.
pub const REPH: char = 'Z';

pub const VIRAMA: char = '\u{094D}';
/// Dot below; belongs to the consonant it follows.
pub const NUKTA: char = '\u{093C}';
pub const VOWEL_SIGN_I: char = '\u{093F}';
pub const ANUSVARA: char = '\u{0902}';
pub const RA: char = '\u{0930}';

/// An ordered list of (legacy sequence, Unicode sequence) pairs.
#[derive(Debug, Clone, Copy)]
pub struct GlyphMapping {
    rules: &'static [(&'static str, &'static str)],
}

impl GlyphMapping {
    /// The built-in Kruti Dev 010 table.
    pub const fn krutidev() -> Self {
        Self {
            rules: KRUTIDEV_RULES,
        }
    }

    pub fn rules(&self) -> &'static [(&'static str, &'static str)] {
        self.rules
    }

    /// Run every rule, in order, as a global literal replace.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (legacy, unicode) in self.rules {
            if out.contains(legacy) {
                out = out.replace(legacy, unicode);
            }
        }
        out
    }
}

impl Default for GlyphMapping {
    fn default() -> Self {
        Self::krutidev()
    }
}

#[rustfmt::skip]
const KRUTIDEV_RULES: &[(&str, &str)] = &[
    // word processors curl the ' and " keys; fold them back before the
    // consonant rules read them as sha and ssa
    ("ñ", "॰"), ("‘", "'"), ("’", "'"), ("“", "\""), ("”", "\""),
    ("å", "०"), ("ƒ", "१"), ("„", "२"), ("…", "३"), ("†", "४"),
    ("‡", "५"), ("ˆ", "६"), ("‰", "७"), ("Š", "८"), ("‹", "९"),

    // nukta forms
    ("¶+", "फ़्"), ("d+", "क़"), ("[+k", "ख़"), ("[+", "ख़्"), ("x+", "ग़"),
    ("T+", "ज़्"), ("t+", "ज़"), ("M+", "ड़"), ("<+", "ढ़"), ("Q+", "फ़"),
    (";+", "य़"), ("j+", "ऱ"), ("u+", "ऩ"),

    // ligatures and conjuncts
    ("Ùk", "त्त"), ("Ù", "त्त्"), ("ä", "क्त"), ("–", "दृ"), ("—", "कृ"),
    ("é", "न्न"), ("™", "न्न्"), ("à", "ह्न"), ("á", "ह्य"), ("â", "हृ"),
    ("ã", "ह्म"), ("ºz", "ह्र"), ("º", "ह्"), ("í", "द्द"), ("{k", "क्ष"),
    ("{", "क्ष्"), ("=", "त्र"), ("«", "त्र्"), ("Nî", "छ्य"), ("Vî", "ट्य"),
    ("Bî", "ठ्य"), ("Mî", "ड्य"), ("<î", "ढ्य"), ("|", "द्य"), ("K", "ज्ञ"),
    ("}", "द्व"), ("J", "श्र"), ("Vª", "ट्र"), ("Mª", "ड्र"), ("<ª", "ढ्र"),
    ("Nª", "छ्र"), ("Ø", "क्र"), ("Ý", "फ्र"), ("æ", "द्र"), ("ç", "प्र"),
    ("Á", "प्र"), ("xz", "ग्र"), ("#", "रु"), (":", "रू"),

    // independent vowels
    ("v‚", "ऑ"), ("vks", "ओ"), ("vkS", "औ"), ("vk", "आ"), ("v", "अ"),
    ("b±", "ईं"), ("Ã", "ई"), ("bZ", "ई"), ("b", "इ"), ("m", "उ"),
    ("Å", "ऊ"), (",s", "ऐ"), (",", "ए"), ("_", "ऋ"),

    // reph carrying a mark; the reph itself is placed later
    ("±", "Zं"), ("Ê", "ीZ"),

    // consonants, full forms ahead of half forms
    ("ô", "क्क"), ("d", "क"), ("Dk", "क"), ("D", "क्"), ("[k", "ख"),
    ("[", "ख्"), ("x", "ग"), ("Xk", "ग"), ("X", "ग्"), ("Ä", "घ"),
    ("?k", "घ"), ("?", "घ्"), ("³", "ङ"), ("pkS", "चै"), ("p", "च"),
    ("Pk", "च"), ("P", "च्"), ("N", "छ"), ("t", "ज"), ("Tk", "ज"),
    ("T", "ज्"), (">", "झ"), ("÷", "झ्"), ("¥", "ञ"), ("ê", "ट्ट"),
    ("ë", "ट्ठ"), ("V", "ट"), ("B", "ठ"), ("ì", "ड्ड"), ("ï", "ड्ढ"),
    ("M", "ड"), ("<", "ढ"), (".k", "ण"), (".", "ण्"), ("r", "त"),
    ("Rk", "त"), ("R", "त्"), ("Fk", "थ"), ("F", "थ्"), (")", "द्ध"),
    ("n", "द"), ("/k", "ध"), ("èk", "ध"), ("/", "ध्"), ("è", "ध्"),
    ("u", "न"), ("Uk", "न"), ("U", "न्"), ("i", "प"), ("Ik", "प"),
    ("I", "प्"), ("Q", "फ"), ("¶", "फ्"), ("c", "ब"), ("Ck", "ब"),
    ("C", "ब्"), ("Hk", "भ"), ("H", "भ्"), ("e", "म"), ("Ek", "म"),
    ("E", "म्"), (";", "य"), ("¸", "य्"), ("j", "र"), ("y", "ल"),
    ("Yk", "ल"), ("Y", "ल्"), ("G", "ळ"), ("o", "व"), ("Ok", "व"),
    ("O", "व्"), ("'k", "श"), ("'", "श्"), ("\"k", "ष"), ("\"", "ष्"),
    ("l", "स"), ("Lk", "स"), ("L", "स्"), ("g", "ह"),

    // ligature glyphs from the extended range
    ("È", "ीं"), ("z", "्र"), ("Ì", "द्द"), ("Í", "ट्ट"), ("Î", "ट्ठ"),
    ("Ï", "ड्ड"), ("Ñ", "कृ"), ("Ò", "भ"), ("Ó", "्य"), ("Ô", "ड्ढ"),
    ("Ö", "झ्"), ("Ük", "श"), ("Ü", "श्"),

    // dependent vowel signs and modifiers
    ("‚", "ॉ"), ("ks", "ो"), ("kS", "ौ"), ("k", "ा"), ("h", "ी"),
    ("q", "ु"), ("w", "ू"), ("`", "ृ"), ("s", "े"), ("S", "ै"),
    ("a", "ं"), ("¡", "ँ"), ("%", "ः"), ("W", "ॅ"), ("•", "ऽ"),
    ("·", "ऽ"), ("∙", "ऽ"), ("~", "्"), ("+", "़"),

    // punctuation remapped onto bytes freed above
    ("\\", "?"), ("^", "‘"), ("*", "’"), ("Þ", "“"), ("ß", "”"),
    ("(", ";"), ("¼", "("), ("½", ")"), ("¿", "{"), ("À", "}"),
    ("¾", "="), ("A", "।"), ("-", "."), ("&", "-"), ("Œ", "॰"),
    ("]", ","), ("@", "/"),

    // half form followed by the aa sign is the full form
    ("्ा", ""),
];
