//! Kruti Dev 010 to Unicode Devanagari transcoding.
//!
//! Portal remarks are frequently typed in the Kruti Dev font, which stores
//! Hindi as Latin-1 glyph bytes in visual order. Recovering logical Unicode
//! takes an ordered literal table ([`rules`]) followed by three reordering
//! passes ([`transcode`]): the pre-base short-i sign, its nasalised variant,
//! and the reph.
//!
//! [`classify`] guesses whether a string needs converting at all, and
//! [`autoconvert`] combines the two. Because converted text no longer looks
//! like Kruti Dev, `autoconvert` is idempotent.
//!
//! ```
//! use portal_transcode::{autoconvert, TranscodedText};
//!
//! assert_eq!(autoconvert(";g ,d ijh{kk gS"), "यह एक परीक्षा है");
//! assert_eq!(autoconvert("Approved by JE"), "Approved by JE");
//!
//! let audited = TranscodedText::auto("dk;Z iwoZ gS");
//! assert!(audited.converted);
//! assert_eq!(audited.original, "dk;Z iwoZ gS");
//! ```
use serde::{Deserialize, Serialize};

pub mod classify;
pub mod rules;
pub mod transcode;

pub use classify::classify;
pub use rules::GlyphMapping;
pub use transcode::{transcode, transcode_with};

/// [`transcode`] when [`classify`] says the text is Kruti Dev, otherwise the
/// input unchanged.
pub fn autoconvert(text: &str) -> String {
    if classify(text) {
        transcode(text)
    } else {
        text.to_string()
    }
}

/// Converted text together with its source, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodedText {
    pub text: String,
    pub original: String,
    pub converted: bool,
}

impl TranscodedText {
    pub fn auto(input: &str) -> Self {
        let converted = classify(input);
        let text = if converted {
            transcode(input)
        } else {
            input.to_string()
        };
        Self {
            text,
            original: input.to_string(),
            converted,
        }
    }

    /// The source text, only when conversion changed something.
    pub fn original_if_changed(&self) -> Option<&str> {
        (self.converted && self.text != self.original).then_some(self.original.as_str())
    }
}
