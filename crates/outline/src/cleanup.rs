//! Text normalization for merged lines.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Expansion of the Latin presentation-form ligatures (U+FB00..U+FB06).
fn expand_ligature(c: char) -> Option<&'static str> {
    Some(match c {
        '\u{FB00}' => "ff",
        '\u{FB01}' => "fi",
        '\u{FB02}' => "fl",
        '\u{FB03}' => "ffi",
        '\u{FB04}' => "ffl",
        '\u{FB05}' | '\u{FB06}' => "st",
        _ => return None,
    })
}

/// Characters that carry no text: replacement glyphs, soft hyphens and
/// non-whitespace control codes.
fn is_noise(c: char) -> bool {
    matches!(c, '\u{FFFD}' | '\u{00AD}') || (c.is_control() && !c.is_whitespace())
}

fn whitespace_runs() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Normalize the text of a merged line: NFC composition, ligatures spelled
/// out, noise characters dropped, whitespace collapsed and trimmed.
pub fn cleanup_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.nfc() {
        match expand_ligature(c) {
            Some(letters) => cleaned.push_str(letters),
            None if is_noise(c) => {}
            None => cleaned.push(c),
        }
    }
    whitespace_runs().replace_all(cleaned.trim(), " ").into_owned()
}

/// Case-insensitive form of already cleaned text, for equality checks.
pub fn comparison_key(text: &str) -> String {
    text.to_lowercase()
}
