use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"[[:punct:]]+").expect("valid regex");
}

/// Normalize a text blob for indexing: NFKC normalization, every punctuation
/// run replaced by a single space, whitespace collapsed, lowercased.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let nfkc = text.nfkc().collect::<String>();
    let without_punct = PUNCTUATION.replace_all(&nfkc, " ");
    without_punct
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split normalized text into tokens. Empty, whitespace-only and
/// punctuation-only input yields an empty sequence.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}
