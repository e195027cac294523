//! Hangul detection — the content-language gate for the whole pipeline.
//!
//! The downstream image API accepts English booru-style tags only, so any
//! Korean text that survives sanitization is a bug. This module is the single
//! predicate every other stage uses to enforce that.

/// Returns true if `text` contains at least one Hangul character.
///
/// Covers syllables, jamo, compatibility jamo and the extended jamo blocks.
/// Empty input returns false.
pub fn contains_hangul(text: &str) -> bool {
    text.chars().any(is_hangul)
}

fn is_hangul(c: char) -> bool {
    matches!(
        c,
        '\u{AC00}'..='\u{D7A3}' // syllables
            | '\u{1100}'..='\u{11FF}' // jamo
            | '\u{3130}'..='\u{318F}' // compatibility jamo
            | '\u{A960}'..='\u{A97F}' // jamo extended-A
            | '\u{D7B0}'..='\u{D7FF}' // jamo extended-B
    )
}
