//! Character matching — decides which registry characters are relevant to a
//! scene, from caller hints plus textual mentions.

use crate::registry::{Character, CharacterRegistry, MatchedCharacter};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Scan `text` and the hint list against the registry and return the ordered
/// set of characters relevant to this scene.
///
/// Hints are trusted context (e.g. the current speaker) and are force-included
/// whether or not the text mentions them; unknown hint names are kept with
/// their literal name and empty appearance tags. Registry characters are then
/// tested for mention in the lowered text, in registry order.
pub fn match_characters(
    text: &str,
    hints: &[String],
    registry: &dyn CharacterRegistry,
) -> Vec<MatchedCharacter> {
    let mut matched = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for hint in hints {
        let hint = hint.trim();
        if hint.is_empty() {
            continue;
        }
        let canonical = resolve_hint(hint, registry.characters())
            .map(|c| c.name.clone())
            .unwrap_or_else(|| hint.to_string());
        if !seen.insert(canonical.to_lowercase()) {
            continue;
        }
        let appearance_tags = registry.appearance_tags(&canonical).unwrap_or_default();
        matched.push(MatchedCharacter {
            name: canonical,
            appearance_tags,
        });
    }

    let lowered = text.to_lowercase();
    for character in registry.characters() {
        if character.name.is_empty() || seen.contains(&character.name.to_lowercase()) {
            continue;
        }
        if character_mentioned(&lowered, character) {
            seen.insert(character.name.to_lowercase());
            let appearance_tags = registry
                .appearance_tags(&character.name)
                .unwrap_or_default();
            matched.push(MatchedCharacter {
                name: character.name.clone(),
                appearance_tags,
            });
        }
    }

    matched
}

/// Exact case-insensitive hint resolution against name/display_name/sub_name.
fn resolve_hint<'a>(hint: &str, characters: &'a [Character]) -> Option<&'a Character> {
    let wanted = hint.to_lowercase();
    characters.iter().find(|c| {
        c.name.to_lowercase() == wanted
            || c.display_name
                .as_deref()
                .is_some_and(|d| d.to_lowercase() == wanted)
            || c.sub_name
                .as_deref()
                .is_some_and(|s| s.to_lowercase() == wanted)
    })
}

fn character_mentioned(lowered_text: &str, character: &Character) -> bool {
    let names = [
        Some(character.name.as_str()),
        character.display_name.as_deref(),
        character.sub_name.as_deref(),
    ];
    names
        .into_iter()
        .flatten()
        .filter(|n| !n.trim().is_empty())
        .any(|name| name_mentioned(lowered_text, &name.to_lowercase()))
}

/// Word-boundary match for plain alphanumeric/underscore names (so "Al" does
/// not match inside "Alice"); substring containment for everything else,
/// which covers spaced names and Korean names that have no word boundaries.
fn name_mentioned(lowered_text: &str, lowered_name: &str) -> bool {
    let is_word_like = lowered_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_word_like {
        word_boundary_regex(lowered_name).is_match(lowered_text)
    } else {
        lowered_text.contains(lowered_name)
    }
}

/// Per-name compiled patterns, cached across calls. `Regex` clones share the
/// compiled program, so handing out clones is cheap.
fn word_boundary_regex(lowered_name: &str) -> Regex {
    static CACHE: Lazy<Mutex<HashMap<String, Regex>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));
    let mut cache = CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    cache
        .entry(lowered_name.to_string())
        .or_insert_with(|| {
            // The name is escaped, so the pattern is always valid.
            Regex::new(&format!(r"\b{}\b", regex::escape(lowered_name))).unwrap()
        })
        .clone()
}
