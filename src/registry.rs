//! Character registry types — the read-only contact data this pipeline
//! consumes and the derived per-invocation structures built from it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A known character as supplied by the external contact registry.
///
/// `appearance_tags` is an opaque, pre-formatted comma-separated string; the
/// pipeline never parses its internal structure, only validates that it is
/// free of Korean before it reaches the final prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub sub_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub appearance_tags: Option<String>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_appearance(mut self, tags: impl Into<String>) -> Self {
        self.appearance_tags = Some(tags.into());
        self
    }

    pub fn with_display_name(mut self, display: impl Into<String>) -> Self {
        self.display_name = Some(display.into());
        self
    }

    pub fn with_sub_name(mut self, sub: impl Into<String>) -> Self {
        self.sub_name = Some(sub.into());
        self
    }
}

/// A character selected for the current scene. Ephemeral — lives only for
/// one pipeline invocation. `name` is never empty and entries are deduped
/// case-insensitively by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedCharacter {
    pub name: String,
    pub appearance_tags: String,
}

/// Lowercased character name → trimmed appearance-tag string.
///
/// Built once per invocation and shared by reference; never mutated after
/// construction.
pub type AppearanceVarMap = HashMap<String, String>;

// ── Registry seam ──────────────────────────────────────

/// Interface to the external contact registry: the character list plus a
/// name → appearance-tags lookup.
pub trait CharacterRegistry: Send + Sync {
    fn characters(&self) -> &[Character];

    /// Case-insensitive appearance lookup by any of a character's names.
    fn appearance_tags(&self, name: &str) -> Option<String> {
        let wanted = name.trim().to_lowercase();
        self.characters()
            .iter()
            .find(|c| {
                c.name.to_lowercase() == wanted
                    || c.display_name
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase() == wanted)
                    || c.sub_name
                        .as_deref()
                        .is_some_and(|s| s.to_lowercase() == wanted)
            })
            .and_then(|c| c.appearance_tags.clone())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Owned, in-memory registry implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    characters: Vec<Character>,
}

impl InMemoryRegistry {
    pub fn new(characters: Vec<Character>) -> Self {
        Self { characters }
    }
}

impl CharacterRegistry for InMemoryRegistry {
    fn characters(&self) -> &[Character] {
        &self.characters
    }
}

/// Build the per-invocation variable map from the registry plus any hint
/// names the caller supplied (e.g. the current speaker).
pub fn build_var_map(registry: &dyn CharacterRegistry, hints: &[String]) -> AppearanceVarMap {
    let mut map = AppearanceVarMap::new();
    for character in registry.characters() {
        if let Some(tags) = &character.appearance_tags {
            let tags = tags.trim();
            if !tags.is_empty() {
                map.insert(character.name.to_lowercase(), tags.to_string());
            }
        }
    }
    for hint in hints {
        let key = hint.trim().to_lowercase();
        if key.is_empty() || map.contains_key(&key) {
            continue;
        }
        if let Some(tags) = registry.appearance_tags(hint) {
            map.insert(key, tags);
        }
    }
    map
}
