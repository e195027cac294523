//! Inline reference resolution — expands `{{tag:Name}}` placeholders into
//! literal appearance text before the scene reaches the matcher or the LLM.

use crate::registry::AppearanceVarMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// Placeholder plus an optional Korean possessive fragment ("의 외모" etc.),
// which is consumed and discarded along with the reference.
static TAG_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{tag:([^{}]+)\}\}(?:의\s*\S*)?").unwrap());

/// Replace every `{{tag:Name}}` reference with the mapped appearance tags.
///
/// Names are looked up case-insensitively. Unresolved references substitute
/// to the empty string rather than erroring, so unmatched placeholders never
/// leak meaningless tokens into the generated prompt.
pub fn resolve_references(text: &str, var_map: &AppearanceVarMap) -> String {
    TAG_REF_RE
        .replace_all(text, |caps: &Captures| {
            let key = caps[1].trim().to_lowercase();
            var_map.get(&key).cloned().unwrap_or_default()
        })
        .into_owned()
}
