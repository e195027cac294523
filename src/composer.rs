//! Final prompt composition — merges sanitized scene tags with appearance
//! groups into the weighted output string.

use crate::language::contains_hangul;
use tracing::warn;

/// Compose the final weighted prompt string.
///
/// Scene tags pass a last Korean guard (defense in depth; dirty input is
/// treated as empty). Each appearance group is validated independently: for
/// `"Name: tags"` shaped groups only the part after the first colon is
/// checked, since names may be in any script. Valid groups are wrapped in
/// square brackets. A positive weight wraps the scene as `weight::tags::`.
pub fn compose(scene_tags: &str, appearance_groups: &[String], weight: f32) -> String {
    let scene = scene_tags.trim();
    let scene = if contains_hangul(scene) {
        warn!("discarding scene tags with untranslated Korean at composition");
        ""
    } else {
        scene
    };

    let mut parts: Vec<String> = Vec::new();
    if !scene.is_empty() {
        if weight > 0.0 {
            parts.push(format!("{}::{}::", weight, scene));
        } else {
            parts.push(scene.to_string());
        }
    }

    for group in appearance_groups {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }
        let checked = match group.split_once(':') {
            Some((_name, tags)) => tags,
            None => group,
        };
        if contains_hangul(checked) {
            warn!("dropping appearance group with untranslated Korean: {}", group);
            continue;
        }
        parts.push(format!("[{}]", group));
    }

    parts.join(", ")
}
