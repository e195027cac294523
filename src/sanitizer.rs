//! Response sanitization — turns noisy, possibly malformed model output into
//! a clean comma-separated tag string.
//!
//! The model is asked for a reasoning block followed by a final answer, but
//! nothing guarantees it complies. This pass strips the reasoning block,
//! markdown fences and pipe separators, isolates bracketed appearance blocks
//! from the language check, and drops any Korean that leaked into the scene
//! tags. It never fails; the worst case is an empty string.

use crate::language::contains_hangul;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

// Everything up to and including the last closing reasoning marker is
// discarded. Case-insensitive and whitespace-tolerant inside the tag.
static REASONING_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^.*<\s*/\s*img-gen\s*>").unwrap());

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9]*").unwrap());

static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\[\]]*\]").unwrap());

// Placeholder tokens use a private-use char so they survive comma splitting
// and cannot collide with model output.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new("\u{E000}(\\d+)\u{E000}").unwrap());

/// Sanitize raw model output into a normalized tag string.
///
/// Order matters: reasoning strip, fence/pipe normalization, leading-noise
/// trim, bracket masking, language check, then tag normalization. Bracket
/// content is excluded from the language check because character names may
/// legitimately be Korean even though tag content must not be.
pub fn sanitize(raw: &str) -> String {
    // 1. Drop the reasoning block, if any closing marker is present.
    let after_reasoning = REASONING_CLOSE_RE.replace(raw, "");

    // 2. Defensive normalization against alternate model formatting.
    let normalized = FENCE_RE.replace_all(&after_reasoning, "").replace('|', ",");

    // 3. Trim leading non-tag noise.
    let start = normalized
        .find(|c: char| c.is_alphanumeric() || c == '_' || c == '(' || c == '[');
    let trimmed = match start {
        Some(idx) => &normalized[idx..],
        None => return String::new(),
    };

    // 4. Mask bracketed appearance blocks so they skip the language check.
    let mut blocks: Vec<String> = Vec::new();
    let masked = BRACKET_RE.replace_all(trimmed, |caps: &Captures| {
        blocks.push(caps[0].to_string());
        format!("\u{E000}{}\u{E000}", blocks.len() - 1)
    });

    // 5. Korean in the non-bracket remainder poisons the scene tags entirely.
    if contains_hangul(&masked) {
        warn!("dropping scene tags: untranslated Korean in model output");
        return blocks.join(", ");
    }

    // 6. Split, restore blocks, normalize tag tokens, rejoin.
    let mut parts: Vec<String> = Vec::new();
    for segment in masked.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let piece = if TOKEN_RE.is_match(segment) {
            restore_segment(segment, &blocks)
        } else {
            normalize_tag(segment)
        };
        if !piece.is_empty() {
            parts.push(piece);
        }
    }
    parts.join(", ")
}

/// Split a sanitized answer into the scene-tag remainder and the inner texts
/// of its bracketed appearance blocks.
pub fn split_scene_and_groups(sanitized: &str) -> (String, Vec<String>) {
    let mut groups: Vec<String> = Vec::new();
    let remainder = BRACKET_RE.replace_all(sanitized, |caps: &Captures| {
        let inner = caps[0]
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim();
        if !inner.is_empty() {
            groups.push(inner.to_string());
        }
        String::new()
    });

    let scene = remainder
        .replace('|', ",")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    (scene, groups)
}

/// Restore bracket blocks in a segment, normalizing the plain text around
/// them. Block content itself is restored verbatim.
fn restore_segment(segment: &str, blocks: &[String]) -> String {
    let mut out = String::new();
    let mut last = 0;
    for token in TOKEN_RE.find_iter(segment) {
        push_part(&mut out, &normalize_tag(&segment[last..token.start()]));
        let block = token
            .as_str()
            .trim_matches('\u{E000}')
            .parse::<usize>()
            .ok()
            .and_then(|i| blocks.get(i).cloned())
            .unwrap_or_default();
        push_part(&mut out, &block);
        last = token.end();
    }
    push_part(&mut out, &normalize_tag(&segment[last..]));
    out
}

fn push_part(out: &mut String, part: &str) {
    if part.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(part);
}

/// Underscores become spaces; internal whitespace collapses to single spaces.
fn normalize_tag(segment: &str) -> String {
    segment
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reasoning_block_is_discarded() {
        let raw = "<img-gen>reasoning...</img-gen>\n1girl, cafe, indoor, [Alice: long hair, blue eyes]";
        assert_eq!(
            sanitize(raw),
            "1girl, cafe, indoor, [Alice: long hair, blue eyes]"
        );
    }

    #[test]
    fn closing_marker_is_case_and_space_tolerant() {
        let raw = "thinking</ IMG-GEN >\n1girl, park";
        assert_eq!(sanitize(raw), "1girl, park");
    }

    #[test]
    fn last_marker_wins_when_repeated() {
        let raw = "a</img-gen>noise</img-gen>\n1girl, beach";
        assert_eq!(sanitize(raw), "1girl, beach");
    }

    #[test]
    fn missing_closing_marker_keeps_whole_output() {
        // Known gap: without a closing marker the entire raw output is the
        // candidate answer. The Korean gate still bounds the damage.
        assert_eq!(sanitize("1girl, cafe, indoor"), "1girl, cafe, indoor");
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(sanitize("```text\n1girl, cafe\n```"), "1girl, cafe");
    }

    #[test]
    fn pipes_become_commas() {
        assert_eq!(sanitize("1girl | cafe | indoor"), "1girl, cafe, indoor");
    }

    #[test]
    fn leading_noise_is_trimmed() {
        assert_eq!(sanitize(":→ \n- 1girl, cafe"), "1girl, cafe");
    }

    #[test]
    fn underscores_and_whitespace_are_normalized() {
        assert_eq!(sanitize("upper_body,   long    hair"), "upper body, long hair");
    }

    #[test]
    fn korean_scene_tags_are_dropped_entirely() {
        assert_eq!(sanitize("1girl, 카페, indoor"), "");
    }

    #[test]
    fn korean_scene_degrades_to_bracket_blocks() {
        let raw = "소녀가 카페에 있다, [Alice: long hair, blue eyes]";
        assert_eq!(sanitize(raw), "[Alice: long hair, blue eyes]");
    }

    #[test]
    fn korean_inside_brackets_is_tolerated() {
        let raw = "1girl, cafe, [영희: short hair, glasses]";
        assert_eq!(sanitize(raw), "1girl, cafe, [영희: short hair, glasses]");
    }

    #[test]
    fn text_around_bracket_in_same_segment_is_normalized() {
        let raw = "1girl, cool_pose [Alice: crossed_arms], cafe";
        assert_eq!(
            sanitize(raw),
            "1girl, cool pose [Alice: crossed_arms], cafe",
            "non-bracket text sharing a segment with a block must still be normalized"
        );
    }

    #[test]
    fn bracket_commas_survive_splitting() {
        let raw = "1girl, [Alice: long hair, blue eyes], cafe";
        assert_eq!(sanitize(raw), "1girl, [Alice: long hair, blue eyes], cafe");
    }

    #[test]
    fn unterminated_bracket_is_best_effort() {
        let out = sanitize("1girl, [Alice: long hair");
        assert_eq!(out, "1girl, [Alice: long hair");
    }

    #[test]
    fn empty_and_noise_only_input_yield_empty() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("---\n..."), "");
    }

    #[test]
    fn split_extracts_groups_and_scene() {
        let (scene, groups) =
            split_scene_and_groups("1girl, cafe, indoor, [Alice: long hair, blue eyes]");
        assert_eq!(scene, "1girl, cafe, indoor");
        assert_eq!(groups, vec!["Alice: long hair, blue eyes"]);
    }

    #[test]
    fn split_with_no_groups_returns_scene_only() {
        let (scene, groups) = split_scene_and_groups("1girl, cafe");
        assert_eq!(scene, "1girl, cafe");
        assert!(groups.is_empty());
    }

    #[test]
    fn split_handles_nested_colons_in_group() {
        let (_, groups) = split_scene_and_groups("[Alice: ratio 16:9 frame]");
        assert_eq!(groups, vec!["Alice: ratio 16:9 frame"]);
    }

    #[test]
    fn sanitize_is_idempotent_on_clean_lists() {
        for input in [
            "1girl, selfie, cafe, indoor, upper body",
            "1girl, [Alice: long hair, blue eyes]",
            "[영희: short hair]",
        ] {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "sanitize must be idempotent for {:?}", input);
        }
    }

    proptest! {
        #[test]
        fn sanitize_idempotent_for_random_tag_lists(
            tags in proptest::collection::vec("[a-z]{1,8}( [a-z]{1,8})?", 1..6)
        ) {
            let input = tags.join(", ");
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once);
        }
    }
}
