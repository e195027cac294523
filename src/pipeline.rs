//! Pipeline orchestrator — the single entry point that turns a raw scene
//! description into a composed image-generation prompt.
//!
//! Flow: fast-path check → reference resolution → character matching →
//! prompt build → one generation attempt → sanitization → composition.
//! Every failure path resolves to a well-formed, possibly empty result;
//! nothing here is fatal to the caller.

use crate::composer::compose;
use crate::generation::GenerationAdapter;
use crate::language::contains_hangul;
use crate::matcher::match_characters;
use crate::prompts::{build_prompt, PromptMode};
use crate::registry::{build_var_map, AppearanceVarMap, CharacterRegistry, MatchedCharacter};
use crate::resolver::resolve_references;
use crate::sanitizer::{sanitize, split_scene_and_groups};
use crate::settings::RouteSettings;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

static BRACKET_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\[\]]+:").unwrap());

/// Per-invocation options. Everything defaults to "off".
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Trusted character names (e.g. the current speaker), force-included.
    pub hints: Vec<String>,
    /// Free-text instructions appended to the built prompt.
    pub extra_instructions: Option<String>,
    /// Scene-tag weight; `> 0` wraps the scene as `weight::tags::`.
    pub weight: f32,
    /// Precomputed variable map; built from the registry when absent.
    pub var_map: Option<AppearanceVarMap>,
    /// Backend/model override for this call.
    pub route: RouteSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineResult {
    pub scene_tags: String,
    /// Plain `"Name: tags"` strings, never pre-bracketed.
    pub appearance_groups: Vec<String>,
    /// Built exclusively from language-validated fragments when non-empty.
    pub final_prompt: String,
}

pub struct TagPipeline {
    registry: Arc<dyn CharacterRegistry>,
    adapter: GenerationAdapter,
}

impl TagPipeline {
    pub fn new(registry: Arc<dyn CharacterRegistry>, adapter: GenerationAdapter) -> Self {
        Self { registry, adapter }
    }

    /// Run the full pipeline on one scene description.
    pub async fn run(&self, raw_input: &str, options: &PipelineOptions) -> PipelineResult {
        let input = raw_input.trim();
        if input.is_empty() {
            return PipelineResult::default();
        }

        // Fast path: already a clean tag list, skip generation entirely.
        if !contains_hangul(input) && looks_like_tag_list(input) {
            debug!("input already tag-shaped, skipping generation");
            let (scene_tags, appearance_groups) = split_scene_and_groups(&sanitize(input));
            let final_prompt = compose(&scene_tags, &appearance_groups, options.weight);
            return PipelineResult {
                scene_tags,
                appearance_groups,
                final_prompt,
            };
        }

        let var_map = match &options.var_map {
            Some(map) => map.clone(),
            None => build_var_map(self.registry.as_ref(), &options.hints),
        };
        let resolved = resolve_references(input, &var_map);
        let matched = match_characters(&resolved, &options.hints, self.registry.as_ref());

        let mode = if !matched.is_empty() || !self.registry.characters().is_empty() {
            PromptMode::CharacterAware
        } else {
            PromptMode::Legacy
        };
        let prompt = build_prompt(
            mode,
            &resolved,
            &matched,
            options.extra_instructions.as_deref(),
        );

        let raw_output = match self.adapter.invoke(&prompt, &options.route).await {
            Ok(text) => text,
            Err(e) => {
                warn!("tag generation failed, falling back: {}", e);
                String::new()
            }
        };

        let sanitized = sanitize(&raw_output);
        if sanitized.is_empty() {
            // Appearance-only degraded result, if we know anyone's looks.
            let appearance_groups = appearance_fallback(&matched);
            if appearance_groups.is_empty() {
                return PipelineResult::default();
            }
            let final_prompt = compose("", &appearance_groups, options.weight);
            return PipelineResult {
                scene_tags: String::new(),
                appearance_groups,
                final_prompt,
            };
        }

        let (scene_tags, mut appearance_groups) = split_scene_and_groups(&sanitized);
        if appearance_groups.is_empty() {
            // The model chose no one; fall back to everyone we matched.
            appearance_groups = appearance_fallback(&matched);
        }

        let final_prompt = compose(&scene_tags, &appearance_groups, options.weight);
        PipelineResult {
            scene_tags,
            appearance_groups,
            final_prompt,
        }
    }
}

fn appearance_fallback(matched: &[MatchedCharacter]) -> Vec<String> {
    matched
        .iter()
        .filter(|m| !m.appearance_tags.is_empty())
        .map(|m| format!("{}: {}", m.name, m.appearance_tags))
        .collect()
}

/// Does the input already satisfy tag-list formatting? Either a bracketed
/// `Name:` block, or at least two short comma-separated segments none of
/// which contain sentence punctuation.
fn looks_like_tag_list(text: &str) -> bool {
    if BRACKET_GROUP_RE.is_match(text) {
        return true;
    }
    let segments: Vec<&str> = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() < 2 {
        return false;
    }
    segments.iter().all(|s| {
        s.chars().count() <= 40
            && !s
                .chars()
                .any(|c| matches!(c, '.' | '!' | '?' | ';' | '。' | '？' | '！'))
    })
}
