//! Prompt construction for the tag-generation LLM call.
//!
//! Two modes: a legacy tag-only prompt, and a character-aware prompt that
//! embeds the known-character list, a reasoning-block output contract and a
//! worked example. Both are preceded by a creative-context preamble that
//! frames the task as fictional-illustration metadata tagging.

use crate::registry::MatchedCharacter;

/// Reasoning-block markers the model is instructed to emit around its
/// character-selection reasoning. Everything up to and including the closing
/// marker is discarded by the sanitizer.
pub const REASONING_OPEN: &str = "<img-gen>";
pub const REASONING_CLOSE: &str = "</img-gen>";

/// Prepended verbatim and unconditionally to both prompt modes.
const CREATIVE_PREAMBLE: &str = concat!(
    "This is a metadata tagging task for a fictional illustration. ",
    "The scene below comes from a fictional story, and the tags describe an ",
    "imaginary picture — no real person or event is involved.\n\n"
);

const LEGACY_INSTRUCTIONS: &str = r#"Convert the scene description into comma-separated English image tags.
- Output ONLY comma-separated tags, no sentences and no explanation.
- Do not invent appearance details (hair color, eye color, clothing) that the scene does not state.
- Include at least one framing tag such as "upper body", "full body" or "close-up".
- Include at least one setting or background tag."#;

const CHARACTER_RULES: &str = r#"Rules:
1. The final answer must be in English only. Never output Korean in the final answer.
2. Use short comma-separated tags, not sentences.
3. Never invent appearance details; use only the appearance reference above.
4. Replace underscores with spaces.
5. Include a character-count tag such as "1girl", "2girls" or "1boy" whenever a character is depicted.
6. Include at least one setting or background tag.
7. Include at least one pose or action tag.
8. Include at least one mood or lighting tag.
9. Include at least one framing tag such as "upper body", "full body" or "close-up".
10. Poses and expressions belonging to a specific character go inside that character's bracket, not in the scene tags.
11. Only add a bracket for a character that actually appears in the scene.
12. Each character bracket must have the exact form [Name: tags].
13. Do not add negative tags, quality tags or artist names.
14. Even if the scene is vague, infer a plausible concrete scene and always produce tags."#;

const WORKED_EXAMPLE: &str = r#"Example:
Scene: Mina waves at the camera in front of a fountain on a sunny day.
Answer:
<img-gen>Mina is the only known character mentioned, so she appears alone. Outdoor fountain, daytime, cheerful mood, waist-up shot.</img-gen>
1girl, fountain, park, outdoors, sunny, day, smile, waving, looking at viewer, upper body, [Mina: long black hair, brown eyes, school uniform]"#;

/// Which instruction text to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Tag-only output, no character selection.
    Legacy,
    /// Character selection with a reasoning block and bracketed appearance groups.
    CharacterAware,
}

/// Assemble the full instruction prompt sent to the generation backend.
pub fn build_prompt(
    mode: PromptMode,
    scene_text: &str,
    characters: &[MatchedCharacter],
    extra_instructions: Option<&str>,
) -> String {
    let mut prompt = String::from(CREATIVE_PREAMBLE);

    match mode {
        PromptMode::Legacy => {
            prompt.push_str(LEGACY_INSTRUCTIONS);
        }
        PromptMode::CharacterAware => {
            prompt.push_str(
                "Convert the scene description into English image-generation tags and decide which of the known characters appear in it.\n\n",
            );

            let known: Vec<&str> = characters.iter().map(|c| c.name.as_str()).collect();
            if !known.is_empty() {
                prompt.push_str(&format!("Known characters: {}\n", known.join(", ")));
            }

            let with_tags: Vec<String> = characters
                .iter()
                .filter(|c| !c.appearance_tags.is_empty())
                .map(|c| format!("- {}: {}", c.name, c.appearance_tags))
                .collect();
            if !with_tags.is_empty() {
                prompt.push_str("Appearance reference (fixed, do not alter):\n");
                prompt.push_str(&with_tags.join("\n"));
                prompt.push('\n');
            }

            prompt.push_str(&format!(
                "\nOutput format (mandatory, two parts):\n\
                 First, reason about which characters appear, inside {REASONING_OPEN} and {REASONING_CLOSE}.\n\
                 Then, on a new line, the final answer:\n\
                 scene tags, [Name: appearance tags], [Name: appearance tags]\n\n"
            ));
            prompt.push_str(CHARACTER_RULES);
            prompt.push_str("\n\n");
            prompt.push_str(WORKED_EXAMPLE);
        }
    }

    if let Some(extra) = extra_instructions.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\nAdditional instructions:\n");
        prompt.push_str(extra);
    }

    prompt.push_str("\n\nScene description:\n");
    prompt.push_str(scene_text);
    prompt
}
