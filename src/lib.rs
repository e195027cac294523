//! scenetag — scene-description to image-generation prompt pipeline.
//!
//! Converts a free-form, possibly Korean, scene description into a
//! normalized English tag prompt, deciding which known characters to depict
//! and attaching their fixed appearance descriptors. The generation backend
//! and the character registry are external collaborators behind trait seams;
//! everything else (prompt construction, response sanitization, language
//! enforcement, composition) lives here.

pub mod composer;
pub mod generation;
pub mod language;
pub mod matcher;
pub mod pipeline;
pub mod prompts;
pub mod registry;
pub mod resolver;
pub mod sanitizer;
pub mod settings;

pub use composer::compose;
pub use generation::{
    GenerationAdapter, GenerationBackend, GenerationError, RichGenerator, RichOptions,
    SimpleGenerator,
};
pub use language::contains_hangul;
pub use matcher::match_characters;
pub use pipeline::{PipelineOptions, PipelineResult, TagPipeline};
pub use prompts::{build_prompt, PromptMode, REASONING_CLOSE, REASONING_OPEN};
pub use registry::{
    build_var_map, AppearanceVarMap, Character, CharacterRegistry, InMemoryRegistry,
    MatchedCharacter,
};
pub use resolver::resolve_references;
pub use sanitizer::{sanitize, split_scene_and_groups};
pub use settings::{BackendSettings, RouteSettings, TaskRoutes};
