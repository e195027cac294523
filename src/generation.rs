//! Generation adapter — invokes the external text-completion backend with a
//! temporary route override, restoring the prior configuration on every exit
//! path.
//!
//! Two backend call shapes are supported. The richer one accepts explicit
//! API routing and is preferred; the quiet-prompt one is the fallback used
//! only when the richer capability is absent. Which shape is used is
//! resolved once at construction, not re-probed per call.

use crate::settings::{BackendSettings, RouteSettings};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("no generation backend available: {0}")]
    Unavailable(String),
    #[error("generation failed: {0}")]
    Failed(String),
}

/// Options passed through to the rich generation call.
#[derive(Debug, Clone, Default)]
pub struct RichOptions {
    pub quiet_to_loud: bool,
    pub trim_names: bool,
    pub api: Option<String>,
}

/// The richer backend shape: explicit API/model routing.
#[async_trait]
pub trait RichGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: RichOptions) -> Result<String, String>;
}

/// The simpler backend shape: a quiet prompt with a task label.
#[async_trait]
pub trait SimpleGenerator: Send + Sync {
    async fn generate_quiet(&self, quiet_prompt: &str, quiet_name: &str) -> Result<String, String>;
}

/// Backend capability, resolved once when the adapter is built.
pub enum GenerationBackend {
    Rich(Arc<dyn RichGenerator>),
    Simple(Arc<dyn SimpleGenerator>),
}

/// Saved state for one route override, handed back to `restore_route`.
struct RoutePrior {
    chat_source: Option<String>,
    model_entry: Option<(String, Option<String>)>,
}

pub struct GenerationAdapter {
    backend: Option<GenerationBackend>,
    settings: Arc<RwLock<BackendSettings>>,
}

impl GenerationAdapter {
    pub fn new(backend: Option<GenerationBackend>, settings: Arc<RwLock<BackendSettings>>) -> Self {
        Self { backend, settings }
    }

    /// Shared backend settings record this adapter mutates during overrides.
    pub fn settings(&self) -> Arc<RwLock<BackendSettings>> {
        self.settings.clone()
    }

    /// Run one generation call with `route` applied for its duration.
    ///
    /// The override is applied before the call and the prior values are
    /// restored after it returns, success or failure. Errors are carried as
    /// values between apply and restore so no exit path skips restoration.
    pub async fn invoke(
        &self,
        prompt: &str,
        route: &RouteSettings,
    ) -> Result<String, GenerationError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| GenerationError::Unavailable("no backend configured".to_string()))?;

        match backend {
            GenerationBackend::Rich(generator) => {
                let prior = self.apply_route(route).await;
                let options = RichOptions {
                    quiet_to_loud: false,
                    trim_names: true,
                    api: Some(route.api.clone()).filter(|a| !a.is_empty()),
                };
                let result = generator.generate(prompt, options).await;
                self.restore_route(prior).await;
                result.map_err(GenerationError::Failed)
            }
            GenerationBackend::Simple(generator) => generator
                .generate_quiet(prompt, "Tag Generator")
                .await
                .map_err(GenerationError::Failed),
        }
    }

    async fn apply_route(&self, route: &RouteSettings) -> RoutePrior {
        let mut prior = RoutePrior {
            chat_source: None,
            model_entry: None,
        };
        if route.is_empty() {
            return prior;
        }
        let mut settings = self.settings.write().await;
        if !route.chat_source.is_empty() {
            debug!("overriding chat source: {}", route.chat_source);
            prior.chat_source =
                Some(std::mem::replace(&mut settings.chat_source, route.chat_source.clone()));
        }
        if !route.model_setting_key.is_empty() && !route.model.is_empty() {
            debug!("overriding model {}={}", route.model_setting_key, route.model);
            let previous = settings
                .models
                .insert(route.model_setting_key.clone(), route.model.clone());
            prior.model_entry = Some((route.model_setting_key.clone(), previous));
        }
        prior
    }

    async fn restore_route(&self, prior: RoutePrior) {
        if prior.chat_source.is_none() && prior.model_entry.is_none() {
            return;
        }
        let mut settings = self.settings.write().await;
        if let Some(chat_source) = prior.chat_source {
            settings.chat_source = chat_source;
        }
        if let Some((key, previous)) = prior.model_entry {
            match previous {
                Some(value) => {
                    settings.models.insert(key, value);
                }
                None => {
                    settings.models.remove(&key);
                }
            }
        }
    }
}
