//! Name → [`Provider`] lookup.
//!
//! [`ProviderRegistry`] is an explicit value; tests and embedders build
//! their own. [`default_registry`] is a lazily built process-wide instance
//! holding the built-in backends configured from global settings.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use twosub_core::StandardResult;
use twosub_settings::AsrSettings;

use crate::errors::{AsrError, AsrResult, TranscribeError};
use crate::options::FetchOptions;
use crate::provider::Provider;
use crate::providers::{BijianProvider, ElevenLabsProvider, JianYingProvider};

/// Concurrency-safe provider table.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `elevenlabs`, `bijian` and `jianying`.
    pub fn with_builtin_providers(settings: &AsrSettings) -> AsrResult<Self> {
        let registry = Self::new();
        registry.register(Arc::new(ElevenLabsProvider::new(settings)?));
        registry.register(Arc::new(BijianProvider::new(settings)?));
        registry.register(Arc::new(JianYingProvider::new(settings)?));
        Ok(registry)
    }

    /// Insert `provider` under its name, replacing any previous entry.
    pub fn register(&self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        let replaced = self.providers.write().insert(name.clone(), provider);
        debug!(provider = %name, replaced = replaced.is_some(), "provider registered");
    }

    /// Provider registered under `name`.
    pub fn get(&self, name: &str) -> AsrResult<Arc<dyn Provider>> {
        self.providers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| AsrError::NotFound(name.to_string()))
    }

    /// Registered names, in no particular order.
    pub fn list(&self) -> Vec<String> {
        self.providers.read().keys().cloned().collect()
    }

    /// Fetch then parse with the provider called `name`.
    #[instrument(skip_all, fields(provider = name))]
    pub async fn transcribe(
        &self,
        name: &str,
        audio: &Path,
        options: Option<FetchOptions>,
        cancel: &CancellationToken,
    ) -> Result<StandardResult, TranscribeError> {
        let provider = self.get(name).map_err(TranscribeError::Lookup)?;
        let raw = provider
            .fetch(audio, options, cancel)
            .await
            .map_err(TranscribeError::Fetch)?;
        let result = provider.parse(&raw).map_err(TranscribeError::Parse)?;
        info!(
            words = result.words.len(),
            sentences = result.sentences.len(),
            duration_ms = result.duration_ms(),
            "transcription complete"
        );
        Ok(result)
    }
}

static DEFAULT_REGISTRY: OnceLock<ProviderRegistry> = OnceLock::new();

/// Process-wide registry with the built-in providers.
///
/// Built on first use from [`twosub_settings::get_settings`]. If the HTTP
/// client cannot be constructed the failure is logged and the registry
/// starts empty.
pub fn default_registry() -> &'static ProviderRegistry {
    DEFAULT_REGISTRY.get_or_init(|| {
        ProviderRegistry::with_builtin_providers(twosub_settings::get_settings()).unwrap_or_else(
            |e| {
                error!(error = %e, "failed to build built-in providers");
                ProviderRegistry::new()
            },
        )
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
