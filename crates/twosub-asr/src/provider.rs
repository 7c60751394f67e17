//! # Provider Trait
//!
//! Every speech-recognition backend implements [`Provider`]: a registry
//! name, a `fetch` that drives the backend's acquisition workflow and returns
//! the raw decoded response, and a pure `parse` that normalizes that response
//! into a [`StandardResult`].

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use twosub_core::StandardResult;

use crate::errors::AsrResult;
use crate::options::FetchOptions;

/// A speech-recognition backend.
///
/// Implementors must be `Send + Sync` so one instance can serve concurrent
/// fetches through the registry.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry name (e.g. `"elevenlabs"`).
    fn name(&self) -> &str;

    /// Run the acquisition workflow for `audio` and return the raw response.
    ///
    /// `options` must be this provider's variant or `None` for defaults.
    /// Options are validated before any network call. `cancel` is honored
    /// before and during every step, including poll sleeps.
    async fn fetch(
        &self,
        audio: &Path,
        options: Option<FetchOptions>,
        cancel: &CancellationToken,
    ) -> AsrResult<Value>;

    /// Normalize a raw response produced by [`fetch`](Provider::fetch).
    fn parse(&self, raw: &Value) -> AsrResult<StandardResult>;
}
