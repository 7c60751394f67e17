//! `ElevenLabs` speech-to-text.
//!
//! A single multipart upload returns the transcript synchronously. Word
//! timings are fractional seconds and carry diarized speaker ids.

mod fetch;
mod normalize;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use twosub_core::StandardResult;
use twosub_settings::{AsrSettings, ElevenLabsEndpoint};

use crate::errors::{AsrError, AsrResult};
use crate::http::build_client;
use crate::options::{ElevenLabsOptions, FetchOptions, ValidateOptions, mismatched};
use crate::poll::PollPolicy;
use crate::provider::Provider;
use crate::workflow::StepContext;

pub use normalize::normalize;

/// `ElevenLabs` provider.
pub struct ElevenLabsProvider {
    endpoint: ElevenLabsEndpoint,
    client: reqwest::Client,
}

impl ElevenLabsProvider {
    /// Registry name.
    pub const NAME: &'static str = "elevenlabs";

    /// Provider configured from `settings`.
    pub fn new(settings: &AsrSettings) -> AsrResult<Self> {
        Ok(Self::with_client(
            settings.providers.elevenlabs.clone(),
            build_client(&settings.http)?,
        ))
    }

    /// Provider with a caller-supplied HTTP client.
    pub fn with_client(endpoint: ElevenLabsEndpoint, client: reqwest::Client) -> Self {
        Self { endpoint, client }
    }
}

#[async_trait]
impl Provider for ElevenLabsProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip_all, fields(provider = "elevenlabs", audio = %audio.display()))]
    async fn fetch(
        &self,
        audio: &Path,
        options: Option<FetchOptions>,
        cancel: &CancellationToken,
    ) -> AsrResult<Value> {
        let mut options = match options {
            None => ElevenLabsOptions::default(),
            Some(FetchOptions::ElevenLabs(o)) => o,
            Some(other) => return Err(mismatched(Self::NAME, &other)),
        };
        options.validate()?;

        let ctx = StepContext {
            client: self.client.clone(),
            cancel: cancel.clone(),
            poll: PollPolicy::default(),
        };
        let mut session = fetch::Session::new(audio, &self.endpoint.base_url, options);
        fetch::workflow().run(&mut session, &ctx).await?;
        session
            .result
            .take()
            .ok_or_else(|| AsrError::protocol("workflow finished without a response"))
    }

    fn parse(&self, raw: &Value) -> AsrResult<StandardResult> {
        normalize(raw)
    }
}
