//! Bijian (bcut) speech recognition.
//!
//! The audio is uploaded in server-sized parts, committed, then a task is
//! created and polled until its state reaches completion. Times in the
//! result are integer milliseconds.

mod fetch;
mod normalize;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use twosub_core::StandardResult;
use twosub_settings::{AsrSettings, BijianEndpoint};

use crate::errors::{AsrError, AsrResult};
use crate::http::build_client;
use crate::options::{BijianOptions, FetchOptions, ValidateOptions, mismatched};
use crate::poll::PollPolicy;
use crate::provider::Provider;
use crate::workflow::StepContext;

pub use normalize::normalize;

/// Bijian provider.
pub struct BijianProvider {
    endpoint: BijianEndpoint,
    client: reqwest::Client,
    poll: PollPolicy,
}

impl BijianProvider {
    /// Registry name.
    pub const NAME: &'static str = "bijian";

    /// Provider configured from `settings`.
    pub fn new(settings: &AsrSettings) -> AsrResult<Self> {
        Ok(Self::with_client(
            settings.providers.bijian.clone(),
            build_client(&settings.http)?,
            PollPolicy::from(&settings.polling),
        ))
    }

    /// Provider with a caller-supplied HTTP client and poll policy.
    pub fn with_client(endpoint: BijianEndpoint, client: reqwest::Client, poll: PollPolicy) -> Self {
        Self {
            endpoint,
            client,
            poll,
        }
    }
}

#[async_trait]
impl Provider for BijianProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip_all, fields(provider = "bijian", audio = %audio.display()))]
    async fn fetch(
        &self,
        audio: &Path,
        options: Option<FetchOptions>,
        cancel: &CancellationToken,
    ) -> AsrResult<Value> {
        let mut options = match options {
            None => BijianOptions::default(),
            Some(FetchOptions::Bijian(o)) => o,
            Some(other) => return Err(mismatched(Self::NAME, &other)),
        };
        options.validate()?;

        let ctx = StepContext {
            client: self.client.clone(),
            cancel: cancel.clone(),
            poll: self.poll,
        };
        let mut session = fetch::Session::new(audio, &self.endpoint.base_url, options.cookie);
        fetch::workflow().run(&mut session, &ctx).await?;
        session
            .result
            .take()
            .ok_or_else(|| AsrError::protocol("workflow finished without a result"))
    }

    fn parse(&self, raw: &Value) -> AsrResult<StandardResult> {
        normalize(raw)
    }
}
