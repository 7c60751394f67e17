//! `JianYing` (CapCut desktop) speech recognition.
//!
//! Requests to the application API are hash-signed per path and device.
//! Temporary object-store credentials from `upload_sign` authorize a
//! SigV4-signed call that hands out an upload slot; the audio is then
//! uploaded, verified and committed before the subtitle task is submitted
//! and polled.

mod fetch;
mod normalize;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use twosub_core::StandardResult;
use twosub_settings::{AsrSettings, JianYingEndpoint};

use crate::errors::{AsrError, AsrResult};
use crate::http::build_client;
use crate::options::{FetchOptions, JianYingOptions, ValidateOptions, mismatched};
use crate::poll::PollPolicy;
use crate::provider::Provider;
use crate::workflow::StepContext;

pub use normalize::normalize;

/// `JianYing` provider.
pub struct JianYingProvider {
    endpoint: JianYingEndpoint,
    client: reqwest::Client,
    poll: PollPolicy,
}

impl JianYingProvider {
    /// Registry name.
    pub const NAME: &'static str = "jianying";

    /// Provider configured from `settings`.
    pub fn new(settings: &AsrSettings) -> AsrResult<Self> {
        Ok(Self::with_client(
            settings.providers.jianying.clone(),
            build_client(&settings.http)?,
            PollPolicy::from(&settings.polling),
        ))
    }

    /// Provider with a caller-supplied HTTP client and poll policy.
    pub fn with_client(
        endpoint: JianYingEndpoint,
        client: reqwest::Client,
        poll: PollPolicy,
    ) -> Self {
        Self {
            endpoint,
            client,
            poll,
        }
    }
}

#[async_trait]
impl Provider for JianYingProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip_all, fields(provider = "jianying", audio = %audio.display()))]
    async fn fetch(
        &self,
        audio: &Path,
        options: Option<FetchOptions>,
        cancel: &CancellationToken,
    ) -> AsrResult<Value> {
        let mut options = match options {
            None => JianYingOptions::default(),
            Some(FetchOptions::JianYing(o)) => o,
            Some(other) => return Err(mismatched(Self::NAME, &other)),
        };
        options.validate()?;

        let ctx = StepContext {
            client: self.client.clone(),
            cancel: cancel.clone(),
            poll: self.poll,
        };
        let tdid = twosub_signing::device_id();
        let mut session = fetch::Session::new(audio, self.endpoint.clone(), options, tdid);
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
