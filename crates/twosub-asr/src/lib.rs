//! # twosub-asr
//!
//! Speech-recognition acquisition and normalization.
//!
//! Each backend implements [`Provider`]: `fetch` runs its acquisition
//! protocol as a named-step [`Workflow`] (upload, task submission, polling)
//! and returns the raw response; `parse` maps that response to the
//! canonical [`StandardResult`].
//!
//! ```text
//! audio path + options
//!   → ProviderRegistry::get(name)
//!   → Provider::fetch   (steps, cancellation, bounded polling)
//!   → Provider::parse   (units → ms, clamped spans)
//!   → StandardResult
//! ```
//!
//! ## Crate Position
//!
//! Depends on: twosub-core, twosub-signing, twosub-settings.

#![deny(unsafe_code)]

pub mod errors;
pub mod http;
pub mod options;
pub mod poll;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod workflow;

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use errors::{AsrError, AsrResult, TranscribeError};
pub use options::{
    BijianOptions, ElevenLabsOptions, FetchOptions, JianYingOptions, ValidateOptions,
};
pub use poll::{PollPolicy, PollStatus, poll_until};
pub use provider::Provider;
pub use providers::{BijianProvider, ElevenLabsProvider, JianYingProvider};
pub use registry::{ProviderRegistry, default_registry};
pub use twosub_core::{Sentence, StandardResult, Word};
pub use workflow::{Step, StepContext, StepFuture, Workflow};

/// Register `provider` in the process-wide registry.
pub fn register(provider: Arc<dyn Provider>) {
    default_registry().register(provider);
}

/// Look up `name` in the process-wide registry.
pub fn get(name: &str) -> AsrResult<Arc<dyn Provider>> {
    default_registry().get(name)
}

/// Names in the process-wide registry.
pub fn list() -> Vec<String> {
    default_registry().list()
}

/// Fetch and parse with the process-wide registry.
pub async fn transcribe(
    name: &str,
    audio: &Path,
    options: Option<FetchOptions>,
    cancel: &CancellationToken,
) -> Result<StandardResult, TranscribeError> {
    default_registry()
        .transcribe(name, audio, options, cancel)
        .await
}
