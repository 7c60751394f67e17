//! Error taxonomy for acquisition and normalization.
//!
//! Workflow steps fail with low-level causes (`Http`, `Io`, `Api`,
//! `Protocol`, ...). The workflow engine wraps the first failure in
//! [`AsrError::Fetch`] tagged with the step name, so callers can localize a
//! failure without re-running the workflow. The helper predicates walk that
//! wrapping.

use thiserror::Error;
use twosub_signing::SigningError;

/// Result alias for acquisition operations.
pub type AsrResult<T> = Result<T, AsrError>;

/// Errors raised by providers, the workflow engine and the registry.
#[derive(Debug, Error)]
pub enum AsrError {
    /// A caller-supplied option violates a precondition. Raised before any
    /// network call.
    #[error("validation error on field '{field}': {message}")]
    Validation {
        /// Offending option field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A named workflow step failed.
    #[error("fetch error at step '{step}': {message}: {source}")]
    Fetch {
        /// Step identifier.
        step: &'static str,
        /// Human-readable description of what the step was doing.
        message: String,
        /// Underlying cause.
        #[source]
        source: Box<AsrError>,
    },

    /// A remote endpoint returned a non-success status.
    #[error("API error (status {status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The raw response lacks what the normalizer requires.
    #[error("parse error: {message}")]
    Parse {
        /// Description naming the missing or malformed field.
        message: String,
    },

    /// No provider is registered under this name.
    #[error("provider '{0}' not found")]
    NotFound(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the audio file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request signing failed.
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    /// A step response was well-formed JSON but not what the protocol
    /// requires.
    #[error("{0}")]
    Protocol(String),

    /// The poll loop used up its attempt budget.
    #[error("polling timed out after {attempts} attempts")]
    Timeout {
        /// Attempts made.
        attempts: u32,
    },

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl AsrError {
    /// Validation failure on `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Normalizer failure.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Protocol violation in a step response.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Wrap `source` as the failure of `step`.
    pub fn fetch(step: &'static str, message: impl Into<String>, source: AsrError) -> Self {
        Self::Fetch {
            step,
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Innermost cause, looking through step wrappers.
    pub fn root(&self) -> &AsrError {
        match self {
            Self::Fetch { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }

    /// Whether the failure was an exhausted poll budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Self::Timeout { .. })
    }

    /// Name of the failing workflow step, if any.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            Self::Fetch { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// HTTP status of an API failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Stable category string for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self.root() {
            Self::Validation { .. } => "validation",
            Self::Api { .. } => "api",
            Self::Parse { .. } | Self::Json(_) => "parse",
            Self::NotFound(_) => "not_found",
            Self::Http(e) if e.is_timeout() => "timeout",
            Self::Http(_) => "network",
            Self::Io(_) => "io",
            Self::Signing(_) => "signing",
            Self::Protocol(_) => "protocol",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::Fetch { .. } => "fetch",
        }
    }
}

/// Failure of the fetch-then-parse convenience call, tagged by phase.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The provider name did not resolve.
    #[error("provider lookup failed: {0}")]
    Lookup(#[source] AsrError),
    /// The acquisition workflow failed.
    #[error("fetch failed: {0}")]
    Fetch(#[source] AsrError),
    /// The raw response could not be normalized.
    #[error("parse failed: {0}")]
    Parse(#[source] AsrError),
}

impl TranscribeError {
    /// Phase that failed: `"lookup"`, `"fetch"` or `"parse"`.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Lookup(_) => "lookup",
            Self::Fetch(_) => "fetch",
            Self::Parse(_) => "parse",
        }
    }

    /// The wrapped error.
    pub fn inner(&self) -> &AsrError {
        match self {
            Self::Lookup(e) | Self::Fetch(e) | Self::Parse(e) => e,
        }
    }

    /// Unwrap into the wrapped error.
    pub fn into_inner(self) -> AsrError {
        match self {
            Self::Lookup(e) | Self::Fetch(e) | Self::Parse(e) => e,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
