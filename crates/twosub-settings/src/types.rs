//! Settings type definitions.
//!
//! All types use camelCase JSON and `#[serde(default)]`, so a partial
//! settings file only needs the keys it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings for speech-recognition acquisition.
///
/// ```json
/// {
///   "polling": { "intervalMs": 2000 },
///   "providers": { "bijian": { "baseUrl": "http://127.0.0.1:9000" } }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AsrSettings {
    /// Result polling for task-based backends.
    pub polling: PollingSettings,
    /// Outbound HTTP client settings.
    pub http: HttpSettings,
    /// Per-backend endpoints.
    pub providers: ProviderEndpoints,
}

/// Fixed-interval polling policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollingSettings {
    /// Delay between attempts.
    pub interval_ms: u64,
    /// Attempts before giving up.
    pub max_attempts: u32,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 500,
        }
    }
}

impl PollingSettings {
    /// Interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// HTTP client settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpSettings {
    /// Per-request timeout. Long uploads of large files need hours.
    pub request_timeout_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 2 * 60 * 60 * 1000,
        }
    }
}

impl HttpSettings {
    /// Timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Endpoints for every built-in backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderEndpoints {
    /// `ElevenLabs` speech-to-text.
    pub elevenlabs: ElevenLabsEndpoint,
    /// Bijian (bcut) resource and task API.
    pub bijian: BijianEndpoint,
    /// `JianYing` subtitle API and its upload service.
    pub jianying: JianYingEndpoint,
}

/// `ElevenLabs` endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElevenLabsEndpoint {
    /// API origin, without trailing slash.
    pub base_url: String,
}

impl Default for ElevenLabsEndpoint {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
        }
    }
}

/// Bijian endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BijianEndpoint {
    /// Base of the `rubick-interface` API.
    pub base_url: String,
}

impl Default for BijianEndpoint {
    fn default() -> Self {
        Self {
            base_url: "https://member.bilibili.com/x/bcut/rubick-interface".to_string(),
        }
    }
}

/// `JianYing` endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JianYingEndpoint {
    /// Subtitle API origin.
    pub base_url: String,
    /// Upload authorization (VOD) origin.
    pub vod_url: String,
    /// Scheme used for the upload host returned by the VOD service.
    pub upload_scheme: String,
}

impl Default for JianYingEndpoint {
    fn default() -> Self {
        Self {
            base_url: "https://lv-pc-api-sinfonlinec.ulikecam.com".to_string(),
            vod_url: "https://vod.bytedanceapi.com".to_string(),
            upload_scheme: "https".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
