//! Per-backend fetch options.
//!
//! [`FetchOptions`] carries one variant per backend. Every variant
//! implements [`ValidateOptions`], which fills defaults in place and rejects
//! invalid values before any network call is made.

use std::fmt;

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::errors::{AsrError, AsrResult};

/// Validate options and fill defaults in place.
pub trait ValidateOptions {
    /// Check constraints, replacing unset values with defaults.
    fn validate(&mut self) -> AsrResult<()>;
}

/// Backend-specific options, tagged by provider name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum FetchOptions {
    /// Options for `elevenlabs`.
    ElevenLabs(ElevenLabsOptions),
    /// Options for `bijian`.
    Bijian(BijianOptions),
    /// Options for `jianying`.
    JianYing(JianYingOptions),
}

impl FetchOptions {
    /// Registry name of the provider these options belong to.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::ElevenLabs(_) => "elevenlabs",
            Self::Bijian(_) => "bijian",
            Self::JianYing(_) => "jianying",
        }
    }
}

impl ValidateOptions for FetchOptions {
    fn validate(&mut self) -> AsrResult<()> {
        match self {
            Self::ElevenLabs(o) => o.validate(),
            Self::Bijian(o) => o.validate(),
            Self::JianYing(o) => o.validate(),
        }
    }
}

impl From<ElevenLabsOptions> for FetchOptions {
    fn from(o: ElevenLabsOptions) -> Self {
        Self::ElevenLabs(o)
    }
}

impl From<BijianOptions> for FetchOptions {
    fn from(o: BijianOptions) -> Self {
        Self::Bijian(o)
    }
}

impl From<JianYingOptions> for FetchOptions {
    fn from(o: JianYingOptions) -> Self {
        Self::JianYing(o)
    }
}

/// Error for options that belong to a different provider.
pub(crate) fn mismatched(expected: &str, got: &FetchOptions) -> AsrError {
    AsrError::validation(
        "options",
        format!(
            "expected {expected} options, got {} options",
            got.provider_name()
        ),
    )
}

// ── ElevenLabs ──────────────────────────────────────────────────────────────

/// Language code meaning "detect automatically".
pub const AUTO_LANGUAGE: &str = "auto";

/// `ElevenLabs` options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsOptions {
    /// Language code such as `"zh"` or `"en"`; `"auto"` (the default) lets
    /// the backend detect it.
    pub language_code: String,
    /// Tag non-speech audio events (music, applause, ...).
    pub tag_audio_events: bool,
}

impl ElevenLabsOptions {
    /// Language code to send, or `None` for auto-detection.
    pub fn explicit_language(&self) -> Option<&str> {
        let code = self.language_code.trim();
        (!code.is_empty() && code != AUTO_LANGUAGE).then_some(code)
    }
}

impl ValidateOptions for ElevenLabsOptions {
    fn validate(&mut self) -> AsrResult<()> {
        if self.language_code.trim().is_empty() {
            AUTO_LANGUAGE.clone_into(&mut self.language_code);
        }
        Ok(())
    }
}

// ── Bijian ──────────────────────────────────────────────────────────────────

/// Bijian options.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BijianOptions {
    /// Opaque authentication cookie, forwarded verbatim on every request.
    pub cookie: Option<String>,
}

impl fmt::Debug for BijianOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BijianOptions")
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ValidateOptions for BijianOptions {
    fn validate(&mut self) -> AsrResult<()> {
        if self.cookie.as_deref().is_some_and(str::is_empty) {
            self.cookie = None;
        }
        if let Some(cookie) = &self.cookie {
            if HeaderValue::from_str(cookie).is_err() {
                return Err(AsrError::validation(
                    "Cookie",
                    "contains characters not allowed in an HTTP header",
                ));
            }
        }
        Ok(())
    }
}

// ── JianYing ────────────────────────────────────────────────────────────────

/// End of the transcribed range when none is given, in seconds.
pub const DEFAULT_END_TIME: f64 = 6000.0;

/// `JianYing` options. Times are in seconds from the start of the audio.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JianYingOptions {
    /// Start of the transcribed range.
    pub start_time: f64,
    /// End of the transcribed range; `0` means [`DEFAULT_END_TIME`].
    pub end_time: f64,
}

impl ValidateOptions for JianYingOptions {
    #[allow(clippy::float_cmp)]
    fn validate(&mut self) -> AsrResult<()> {
        if !self.start_time.is_finite() {
            return Err(AsrError::validation("StartTime", "must be a finite number"));
        }
        if !self.end_time.is_finite() {
            return Err(AsrError::validation("EndTime", "must be a finite number"));
        }
        if self.end_time == 0.0 {
            self.end_time = DEFAULT_END_TIME;
        }
        if self.start_time < 0.0 {
            return Err(AsrError::validation("StartTime", "must be non-negative"));
        }
        if self.end_time < 0.0 {
            return Err(AsrError::validation("EndTime", "must be non-negative"));
        }
        if self.start_time >= self.end_time {
            return Err(AsrError::validation(
                "StartTime/EndTime",
                "StartTime must be less than EndTime",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn elevenlabs_defaults_to_auto() {
        let mut o = ElevenLabsOptions::default();
        o.validate().unwrap();
        assert_eq!(o.language_code, "auto");
        assert_eq!(o.explicit_language(), None);

        let mut o = ElevenLabsOptions {
            language_code: "zh".into(),
            tag_audio_events: true,
        };
        o.validate().unwrap();
        assert_eq!(o.explicit_language(), Some("zh"));
    }

    #[test]
    fn jianying_inverted_range_fails() {
        let mut o = JianYingOptions {
            start_time: 10.0,
            end_time: 5.0,
        };
        assert_matches!(o.validate(), Err(AsrError::Validation { field, .. }) => {
            assert_eq!(field, "StartTime/EndTime");
        });
    }

    #[test]
    fn jianying_zero_times_fill_default_end() {
        let mut o = JianYingOptions::default();
        o.validate().unwrap();
        assert!((o.end_time - DEFAULT_END_TIME).abs() < f64::EPSILON);
        assert!(o.start_time.abs() < f64::EPSILON);
    }

    #[test]
    fn jianying_negative_times_fail() {
        let mut o = JianYingOptions {
            start_time: -1.0,
            end_time: 5.0,
        };
        assert_matches!(o.validate(), Err(AsrError::Validation { field, .. }) => {
            assert_eq!(field, "StartTime");
        });

        let mut o = JianYingOptions {
            start_time: 0.0,
            end_time: -5.0,
        };
        assert_matches!(o.validate(), Err(AsrError::Validation { field, .. }) => {
            assert_eq!(field, "EndTime");
        });
    }

    #[test]
    fn jianying_equal_times_fail() {
        let mut o = JianYingOptions {
            start_time: 30.0,
            end_time: 30.0,
        };
        assert!(o.validate().is_err());
    }

    #[test]
    fn jianying_nan_rejected() {
        let mut o = JianYingOptions {
            start_time: f64::NAN,
            end_time: 5.0,
        };
        assert!(o.validate().is_err());
    }

    #[test]
    fn bijian_cookie_rules() {
        let mut o = BijianOptions {
            cookie: Some(String::new()),
        };
        o.validate().unwrap();
        assert!(o.cookie.is_none());

        let mut o = BijianOptions {
            cookie: Some("SESSDATA=abc\nevil".into()),
        };
        assert_matches!(o.validate(), Err(AsrError::Validation { field, .. }) => {
            assert_eq!(field, "Cookie");
        });

        let mut o = BijianOptions {
            cookie: Some("SESSDATA=abc; bili_jct=def".into()),
        };
        o.validate().unwrap();
    }

    #[test]
    fn bijian_debug_redacts_cookie() {
        let o = BijianOptions {
            cookie: Some("SESSDATA=secret".into()),
        };
        let shown = format!("{o:?}");
        assert!(!shown.contains("secret"));
        assert!(shown.contains("redacted"));
    }

    #[test]
    fn enum_dispatches_validation() {
        let mut opts = FetchOptions::from(JianYingOptions {
            start_time: 10.0,
            end_time: 5.0,
        });
        assert_eq!(opts.provider_name(), "jianying");
        assert!(opts.validate().is_err());

        let mut opts = FetchOptions::from(ElevenLabsOptions::default());
        opts.validate().unwrap();
        assert_matches!(opts, FetchOptions::ElevenLabs(o) if o.language_code == "auto");
    }

    #[test]
    fn tagged_json_round_trip() {
        let opts: FetchOptions =
            serde_json::from_str(r#"{"provider": "jianying", "start_time": 1.5}"#).unwrap();
        assert_matches!(opts, FetchOptions::JianYing(JianYingOptions { start_time, end_time })
            if (start_time - 1.5).abs() < f64::EPSILON && end_time == 0.0);
    }

    #[test]
    fn mismatch_is_validation_error() {
        let err = mismatched("bijian", &FetchOptions::from(ElevenLabsOptions::default()));
        assert_matches!(err, AsrError::Validation { field, message } => {
            assert_eq!(field, "options");
            assert!(message.contains("elevenlabs"));
        });
    }
}
