//! Transcript types.
//!
//! Backends report time in different units (fractional seconds or integer
//! milliseconds). The normalizers convert everything to milliseconds before
//! building these values, and the constructors clamp so that
//! `0 <= start <= end` always holds.

use serde::{Deserialize, Serialize};

/// Unified transcription result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardResult {
    /// Complete transcription text.
    pub text: String,
    /// Word-level timings in chronological order. Never empty on success.
    pub words: Vec<Word>,
    /// Sentence-level segments. Empty when the backend has no segmentation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sentences: Vec<Sentence>,
    /// Detected or requested language code (format varies by backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl StandardResult {
    /// Total span covered by the words, in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        match (self.words.first(), self.words.last()) {
            (Some(first), Some(last)) => last.end - first.start,
            _ => 0,
        }
    }

    /// Distinct speaker identifiers in order of first appearance.
    pub fn speakers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for id in self.words.iter().filter_map(|w| w.speaker_id.as_deref()) {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }
}

/// Word-level timing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Word content.
    pub text: String,
    /// Start time in milliseconds.
    pub start: i64,
    /// End time in milliseconds.
    pub end: i64,
    /// Speaker identifier, when the backend performs diarization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
}

impl Word {
    /// Build a word, clamping times so that `0 <= start <= end`.
    pub fn new(text: impl Into<String>, start: i64, end: i64) -> Self {
        let (start, end) = clamp_span(start, end);
        Self {
            text: text.into(),
            start,
            end,
            speaker_id: None,
        }
    }

    /// Attach a speaker identifier. Empty identifiers are ignored.
    #[must_use]
    pub fn with_speaker(mut self, speaker_id: Option<&str>) -> Self {
        self.speaker_id = speaker_id.filter(|s| !s.is_empty()).map(str::to_owned);
        self
    }
}

/// Sentence-level segment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Segment content.
    pub text: String,
    /// Start time in milliseconds.
    pub start: i64,
    /// End time in milliseconds.
    pub end: i64,
    /// Speaker identifier at segment level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
}

impl Sentence {
    /// Build a sentence, clamping times so that `0 <= start <= end`.
    pub fn new(text: impl Into<String>, start: i64, end: i64) -> Self {
        let (start, end) = clamp_span(start, end);
        Self {
            text: text.into(),
            start,
            end,
            speaker_id: None,
        }
    }

    /// Attach a speaker identifier. Empty identifiers are ignored.
    #[must_use]
    pub fn with_speaker(mut self, speaker_id: Option<&str>) -> Self {
        self.speaker_id = speaker_id.filter(|s| !s.is_empty()).map(str::to_owned);
        self
    }
}

/// Convert fractional seconds to whole milliseconds, truncating.
///
/// `1.5` → `1500`. Non-finite and negative inputs map to `0`.
#[allow(clippy::cast_possible_truncation)]
pub fn seconds_to_ms(seconds: f64) -> i64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0) as i64
}

fn clamp_span(start: i64, end: i64) -> (i64, i64) {
    let start = start.max(0);
    (start, end.max(start))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
