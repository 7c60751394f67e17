//! Built-in backends.
//!
//! | Name         | Protocol                         | Time unit            |
//! |--------------|----------------------------------|----------------------|
//! | `elevenlabs` | one multipart call               | fractional seconds   |
//! | `bijian`     | chunked upload, task, polling    | integer milliseconds |
//! | `jianying`   | signed upload, task, polling     | integer milliseconds |

pub mod bijian;
pub mod elevenlabs;
pub mod jianying;

pub use bijian::BijianProvider;
pub use elevenlabs::ElevenLabsProvider;
pub use jianying::JianYingProvider;

use serde_json::Value;

/// String at `key`, or `""` when absent or not a string.
pub(crate) fn str_at<'a>(obj: &'a Value, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Integer milliseconds at `key`. Fractions are truncated; anything that is
/// not a number reads as `0`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn millis_at(obj: &Value, key: &str) -> i64 {
    match obj.get(key) {
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        None => 0,
    }
}

/// Non-empty `attribute.speaker` of an utterance or word.
pub(crate) fn attribute_speaker(obj: &Value) -> Option<&str> {
    obj.get("attribute")
        .and_then(|a| a.get("speaker"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
