//! Normalization of `ElevenLabs` responses.
//!
//! ```json
//! {"text": "...", "language_code": "en",
//!  "words": [{"text": "hi", "start": 0.0, "end": 0.4, "speaker_id": "A"}]}
//! ```

use serde_json::Value;
use twosub_core::{StandardResult, Word, seconds_to_ms};

use crate::errors::{AsrError, AsrResult};
use crate::providers::str_at;

/// Map a raw response to the canonical model. Times are seconds × 1000,
/// truncated.
pub fn normalize(raw: &Value) -> AsrResult<StandardResult> {
    let text = raw
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| AsrError::parse("missing text field in response"))?;
    let entries = raw
        .get("words")
        .and_then(Value::as_array)
        .ok_or_else(|| AsrError::parse("missing words field in response"))?;

    let words: Vec<Word> = entries
        .iter()
        .filter(|w| w.is_object())
        .map(|w| {
            Word::new(
                str_at(w, "text"),
                seconds_to_ms(seconds_at(w, "start")),
                seconds_to_ms(seconds_at(w, "end")),
            )
            .with_speaker(w.get("speaker_id").and_then(Value::as_str))
        })
        .collect();

    if words.is_empty() {
        return Err(AsrError::parse("no words found in response"));
    }

    Ok(StandardResult {
        text: text.to_string(),
        words,
        sentences: Vec::new(),
        language: raw
            .get("language_code")
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty())
            .map(str::to_owned),
    })
}

fn seconds_at(obj: &Value, key: &str) -> f64 {
    obj.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn hi_there_example() {
        let raw = json!({
            "text": "hi there",
            "words": [
                {"text": "hi", "start": 0.0, "end": 0.4, "speaker_id": "A"},
                {"text": "there", "start": 0.4, "end": 0.9}
            ],
            "language_code": "en"
        });

        let result = normalize(&raw).unwrap();
        assert_eq!(result.text, "hi there");
        assert_eq!(
            result.words,
            vec![
                Word::new("hi", 0, 400).with_speaker(Some("A")),
                Word::new("there", 400, 900),
            ]
        );
        assert!(result.sentences.is_empty());
        assert_eq!(result.language.as_deref(), Some("en"));
    }

    #[test]
    fn one_and_a_half_seconds() {
        let raw = json!({"text": "x", "words": [{"text": "x", "start": 1.5, "end": 1.5}]});
        let result = normalize(&raw).unwrap();
        assert_eq!(result.words[0].start, 1500);
    }

    #[test]
    fn zero_words_is_an_error_even_with_text() {
        let raw = json!({"text": "something was said", "words": []});
        assert_matches!(normalize(&raw), Err(AsrError::Parse { message }) => {
            assert_eq!(message, "no words found in response");
        });
    }

    #[test]
    fn missing_fields_are_named() {
        assert_matches!(normalize(&json!({"words": []})), Err(AsrError::Parse { message }) => {
            assert!(message.contains("text"));
        });
        assert_matches!(normalize(&json!({"text": ""})), Err(AsrError::Parse { message }) => {
            assert!(message.contains("words"));
        });
        assert!(normalize(&json!("not an object")).is_err());
    }

    #[test]
    fn non_object_entries_skipped() {
        let raw = json!({"text": "a", "words": [1, "two", {"text": "a", "start": 0.1, "end": 0.2}]});
        let result = normalize(&raw).unwrap();
        assert_eq!(result.words.len(), 1);
        assert!(result.language.is_none());
    }

    proptest! {
        #[test]
        fn word_times_are_ordered(start in -10.0f64..1e5, end in -10.0f64..1e5) {
            let raw = json!({"text": "w", "words": [{"text": "w", "start": start, "end": end}]});
            let result = normalize(&raw).unwrap();
            let w = &result.words[0];
            prop_assert!(w.start >= 0);
            prop_assert!(w.start <= w.end);
        }
    }
}
