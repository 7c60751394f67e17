//! Normalization of bcut results.

use serde_json::Value;
use twosub_core::{Sentence, StandardResult, Word};

use crate::errors::{AsrError, AsrResult};
use crate::providers::{millis_at, str_at};

/// Map a decoded task result to the canonical model.
///
/// Every utterance with a non-empty transcript becomes a sentence; its
/// `words` entries become words. Times are already milliseconds.
pub fn normalize(raw: &Value) -> AsrResult<StandardResult> {
    let utterances = raw
        .get("utterances")
        .and_then(Value::as_array)
        .ok_or_else(|| AsrError::parse("missing utterances field in response"))?;

    let mut text = String::new();
    let mut sentences = Vec::new();
    let mut words = Vec::new();

    for utt in utterances.iter().filter(|u| u.is_object()) {
        let transcript = str_at(utt, "transcript");
        if !transcript.is_empty() {
            text.push_str(transcript);
            sentences.push(Sentence::new(
                transcript,
                millis_at(utt, "start_time"),
                millis_at(utt, "end_time"),
            ));
        }

        let Some(entries) = utt.get("words").and_then(Value::as_array) else {
            continue;
        };
        words.extend(entries.iter().filter(|w| w.is_object()).map(|w| {
            Word::new(
                str_at(w, "label"),
                millis_at(w, "start_time"),
                millis_at(w, "end_time"),
            )
        }));
    }

    if words.is_empty() {
        return Err(AsrError::parse("no words found in response"));
    }

    Ok(StandardResult {
        text,
        words,
        sentences,
        language: None,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn utterances_become_sentences_and_words() {
        let raw = json!({
            "utterances": [
                {
                    "transcript": "你好",
                    "start_time": 0,
                    "end_time": 800,
                    "words": [
                        {"label": "你", "start_time": 0, "end_time": 400},
                        {"label": "好", "start_time": 400, "end_time": 800}
                    ]
                },
                {
                    "transcript": "世界",
                    "start_time": 900,
                    "end_time": 1500,
                    "words": [{"label": "世界", "start_time": 900, "end_time": 1500}]
                }
            ]
        });

        let result = normalize(&raw).unwrap();
        assert_eq!(result.text, "你好世界");
        assert_eq!(result.sentences.len(), 2);
        assert_eq!(result.sentences[1], Sentence::new("世界", 900, 1500));
        assert_eq!(result.words.len(), 3);
        assert_eq!(result.words[1], Word::new("好", 400, 800));
        assert!(result.language.is_none());
        assert_eq!(result.duration_ms(), 1500);
    }

    #[test]
    fn empty_transcript_adds_words_but_no_sentence() {
        let raw = json!({
            "utterances": [
                {"transcript": "", "words": [{"label": "嗯", "start_time": 10, "end_time": 20}]}
            ]
        });
        let result = normalize(&raw).unwrap();
        assert!(result.sentences.is_empty());
        assert_eq!(result.text, "");
        assert_eq!(result.words.len(), 1);
    }

    #[test]
    fn missing_utterances() {
        assert_matches!(normalize(&json!({"data": []})), Err(AsrError::Parse { message }) => {
            assert_eq!(message, "missing utterances field in response");
        });
    }

    #[test]
    fn no_words() {
        let raw = json!({"utterances": [{"transcript": "x", "start_time": 0, "end_time": 1}, "junk"]});
        assert_matches!(normalize(&raw), Err(AsrError::Parse { message }) => {
            assert_eq!(message, "no words found in response");
        });
    }

    #[test]
    fn inverted_times_are_clamped() {
        let raw = json!({
            "utterances": [{"transcript": "a", "start_time": 500, "end_time": 100,
                "words": [{"label": "a", "start_time": 500, "end_time": 100}]}]
        });
        let result = normalize(&raw).unwrap();
        assert_eq!((result.words[0].start, result.words[0].end), (500, 500));
        assert_eq!((result.sentences[0].start, result.sentences[0].end), (500, 500));
    }
}
