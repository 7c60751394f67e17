//! Normalization of `JianYing` subtitle query responses.

use serde_json::Value;
use twosub_core::{Sentence, StandardResult, Word};

use crate::errors::{AsrError, AsrResult};
use crate::providers::{attribute_speaker, millis_at, str_at};

/// Map a completed query response to the canonical model.
pub fn normalize(raw: &Value) -> AsrResult<StandardResult> {
    let data = raw
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| AsrError::parse("missing data field in response"))?;
    let utterances = data
        .get("utterances")
        .and_then(Value::as_array)
        .ok_or_else(|| AsrError::parse("missing utterances field in data"))?;

    let language = data
        .pointer("/attribute/extra/language")
        .and_then(Value::as_str)
        .filter(|l| !l.is_empty())
        .map(str::to_owned);

    let mut text = String::new();
    let mut sentences = Vec::new();
    let mut words = Vec::new();

    for utt in utterances.iter().filter(|u| u.is_object()) {
        let utt_text = str_at(utt, "text");
        if !utt_text.is_empty() {
            text.push_str(utt_text);
            sentences.push(
                Sentence::new(
                    utt_text,
                    millis_at(utt, "start_time"),
                    millis_at(utt, "end_time"),
                )
                .with_speaker(attribute_speaker(utt)),
            );
        }

        let Some(entries) = utt.get("words").and_then(Value::as_array) else {
            continue;
        };
        words.extend(entries.iter().filter(|w| w.is_object()).map(|w| {
            Word::new(
                str_at(w, "text"),
                millis_at(w, "start_time"),
                millis_at(w, "end_time"),
            )
            .with_speaker(attribute_speaker(w))
        }));
    }

    if words.is_empty() {
        return Err(AsrError::parse("no words found in response"));
    }

    Ok(StandardResult {
        text,
        words,
        sentences,
        language,
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

    fn sample() -> Value {
        json!({
            "ret": "0",
            "data": {
                "attribute": {"extra": {"language": "zh-CN"}},
                "utterances": [
                    {
                        "text": "大家好",
                        "start_time": 120,
                        "end_time": 980,
                        "attribute": {"speaker": "1"},
                        "words": [
                            {"text": "大家", "start_time": 120, "end_time": 560, "attribute": {"speaker": "1"}},
                            {"text": "好", "start_time": 560, "end_time": 980}
                        ]
                    },
                    {
                        "text": "",
                        "words": [{"text": "嗯", "start_time": 1000, "end_time": 1100}]
                    }
                ]
            }
        })
    }

    #[test]
    fn utterances_and_speakers() {
        let result = normalize(&sample()).unwrap();
        assert_eq!(result.text, "大家好");
        assert_eq!(result.language.as_deref(), Some("zh-CN"));
        assert_eq!(
            result.sentences,
            vec![Sentence::new("大家好", 120, 980).with_speaker(Some("1"))]
        );
        assert_eq!(result.words.len(), 3);
        assert_eq!(result.words[0].speaker_id.as_deref(), Some("1"));
        assert!(result.words[1].speaker_id.is_none());
        assert_eq!(result.speakers(), vec!["1"]);
    }

    #[test]
    fn language_is_optional() {
        let mut raw = sample();
        raw["data"]["attribute"] = json!({});
        assert!(normalize(&raw).unwrap().language.is_none());
    }

    #[test]
    fn missing_containers() {
        assert_matches!(normalize(&json!({"ret": "0"})), Err(AsrError::Parse { message }) => {
            assert_eq!(message, "missing data field in response");
        });
        assert_matches!(normalize(&json!({"data": {}})), Err(AsrError::Parse { message }) => {
            assert_eq!(message, "missing utterances field in data");
        });
    }

    #[test]
    fn no_words() {
        let raw = json!({"data": {"utterances": [{"text": "x", "start_time": 0, "end_time": 5}]}});
        assert_matches!(normalize(&raw), Err(AsrError::Parse { message }) => {
            assert_eq!(message, "no words found in response");
        });
    }
}
