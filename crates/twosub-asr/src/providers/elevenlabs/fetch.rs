//! Single-call acquisition: `check_file` → `open_file` → `http_request` →
//! `parse_response`.

use std::path::{Path, PathBuf};

use rand::Rng;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use crate::errors::{AsrError, AsrResult};
use crate::http::{ensure_success, file_len, file_range_body};
use crate::options::ElevenLabsOptions;
use crate::workflow::{StepContext, StepFuture, Workflow};

/// Path of the speech-to-text endpoint.
const STT_PATH: &str = "/v1/speech-to-text";
/// Recognition model.
const MODEL_ID: &str = "scribe_v1";
/// Site the browser headers claim to come from.
const SITE: &str = "https://elevenlabs.io";

/// Per-fetch state.
pub(super) struct Session {
    audio: PathBuf,
    url: String,
    options: ElevenLabsOptions,
    file_name: String,
    file_len: u64,
    body: Option<reqwest::Body>,
    response: Option<reqwest::Response>,
    pub(super) result: Option<Value>,
}

impl Session {
    pub(super) fn new(audio: &Path, base_url: &str, options: ElevenLabsOptions) -> Self {
        let file_name = audio
            .file_name()
            .map_or_else(|| "audio".to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            audio: audio.to_path_buf(),
            url: format!("{base_url}{STT_PATH}"),
            options,
            file_name,
            file_len: 0,
            body: None,
            response: None,
            result: None,
        }
    }
}

pub(super) fn workflow() -> Workflow<Session> {
    Workflow::new("elevenlabs")
        .step("check_file", "audio file not found", check_file)
        .step("open_file", "failed to open audio file", open_file)
        .step("http_request", "HTTP request failed", http_request)
        .step("parse_response", "failed to parse JSON response", parse_response)
}

fn check_file<'a>(s: &'a mut Session, _ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        s.file_len = file_len(&s.audio).await?;
        debug!(bytes = s.file_len, "audio file found");
        Ok(())
    })
}

fn open_file<'a>(s: &'a mut Session, _ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        s.body = Some(file_range_body(&s.audio, 0, s.file_len).await?);
        Ok(())
    })
}

fn http_request<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let body = s
            .body
            .take()
            .ok_or_else(|| AsrError::protocol("audio body was not opened"))?;
        let file = Part::stream_with_length(body, s.file_len)
            .file_name(s.file_name.clone())
            .mime_str("application/octet-stream")?;

        let mut form = Form::new()
            .part("file", file)
            .text("model_id", MODEL_ID)
            .text("diarize", "true")
            .text("tag_audio_events", s.options.tag_audio_events.to_string());
        if let Some(code) = s.options.explicit_language() {
            form = form.text("language_code", code.to_string());
        }

        let headers = browser_headers(&mut rand::rng());
        let response = ctx
            .client
            .post(&s.url)
            .query(&[("allow_unauthenticated", "1")])
            .headers(headers)
            .multipart(form)
            .send()
            .await?;
        s.response = Some(ensure_success(response).await?);
        Ok(())
    })
}

fn parse_response<'a>(s: &'a mut Session, _ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let response = s
            .response
            .take()
            .ok_or_else(|| AsrError::protocol("no response to decode"))?;
        let body = response.bytes().await?;
        s.result = Some(decode(&body)?);
        Ok(())
    })
}

fn decode(body: &[u8]) -> AsrResult<Value> {
    Ok(serde_json::from_slice(body)?)
}

// ── Browser identification ──────────────────────────────────────────────────

/// Language tags mixed into `accept-language`.
const LANGUAGES: &[&str] = &[
    "en", "zh", "ja", "ko", "fr", "de", "es", "it", "pt", "ru", "nl", "sv", "pl", "tr", "ar",
    "vi", "th", "id",
];

/// Fixed browser headers plus a randomized user agent and language list.
///
/// These only reduce trivial bot blocking; they authenticate nothing.
fn browser_headers<R: Rng>(rng: &mut R) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let _ = headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    let _ = headers.insert(ORIGIN, HeaderValue::from_static(SITE));
    let _ = headers.insert(REFERER, HeaderValue::from_static("https://elevenlabs.io/"));
    let _ = headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    let _ = headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    let _ = headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));
    if let Ok(v) = HeaderValue::from_str(&random_user_agent(rng)) {
        let _ = headers.insert(USER_AGENT, v);
    }
    if let Ok(v) = HeaderValue::from_str(&random_accept_language(rng)) {
        let _ = headers.insert(ACCEPT_LANGUAGE, v);
    }
    headers
}

fn random_user_agent<R: Rng>(rng: &mut R) -> String {
    let chrome = format!(
        "{}.0.{}.{}",
        rng.random_range(118..=131),
        rng.random_range(5000..=6800),
        rng.random_range(10..=220)
    );
    match rng.random_range(0..4) {
        0 => format!(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{chrome} Safari/537.36"
        ),
        1 => format!(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{chrome} Safari/537.36"
        ),
        2 => {
            let rv = rng.random_range(115..=133);
            format!("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:{rv}.0) Gecko/20100101 Firefox/{rv}.0")
        }
        _ => format!(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{}.{} Safari/605.1.15",
            rng.random_range(16..=18),
            rng.random_range(0..=6)
        ),
    }
}

fn random_accept_language<R: Rng>(rng: &mut R) -> String {
    let first = LANGUAGES[rng.random_range(0..LANGUAGES.len())];
    let second = LANGUAGES[rng.random_range(0..LANGUAGES.len())];
    format!("{first},{second};q=0.9,en;q=0.8")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
