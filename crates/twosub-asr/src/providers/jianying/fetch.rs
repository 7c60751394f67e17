//! Signed upload and subtitle task against the `JianYing` API.

use std::path::{Path, PathBuf};

use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tracing::debug;
use twosub_settings::JianYingEndpoint;
use twosub_signing::{Crc32Writer, Credentials, SigningScope, amz_date_now, sign_path, sign_request};

use crate::errors::{AsrError, AsrResult};
use crate::http::{file_len, file_range_body, read_json, read_optional_json};
use crate::options::JianYingOptions;
use crate::poll::{PollStatus, poll_until};
use crate::providers::str_at;
use crate::workflow::{StepContext, StepFuture, Workflow};

const UPLOAD_SIGN_PATH: &str = "/lv/v1/upload_sign";
const SUBMIT_PATH: &str = "/lv/v1/audio_subtitle/submit";
const QUERY_PATH: &str = "/lv/v1/audio_subtitle/query";

/// User agent of signed API calls.
const API_USER_AGENT: &str = "Cronet/TTNetVersion:d4572e53 2024-06-12 QuicVersion:4bf243e0 2023-04-17";
/// User agent of object-store calls.
const UPLOAD_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/81.0.4044.138 Safari/537.36 Thea/1.0.1";
const CONTENT_CRC32: &str = "Content-CRC32";

const VOD_REGION: &str = "cn";
const VOD_SERVICE: &str = "vod";
const SPACE_NAME: &str = "lv-mac-recognition";
const CLIENT_REQUEST_ID: &str = "45faf98c-160f-4fae-a649-6d89b0fe35be";

const READ_CHUNK: usize = 64 * 1024;

/// Upload slot returned by `ApplyUploadInner`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplyUploadResponse {
    result: Option<ApplyUploadResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplyUploadResult {
    upload_address: Option<UploadAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UploadAddress {
    #[serde(default)]
    store_infos: Vec<StoreInfo>,
    #[serde(default)]
    upload_hosts: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StoreInfo {
    #[serde(default)]
    store_uri: String,
    #[serde(default)]
    auth: String,
    #[serde(default, rename = "UploadID")]
    upload_id: String,
}

/// Where and how to upload the audio object.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct UploadTarget {
    host: String,
    store_uri: String,
    auth: String,
    upload_id: String,
}

impl UploadTarget {
    fn object_url(&self, scheme: &str) -> String {
        format!("{scheme}://{}/{}", self.host, self.store_uri)
    }
}

/// Per-fetch state.
pub(super) struct Session {
    audio: PathBuf,
    endpoint: JianYingEndpoint,
    options: JianYingOptions,
    tdid: String,
    file_len: u64,
    crc32: String,
    credentials: Credentials,
    target: UploadTarget,
    query_id: String,
    pub(super) result: Option<Value>,
}

impl Session {
    pub(super) fn new(
        audio: &Path,
        endpoint: JianYingEndpoint,
        options: JianYingOptions,
        tdid: String,
    ) -> Self {
        Self {
            audio: audio.to_path_buf(),
            endpoint,
            options,
            tdid,
            file_len: 0,
            crc32: String::new(),
            credentials: Credentials::default(),
            target: UploadTarget::default(),
            query_id: String::new(),
            result: None,
        }
    }

    fn object_url(&self) -> String {
        self.target.object_url(&self.endpoint.upload_scheme)
    }
}

pub(super) fn workflow() -> Workflow<Session> {
    Workflow::new("jianying")
        .step("read_file", "failed to read audio file", read_file)
        .step("upload_sign", "failed to get upload signature", upload_sign)
        .step("upload_auth", "failed to get upload authorization", upload_auth)
        .step("upload_file", "failed to upload file", upload_file)
        .step("upload_check", "failed to check upload", upload_check)
        .step("upload_commit", "failed to commit upload", upload_commit)
        .step("submit_task", "failed to submit task", submit_task)
        .step("query_result", "failed to query result", query_result)
}

fn read_file<'a>(s: &'a mut Session, _ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let _ = file_len(&s.audio).await?;
        let mut file = tokio::fs::File::open(&s.audio).await?;
        let mut crc = Crc32Writer::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            crc.update(&buf[..n]);
        }
        s.file_len = crc.len();
        s.crc32 = crc.finish_hex();
        debug!(bytes = s.file_len, crc32 = %s.crc32, "audio file read");
        Ok(())
    })
}

fn upload_sign<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let resp = signed_post(
            ctx,
            &s.endpoint.base_url,
            UPLOAD_SIGN_PATH,
            &s.tdid,
            &json!({"biz": "pc-recognition"}),
        )
        .await?;
        let data = data_of(&resp)?;
        s.credentials = Credentials {
            access_key_id: str_at(data, "access_key_id").to_string(),
            secret_access_key: str_at(data, "secret_access_key").to_string(),
            session_token: str_at(data, "session_token").to_string(),
        };
        Ok(())
    })
}

fn upload_auth<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let query = [
            ("Action", "ApplyUploadInner".to_string()),
            ("FileSize", s.file_len.to_string()),
            ("FileType", "object".to_string()),
            ("IsInner", "1".to_string()),
            ("SpaceName", SPACE_NAME.to_string()),
            ("Version", "2020-11-19".to_string()),
            ("s", "5y0udbjapi".to_string()),
        ];
        let signed = sign_request(
            &s.credentials,
            &SigningScope::new(VOD_REGION, VOD_SERVICE),
            "GET",
            "/",
            &query,
            &[],
            b"",
            &amz_date_now(),
        )?;

        let mut req = ctx
            .client
            .get(format!("{}/?{}", s.endpoint.vod_url, signed.query));
        for (name, value) in &signed.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        let resp = read_json(req.send().await?).await?;
        s.target = upload_target(serde_json::from_value(resp)?)?;
        debug!(host = %s.target.host, store_uri = %s.target.store_uri, "upload slot granted");
        Ok(())
    })
}

fn upload_file<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let resp = ctx
            .client
            .put(s.object_url())
            .query(&[("partNumber", "1"), ("uploadID", s.target.upload_id.as_str())])
            .header(USER_AGENT, UPLOAD_USER_AGENT)
            .header(AUTHORIZATION, s.target.auth.as_str())
            .header(CONTENT_CRC32, s.crc32.as_str())
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, s.file_len)
            .body(file_range_body(&s.audio, 0, s.file_len).await?)
            .send()
            .await?;
        let body = read_optional_json(resp)
            .await?
            .ok_or_else(|| AsrError::protocol("empty response body"))?;
        require_success(&body)
    })
}

fn upload_check<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let resp = ctx
            .client
            .post(s.object_url())
            .query(&[("uploadID", s.target.upload_id.as_str())])
            .header(USER_AGENT, UPLOAD_USER_AGENT)
            .header(AUTHORIZATION, s.target.auth.as_str())
            .header(CONTENT_CRC32, s.crc32.as_str())
            .body(format!("1:{}", s.crc32))
            .send()
            .await?;
        reject_failure(read_optional_json(resp).await?.as_ref())
    })
}

fn upload_commit<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let resp = ctx
            .client
            .put(s.object_url())
            .query(&[
                ("uploadID", s.target.upload_id.as_str()),
                ("x-amz-security-token", s.credentials.session_token.as_str()),
            ])
            .header(USER_AGENT, UPLOAD_USER_AGENT)
            .header(AUTHORIZATION, s.target.auth.as_str())
            .header(CONTENT_TYPE, "application/xml")
            .header(CONTENT_CRC32, s.crc32.as_str())
            .header(CONTENT_LENGTH, s.file_len)
            .body(file_range_body(&s.audio, 0, s.file_len).await?)
            .send()
            .await?;
        reject_failure(read_optional_json(resp).await?.as_ref())
    })
}

fn submit_task<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let payload = submit_payload(&s.target.store_uri, &s.options);
        let resp = signed_post(ctx, &s.endpoint.base_url, SUBMIT_PATH, &s.tdid, &payload).await?;
        let id = str_at(data_of(&resp)?, "id");
        if id.is_empty() {
            return Err(AsrError::protocol("missing id in response"));
        }
        s.query_id = id.to_string();
        debug!(query_id = %s.query_id, "task submitted");
        Ok(())
    })
}

fn query_result<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let (base, tdid) = (s.endpoint.base_url.as_str(), s.tdid.as_str());
        let payload = json!({
            "id": s.query_id,
            "pack_options": {"need_attribute": true},
        });
        let payload = &payload;
        let result = poll_until(&ctx.poll, &ctx.cancel, "jianying", move |_attempt| async move {
            let resp = signed_post(ctx, base, QUERY_PATH, tdid, payload).await?;
            query_status(resp)
        })
        .await?;
        s.result = Some(result);
        Ok(())
    })
}

/// Complete once `data.utterances` is an array; the whole response is the
/// payload. Any other value under that key is a protocol failure.
fn query_status(resp: Value) -> AsrResult<PollStatus<Value>> {
    let ready = match data_of(&resp)?.get("utterances") {
        None => false,
        Some(Value::Array(_)) => true,
        Some(_) => return Err(AsrError::protocol("invalid utterances field in response")),
    };
    Ok(if ready {
        PollStatus::Complete(resp)
    } else {
        PollStatus::Pending
    })
}

fn submit_payload(store_uri: &str, options: &JianYingOptions) -> Value {
    json!({
        "adjust_endtime": 200,
        "audio": store_uri,
        "caption_type": 2,
        "client_request_id": CLIENT_REQUEST_ID,
        "max_lines": 1,
        "songs_info": [{
            "end_time": seconds_value(options.end_time),
            "id": "",
            "start_time": seconds_value(options.start_time),
        }],
        "words_per_line": 16,
    })
}

/// Whole seconds serialize as integers, fractions as floats.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn seconds_value(seconds: f64) -> Value {
    if seconds.fract() == 0.0 && seconds.abs() < 1e15 {
        Value::from(seconds as i64)
    } else {
        Value::from(seconds)
    }
}

/// POST `payload` to `base + path` with the application signature headers.
async fn signed_post(
    ctx: &StepContext,
    base: &str,
    path: &str,
    tdid: &str,
    payload: &Value,
) -> AsrResult<Value> {
    let signature = sign_path(path, tdid);
    let mut req = ctx
        .client
        .post(format!("{base}{path}"))
        .header(USER_AGENT, API_USER_AGENT)
        .json(payload);
    for (name, value) in signature.headers() {
        req = req.header(name, value);
    }
    let resp = read_json(req.send().await?).await?;
    check_ret(&resp)?;
    Ok(resp)
}

fn check_ret(resp: &Value) -> AsrResult<()> {
    let ret = str_at(resp, "ret");
    if ret == "0" {
        return Ok(());
    }
    Err(AsrError::protocol(format!(
        "API returned error: ret={ret}, errmsg={}",
        str_at(resp, "errmsg")
    )))
}

fn data_of(resp: &Value) -> AsrResult<&Value> {
    resp.get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| AsrError::protocol("missing data field in response"))
}

fn upload_target(resp: ApplyUploadResponse) -> AsrResult<UploadTarget> {
    let address = resp
        .result
        .ok_or_else(|| AsrError::protocol("missing Result field in response"))?
        .upload_address
        .ok_or_else(|| AsrError::protocol("missing UploadAddress field"))?;
    let store = address
        .store_infos
        .into_iter()
        .next()
        .ok_or_else(|| AsrError::protocol("missing or empty StoreInfos"))?;
    let host = address
        .upload_hosts
        .into_iter()
        .next()
        .ok_or_else(|| AsrError::protocol("missing or empty UploadHosts"))?;
    Ok(UploadTarget {
        host,
        store_uri: store.store_uri,
        auth: store.auth,
        upload_id: store.upload_id,
    })
}

/// The object store must answer with `success == 0`.
#[allow(clippy::float_cmp)]
fn require_success(body: &Value) -> AsrResult<()> {
    match body.get("success").and_then(Value::as_f64) {
        Some(v) if v == 0.0 => Ok(()),
        _ => Err(unexpected_success(body)),
    }
}

/// A numeric non-zero `success` fails; anything else passes.
#[allow(clippy::float_cmp)]
fn reject_failure(body: Option<&Value>) -> AsrResult<()> {
    match body.and_then(|b| b.get("success")).and_then(Value::as_f64) {
        Some(v) if v != 0.0 => Err(unexpected_success(body.unwrap_or(&Value::Null))),
        _ => Ok(()),
    }
}

fn unexpected_success(body: &Value) -> AsrError {
    AsrError::protocol(format!(
        "unexpected success value: {}",
        body.get("success").unwrap_or(&Value::Null)
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
