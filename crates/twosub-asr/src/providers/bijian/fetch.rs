//! Upload, task creation and polling against the bcut API.

use std::path::{Path, PathBuf};

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, ETAG, USER_AGENT};
use serde_json::{Value, json};
use tracing::debug;

use crate::errors::{AsrError, AsrResult};
use crate::http::{ensure_success, file_len, file_range_body, read_json};
use crate::poll::{PollStatus, poll_until};
use crate::workflow::{StepContext, StepFuture, Workflow};

const CREATE_PATH: &str = "/resource/create";
const COMPLETE_PATH: &str = "/resource/create/complete";
const TASK_PATH: &str = "/task";
const RESULT_PATH: &str = "/task/result";

const USER_AGENT_VALUE: &str = "Bilibili/1.0.0 (https://www.bilibili.com)";
/// Model used for upload and task creation.
const MODEL_ID: &str = "8";
/// Model queried for results.
const RESULT_MODEL_ID: &str = "7";
/// Task state reported once recognition has finished.
const STATE_COMPLETE: f64 = 4.0;

/// Upload slot handed out by `request_upload`.
#[derive(Debug, Default)]
struct UploadGrant {
    upload_urls: Vec<String>,
    per_size: u64,
    in_boss_key: Value,
    resource_id: Value,
    upload_id: Value,
}

/// Per-fetch state.
pub(super) struct Session {
    audio: PathBuf,
    base_url: String,
    cookie: Option<String>,
    file_len: u64,
    grant: UploadGrant,
    etags: Vec<String>,
    download_url: String,
    task_id: String,
    pub(super) result: Option<Value>,
}

impl Session {
    pub(super) fn new(audio: &Path, base_url: &str, cookie: Option<String>) -> Self {
        Self {
            audio: audio.to_path_buf(),
            base_url: base_url.to_string(),
            cookie,
            file_len: 0,
            grant: UploadGrant::default(),
            etags: Vec::new(),
            download_url: String::new(),
            task_id: String::new(),
            result: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

pub(super) fn workflow() -> Workflow<Session> {
    Workflow::new("bijian")
        .step("read_file", "failed to read audio file", read_file)
        .step("request_upload", "failed to request upload", request_upload)
        .step("upload_parts", "failed to upload parts", upload_parts)
        .step("commit_upload", "failed to commit upload", commit_upload)
        .step("create_task", "failed to create task", create_task)
        .step("poll_result", "failed to poll result", poll_result)
}

fn read_file<'a>(s: &'a mut Session, _ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        s.file_len = file_len(&s.audio).await?;
        debug!(bytes = s.file_len, "audio file found");
        Ok(())
    })
}

fn request_upload<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let payload = json!({
            "type": 2,
            "name": "audio.mp3",
            "size": s.file_len,
            "ResourceFileType": "mp3",
            "model_id": MODEL_ID,
        });
        let resp = post_json(ctx, &s.url(CREATE_PATH), s.cookie.as_deref(), &payload).await?;
        s.grant = parse_grant(data_of(&resp)?, s.file_len)?;
        debug!(
            parts = s.grant.upload_urls.len(),
            per_size = s.grant.per_size,
            "upload granted"
        );
        Ok(())
    })
}

fn upload_parts<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let mut etags = Vec::with_capacity(s.grant.upload_urls.len());
        for (index, url) in s.grant.upload_urls.iter().enumerate() {
            let (offset, len) = part_range(index, s.grant.per_size, s.file_len);
            let mut req = ctx
                .client
                .put(url)
                .header(USER_AGENT, USER_AGENT_VALUE)
                .header(CONTENT_TYPE, "application/json")
                .header(CONTENT_LENGTH, len)
                .body(file_range_body(&s.audio, offset, len).await?);
            if let Some(cookie) = &s.cookie {
                req = req.header(COOKIE, cookie);
            }

            let resp = ensure_success(req.send().await?).await?;
            let etag = resp
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            debug!(part = index, offset, len, etag = %etag, "part uploaded");
            etags.push(etag);
        }
        s.etags = etags;
        Ok(())
    })
}

fn commit_upload<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let payload = json!({
            "InBossKey": s.grant.in_boss_key,
            "ResourceId": s.grant.resource_id,
            "Etags": s.etags.join(","),
            "UploadId": s.grant.upload_id,
            "model_id": MODEL_ID,
        });
        let resp = post_json(ctx, &s.url(COMPLETE_PATH), s.cookie.as_deref(), &payload).await?;
        s.download_url = required_str(data_of(&resp)?, "download_url")?.to_string();
        Ok(())
    })
}

fn create_task<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let payload = json!({
            "resource": s.download_url,
            "model_id": MODEL_ID,
        });
        let resp = post_json(ctx, &s.url(TASK_PATH), s.cookie.as_deref(), &payload).await?;
        s.task_id = required_str(data_of(&resp)?, "task_id")?.to_string();
        debug!(task_id = %s.task_id, "task created");
        Ok(())
    })
}

fn poll_result<'a>(s: &'a mut Session, ctx: &'a StepContext) -> StepFuture<'a> {
    Box::pin(async move {
        let url = s.url(RESULT_PATH);
        let (url, task_id, cookie) = (url.as_str(), s.task_id.as_str(), s.cookie.as_deref());
        let result = poll_until(&ctx.poll, &ctx.cancel, "bijian", move |_attempt| {
            query_result(ctx, url, task_id, cookie)
        })
        .await?;
        s.result = Some(result);
        Ok(())
    })
}

async fn query_result(
    ctx: &StepContext,
    url: &str,
    task_id: &str,
    cookie: Option<&str>,
) -> AsrResult<PollStatus<Value>> {
    let mut req = ctx
        .client
        .get(url)
        .query(&[("model_id", RESULT_MODEL_ID), ("task_id", task_id)])
        .header(USER_AGENT, USER_AGENT_VALUE);
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    let resp = read_json(req.send().await?).await?;
    task_status(&resp)
}

/// Interpret one `/task/result` response.
#[allow(clippy::float_cmp)]
fn task_status(resp: &Value) -> AsrResult<PollStatus<Value>> {
    let data = data_of(resp)?;
    let state = data
        .get("state")
        .and_then(Value::as_f64)
        .ok_or_else(|| AsrError::protocol("missing state in response"))?;
    if state != STATE_COMPLETE {
        return Ok(PollStatus::Pending);
    }
    let embedded = required_str(data, "result")?;
    Ok(PollStatus::Complete(serde_json::from_str(embedded)?))
}

async fn post_json(
    ctx: &StepContext,
    url: &str,
    cookie: Option<&str>,
    payload: &Value,
) -> AsrResult<Value> {
    let mut req = ctx
        .client
        .post(url)
        .header(USER_AGENT, USER_AGENT_VALUE)
        .json(payload);
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    read_json(req.send().await?).await
}

fn data_of(resp: &Value) -> AsrResult<&Value> {
    resp.get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| AsrError::protocol("missing data field in response"))
}

fn required_str<'a>(obj: &'a Value, key: &str) -> AsrResult<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| AsrError::protocol(format!("missing {key} in response")))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_grant(data: &Value, file_len: u64) -> AsrResult<UploadGrant> {
    let urls = data
        .get("upload_urls")
        .and_then(Value::as_array)
        .ok_or_else(|| AsrError::protocol("missing upload_urls in response"))?;
    let upload_urls = urls
        .iter()
        .enumerate()
        .map(|(i, u)| {
            u.as_str()
                .map(str::to_owned)
                .ok_or_else(|| AsrError::protocol(format!("invalid upload_url at index {i}")))
        })
        .collect::<AsrResult<Vec<_>>>()?;

    let per_size = data
        .get("per_size")
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 1.0).map(|f| f as u64)))
        .ok_or_else(|| AsrError::protocol("missing per_size in response"))?;
    if per_size == 0 {
        return Err(AsrError::protocol("per_size must be positive"));
    }
    let covered = (upload_urls.len() as u64).saturating_mul(per_size);
    if covered < file_len {
        return Err(AsrError::protocol(format!(
            "upload grant covers {covered} of {file_len} bytes"
        )));
    }

    let field = |key: &str| data.get(key).cloned().unwrap_or(Value::Null);
    Ok(UploadGrant {
        upload_urls,
        per_size,
        in_boss_key: field("in_boss_key"),
        resource_id: field("resource_id"),
        upload_id: field("upload_id"),
    })
}

/// Byte range `(offset, len)` of part `index`, clamped to the file.
fn part_range(index: usize, per_size: u64, file_len: u64) -> (u64, u64) {
    let start = (index as u64).saturating_mul(per_size).min(file_len);
    let end = start.saturating_add(per_size).min(file_len);
    (start, end - start)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
