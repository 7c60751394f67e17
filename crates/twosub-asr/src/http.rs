//! HTTP plumbing shared by the backends.

use std::io::SeekFrom;
use std::path::Path;

use reqwest::Response;
use serde_json::{Map, Value};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use twosub_settings::HttpSettings;

use crate::errors::{AsrError, AsrResult};

/// Build a client with the configured per-request timeout.
pub fn build_client(settings: &HttpSettings) -> AsrResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()?)
}

/// Pass 2xx responses through; turn anything else into [`AsrError::Api`]
/// carrying the raw body.
pub(crate) async fn ensure_success(response: Response) -> AsrResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(text) => text,
        Err(e) => format!("failed to read body: {e}"),
    };
    Err(AsrError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Decode a successful response body, or `None` when it is empty.
pub(crate) async fn read_optional_json(response: Response) -> AsrResult<Option<Value>> {
    let response = ensure_success(response).await?;
    let body = response.bytes().await?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&body)?))
}

/// Decode a successful response body; an empty body is an empty object.
pub(crate) async fn read_json(response: Response) -> AsrResult<Value> {
    Ok(read_optional_json(response)
        .await?
        .unwrap_or_else(|| Value::Object(Map::new())))
}

/// Size of a regular file.
pub(crate) async fn file_len(path: &Path) -> AsrResult<u64> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Err(AsrError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        )));
    }
    Ok(meta.len())
}

/// Streaming request body over `len` bytes of `path` starting at `offset`.
///
/// The file handle lives inside the body and is closed when the request
/// finishes or is dropped.
pub(crate) async fn file_range_body(path: &Path, offset: u64, len: u64) -> AsrResult<reqwest::Body> {
    let mut file = tokio::fs::File::open(path).await?;
    if offset > 0 {
        let _ = file.seek(SeekFrom::Start(offset)).await?;
    }
    Ok(reqwest::Body::wrap_stream(ReaderStream::new(file.take(len))))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
