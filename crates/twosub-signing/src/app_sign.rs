//! Application-level request signature.
//!
//! The backend verifies requests with an MD5 digest over
//! `9e2c|{path_tail}|{platform}|{app_version}|{device_time}|{tdid}|11ac`,
//! where `path_tail` is the last seven characters of the request path and
//! `device_time` the current Unix timestamp in seconds.

use md5::{Digest, Md5};

/// Leading marker of the signed template.
const SIGN_PREFIX: &str = "9e2c";
/// Trailing marker of the signed template.
const SIGN_SUFFIX: &str = "11ac";
/// Number of trailing path characters included in the template.
const PATH_TAIL_LEN: usize = 7;

/// Platform code sent as `pf`.
pub const PLATFORM: &str = "4";
/// Application version sent as `appvr`.
pub const APP_VERSION: &str = "6.6.0";
/// Signature scheme version sent as `sign-ver`.
pub const SIGN_VERSION: &str = "1";

/// Signature material for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppSignature {
    /// Lowercase hex MD5 digest.
    pub sign: String,
    /// Unix timestamp (seconds) the digest was computed for.
    pub device_time: String,
    /// Device identifier included in the digest.
    pub tdid: String,
}

impl AppSignature {
    /// Header set that must accompany the signed request.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("appvr", APP_VERSION.to_string()),
            ("device-time", self.device_time.clone()),
            ("pf", PLATFORM.to_string()),
            ("sign", self.sign.clone()),
            ("sign-ver", SIGN_VERSION.to_string()),
            ("tdid", self.tdid.clone()),
        ]
    }
}

/// Sign `path` for device `tdid` at the current time.
pub fn sign_path(path: &str, tdid: &str) -> AppSignature {
    sign_path_at(path, tdid, chrono::Utc::now().timestamp())
}

/// Sign `path` for device `tdid` at an explicit Unix timestamp.
pub fn sign_path_at(path: &str, tdid: &str, unix_seconds: i64) -> AppSignature {
    let device_time = unix_seconds.to_string();
    let template = format!(
        "{SIGN_PREFIX}|{}|{PLATFORM}|{APP_VERSION}|{device_time}|{tdid}|{SIGN_SUFFIX}",
        path_tail(path)
    );

    let mut hasher = Md5::new();
    hasher.update(template.as_bytes());
    let sign = hex::encode(hasher.finalize());

    AppSignature {
        sign,
        device_time,
        tdid: tdid.to_string(),
    }
}

/// Last [`PATH_TAIL_LEN`] characters of `path`, or all of it when shorter.
fn path_tail(path: &str) -> &str {
    match path.char_indices().rev().nth(PATH_TAIL_LEN - 1) {
        Some((idx, _)) => &path[idx..],
        None => path,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TDID: &str = "3913278516897751";

    #[test]
    fn path_tail_takes_last_seven() {
        assert_eq!(path_tail("/lv/v1/upload_sign"), "ad_sign");
        assert_eq!(path_tail("/lv/v1/audio_subtitle/query"), "e/query");
        assert_eq!(path_tail("/short"), "/short");
        assert_eq!(path_tail(""), "");
    }

    #[test]
    fn known_digest() {
        let sig = sign_path_at("/lv/v1/upload_sign", TDID, 1_700_000_000);
        assert_eq!(sig.sign, "0f6b37f5fde967bcbe3ad172f0271c90");
        assert_eq!(sig.device_time, "1700000000");
        assert_eq!(sig.tdid, TDID);
    }

    #[test]
    fn short_path_is_used_whole() {
        let sig = sign_path_at("/short", TDID, 1_700_000_000);
        assert_eq!(sig.sign, "441c6bc446ac6dc6219bd8f8ea0794bb");
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let sig = sign_path("/lv/v1/audio_subtitle/submit", TDID);
        assert_eq!(sig.sign.len(), 32);
        assert!(sig.sign.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn headers_carry_signature_fields() {
        let sig = sign_path_at("/lv/v1/upload_sign", TDID, 1_700_000_000);
        let headers = sig.headers();
        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("sign"), Some("0f6b37f5fde967bcbe3ad172f0271c90"));
        assert_eq!(get("device-time"), Some("1700000000"));
        assert_eq!(get("tdid"), Some(TDID));
        assert_eq!(get("pf"), Some("4"));
        assert_eq!(get("appvr"), Some("6.6.0"));
        assert_eq!(get("sign-ver"), Some("1"));
    }
}
