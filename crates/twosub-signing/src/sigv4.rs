//! Region/service scoped signature chain (`AWS4-HMAC-SHA256`).
//!
//! Used by the upload-authorization host. The signature covers:
//!
//! 1. A canonical request: method, URI path, canonical query string,
//!    lower-cased and trimmed headers sorted by name, the signed header
//!    list and the SHA-256 of the payload.
//! 2. A string-to-sign: algorithm, request timestamp, credential scope
//!    (`date/region/service/aws4_request`) and the SHA-256 of (1).
//! 3. A signing key derived by chaining HMAC-SHA256 over
//!    `"AWS4" + secret` with the date, region, service and terminator.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::checksum::sha256_hex;
use crate::errors::SigningError;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm identifier placed in the string-to-sign and the header.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
/// Fixed terminal element of the credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";
/// Header carrying the request timestamp.
const DATE_HEADER: &str = "x-amz-date";
/// Header carrying the temporary session token.
const TOKEN_HEADER: &str = "x-amz-security-token";

/// Temporary storage credentials issued by the backend.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Access key identifier (sent in clear inside the credential scope).
    pub access_key_id: String,
    /// Secret used to derive the signing key. Never sent.
    pub secret_access_key: String,
    /// Session token sent as `x-amz-security-token`.
    pub session_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Region and service the signature is scoped to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningScope {
    /// Region name (e.g. `"cn"`).
    pub region: String,
    /// Service name (e.g. `"vod"`).
    pub service: String,
}

impl SigningScope {
    /// Build a scope.
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            service: service.into(),
        }
    }
}

/// Output of [`sign_request`].
#[derive(Clone, Debug)]
pub struct SignedRequest {
    /// Canonical query string; use it verbatim in the request URL.
    pub query: String,
    /// Headers to attach, including `authorization`.
    pub headers: Vec<(String, String)>,
    /// Hex signature.
    pub signature: String,
}

impl SignedRequest {
    /// Value of the `authorization` header.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == "authorization")
            .map(|(_, v)| v.as_str())
    }
}

/// Current time formatted as `YYYYMMDDTHHMMSSZ`.
pub fn amz_date_now() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

/// Sign a request.
///
/// `amz_date` is the request timestamp in `YYYYMMDDTHHMMSSZ` form. The
/// date and token headers are added automatically; `extra_headers` are
/// signed as well.
#[allow(clippy::too_many_arguments)]
pub fn sign_request(
    credentials: &Credentials,
    scope: &SigningScope,
    method: &str,
    uri: &str,
    query: &[(&str, String)],
    extra_headers: &[(&str, &str)],
    payload: &[u8],
    amz_date: &str,
) -> Result<SignedRequest, SigningError> {
    let datestamp = datestamp(amz_date)?;

    let mut headers: Vec<(String, String)> = vec![(DATE_HEADER.to_string(), amz_date.to_string())];
    if !credentials.session_token.is_empty() {
        headers.push((TOKEN_HEADER.to_string(), credentials.session_token.clone()));
    }
    headers.extend(
        extra_headers
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
    );

    let canonical_query = canonical_query(query);
    let (canonical_headers, signed_headers) = canonical_headers(&headers);
    let canonical = canonical_request(
        method,
        uri,
        &canonical_query,
        &canonical_headers,
        &signed_headers,
        payload,
    );

    let credential_scope = format!(
        "{datestamp}/{}/{}/{SCOPE_TERMINATOR}",
        scope.region, scope.service
    );
    let to_sign = string_to_sign(amz_date, &credential_scope, &canonical);
    let key = signing_key(
        &credentials.secret_access_key,
        datestamp,
        &scope.region,
        &scope.service,
    )?;
    let signature = hex::encode(hmac_sha256(&key, &to_sign)?);

    let authorization = format!(
        "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    );
    headers.push(("authorization".to_string(), authorization));

    Ok(SignedRequest {
        query: canonical_query,
        headers,
        signature,
    })
}

/// Join query parameters as `k=v&…`, ordered by parameter name.
///
/// Names are compared byte-wise, so upper-case names sort before
/// lower-case ones (`Version` before `s`), matching the server's
/// canonicalization. This is deliberately not lowercase-key ordering, which
/// would put `s` before `Version`.
pub fn canonical_query(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(&b.1)));
    sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical header block and `;`-joined signed header list.
///
/// Names are lower-cased, values trimmed, and entries sorted by name.
pub fn canonical_headers(headers: &[(String, String)]) -> (String, String) {
    let mut entries: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let block: String = entries.iter().map(|(k, v)| format!("{k}:{v}\n")).collect();
    let signed = entries
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (block, signed)
}

/// Assemble the canonical request string.
pub fn canonical_request(
    method: &str,
    uri: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload: &[u8],
) -> String {
    let uri = if uri.is_empty() { "/" } else { uri };
    format!(
        "{method}\n{uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{}",
        sha256_hex(payload)
    )
}

/// Build the string-to-sign.
pub fn string_to_sign(amz_date: &str, credential_scope: &str, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    )
}

/// Derive the signing key: HMAC chain over date, region, service, terminator.
pub fn signing_key(
    secret: &str,
    datestamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), datestamp)?;
    let k_region = hmac_sha256(&k_date, region)?;
    let k_service = hmac_sha256(&k_region, service)?;
    hmac_sha256(&k_service, SCOPE_TERMINATOR)
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>, SigningError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| SigningError::InvalidKey(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn datestamp(amz_date: &str) -> Result<&str, SigningError> {
    let well_formed = amz_date.is_ascii()
        && amz_date.len() == 16
        && amz_date.as_bytes()[8] == b'T'
        && amz_date.ends_with('Z')
        && amz_date[..8].bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(SigningError::MalformedTimestamp(amz_date.to_string()));
    }
    Ok(&amz_date[..8])
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";
    const AMZ_DATE: &str = "20240102T030405Z";

    fn credentials() -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: SECRET.into(),
            session_token: "session-token".into(),
        }
    }

    fn upload_params() -> Vec<(&'static str, String)> {
        vec![
            ("s", "5y0udbjapi".into()),
            ("Version", "2020-11-19".into()),
            ("SpaceName", "lv-mac-recognition".into()),
            ("IsInner", "1".into()),
            ("FileType", "object".into()),
            ("FileSize", "1024".into()),
            ("Action", "ApplyUploadInner".into()),
        ]
    }

    #[test]
    fn query_is_sorted_by_name() {
        assert_eq!(
            canonical_query(&upload_params()),
            "Action=ApplyUploadInner&FileSize=1024&FileType=object&IsInner=1\
             &SpaceName=lv-mac-recognition&Version=2020-11-19&s=5y0udbjapi"
        );
    }

    #[test]
    fn query_order_is_case_sensitive() {
        let params = vec![("a", "1".to_string()), ("B", "2".to_string())];
        assert_eq!(canonical_query(&params), "B=2&a=1");
        let query = canonical_query(&upload_params());
        assert!(query.find("Version=").unwrap() < query.find("&s=").unwrap());
    }

    #[test]
    fn headers_are_lowercased_trimmed_sorted() {
        let headers = vec![
            ("X-Amz-Security-Token".to_string(), "  tok ".to_string()),
            ("X-Amz-Date".to_string(), AMZ_DATE.to_string()),
        ];
        let (block, signed) = canonical_headers(&headers);
        assert_eq!(
            block,
            format!("x-amz-date:{AMZ_DATE}\nx-amz-security-token:tok\n")
        );
        assert_eq!(signed, "x-amz-date;x-amz-security-token");
    }

    #[test]
    fn canonical_request_hash_matches_reference() {
        let headers = vec![
            (DATE_HEADER.to_string(), AMZ_DATE.to_string()),
            (TOKEN_HEADER.to_string(), "session-token".to_string()),
        ];
        let (block, signed) = canonical_headers(&headers);
        let canonical = canonical_request(
            "GET",
            "/",
            &canonical_query(&upload_params()),
            &block,
            &signed,
            b"",
        );
        assert_eq!(
            sha256_hex(canonical.as_bytes()),
            "186e832d38e0c0b869ad2ceb1dda30337abad695ef6ed3b695a9d5b4bb5c9fb0"
        );
    }

    #[test]
    fn signature_matches_reference() {
        let signed = sign_request(
            &credentials(),
            &SigningScope::new("cn", "vod"),
            "GET",
            "/",
            &upload_params(),
            &[],
            b"",
            AMZ_DATE,
        )
        .unwrap();

        assert_eq!(
            signed.signature,
            "2abe75031df9a6bd90a7ad1a39b1b622f464fcac39d0e7c84fdee9922b6c0d26"
        );
        assert_eq!(
            signed.authorization(),
            Some(
                "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240102/cn/vod/aws4_request, \
                 SignedHeaders=x-amz-date;x-amz-security-token, \
                 Signature=2abe75031df9a6bd90a7ad1a39b1b622f464fcac39d0e7c84fdee9922b6c0d26"
            )
        );
        assert!(signed.headers.iter().any(|(k, v)| k == "x-amz-date" && v == AMZ_DATE));
    }

    #[test]
    fn signing_key_depends_on_every_scope_element() {
        let base = signing_key(SECRET, "20240102", "cn", "vod").unwrap();
        assert_ne!(base, signing_key(SECRET, "20240103", "cn", "vod").unwrap());
        assert_ne!(base, signing_key(SECRET, "20240102", "us", "vod").unwrap());
        assert_ne!(base, signing_key(SECRET, "20240102", "cn", "s3").unwrap());
        assert_eq!(base.len(), 32);
    }

    #[test]
    fn malformed_timestamp_rejected() {
        let err = sign_request(
            &credentials(),
            &SigningScope::new("cn", "vod"),
            "GET",
            "/",
            &[],
            &[],
            b"",
            "2024-01-02",
        )
        .unwrap_err();
        assert_matches!(err, SigningError::MalformedTimestamp(_));
    }

    #[test]
    fn amz_date_now_is_well_formed() {
        let now = amz_date_now();
        assert!(datestamp(&now).is_ok(), "{now}");
    }

    #[test]
    fn debug_redacts_secrets() {
        let dbg = format!("{:?}", credentials());
        assert!(dbg.contains("AKIDEXAMPLE"));
        assert!(!dbg.contains(SECRET));
        assert!(!dbg.contains("session-token"));
    }
}
