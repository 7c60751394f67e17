//! # twosub-signing
//!
//! Request authentication primitives for backends that sign their calls:
//!
//! - [`app_sign`]: MD5 digest over a fixed `9e2c|…|11ac` template, sent as
//!   `sign` / `device-time` / `tdid` headers.
//! - [`sigv4`]: region/service scoped HMAC-SHA256 signature chain used by
//!   the upload-authorization host.
//! - [`device`]: numeric device fingerprint (`tdid`) derivation.
//! - [`checksum`]: CRC32 and SHA-256 hex helpers.

#![deny(unsafe_code)]

pub mod app_sign;
pub mod checksum;
pub mod device;
pub mod errors;
pub mod sigv4;

pub use app_sign::{AppSignature, sign_path, sign_path_at};
pub use checksum::{Crc32Writer, crc32_hex, sha256_hex};
pub use device::{device_id, device_id_for};
pub use errors::SigningError;
pub use sigv4::{Credentials, SignedRequest, SigningScope, amz_date_now, sign_request};
