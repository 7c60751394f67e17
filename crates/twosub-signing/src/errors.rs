//! Signing error types.

/// Errors that can occur while computing request signatures.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The HMAC implementation rejected the key.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// The request timestamp is not in `YYYYMMDDTHHMMSSZ` form.
    #[error("malformed request timestamp: {0}")]
    MalformedTimestamp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            SigningError::InvalidKey("bad length".into()).to_string(),
            "invalid signing key: bad length"
        );
        assert!(
            SigningError::MalformedTimestamp("2024".into())
                .to_string()
                .contains("2024")
        );
    }
}
