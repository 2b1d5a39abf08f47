//! Stateless webhook signature verifiers.
//!
//! # Security Features
//!
//! - **Constant-time comparison**: every secret or signature comparison goes
//!   through [`constant_time_eq`] to prevent timing attacks
//! - **Fail-closed**: verifiers return `bool` and never propagate errors; any
//!   internal fault (missing header, unknown algorithm, bad timestamp) is
//!   treated as an invalid request
//! - **Header hygiene**: values padded with whitespace or carrying control
//!   characters are rejected before comparison
//! - **Replay protection**: optional timestamp header checked against a
//!   tolerance window in both directions
//!
//! # Verifiers
//!
//! - [`shared_secret_valid`] - header value must equal the secret
//! - [`hmac_valid`] - header must carry `HMAC(secret, signing_payload)` in the
//!   configured format

mod hmac;
mod shared_secret;

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

pub use self::hmac::{
    Algorithm, DEFAULT_HMAC_HEADER, DEFAULT_TIMESTAMP_TOLERANCE_SECS, DEFAULT_VERSION_PREFIX,
    SignatureFormat, compute_signature, hmac_valid, hmac_valid_at,
};
pub use self::shared_secret::{DEFAULT_SHARED_SECRET_HEADER, shared_secret_valid};

/// Maximum accepted length for signature, secret and timestamp header values.
pub const MAX_HEADER_VALUE_LENGTH: usize = 4096;

/// Perform constant-time comparison of two strings.
///
/// Length differences short-circuit, which leaks only the length of the
/// expected value, never its content.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Extract a single header value by case-insensitive name.
///
/// Returns `None` when the header is absent, repeated, or not valid visible
/// ASCII. A repeated signature header is ambiguous and never trusted.
pub(crate) fn single_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let mut values = headers.get_all(name).iter();
    let first = values.next()?;
    if values.next().is_some() {
        return None;
    }
    first.to_str().ok()
}

/// Whether a header value is acceptable for comparison.
///
/// A legitimately sent secret or signature never needs trimming, so leading
/// or trailing whitespace is treated as tampering, as are control characters.
pub(crate) fn is_clean_header_value(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_HEADER_VALUE_LENGTH {
        return false;
    }

    let padded = value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace);
    !padded && !value.chars().any(char::is_control)
}
