use axum::http::HeaderMap;
use tracing::debug;

use super::{constant_time_eq, is_clean_header_value, single_header};

/// Header checked when an endpoint does not name one.
pub const DEFAULT_SHARED_SECRET_HEADER: &str = "Authorization";

/// Verify that `header_name` carries exactly `secret`.
///
/// The header is looked up case-insensitively. Values with surrounding
/// whitespace or control characters are rejected without comparison. An
/// empty secret never validates.
pub fn shared_secret_valid(headers: &HeaderMap, secret: &str, header_name: &str) -> bool {
    if secret.is_empty() {
        debug!("Shared secret is empty, rejecting");
        return false;
    }

    let Some(provided) = single_header(headers, header_name) else {
        debug!(header = header_name, "Shared secret header missing");
        return false;
    };

    if !is_clean_header_value(provided) {
        debug!(header = header_name, "Shared secret header failed hygiene check");
        return false;
    }

    constant_time_eq(provided, secret)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_matching_secret_validates() {
        let headers = headers_with("authorization", "s3cr3t-token");
        assert!(shared_secret_valid(&headers, "s3cr3t-token", "Authorization"));
    }

    #[test]
    fn test_custom_header_case_insensitive() {
        let headers = headers_with("x-webhook-token", "token");
        assert!(shared_secret_valid(&headers, "token", "X-WEBHOOK-TOKEN"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let headers = headers_with("authorization", "guess");
        assert!(!shared_secret_valid(&headers, "token", "Authorization"));
    }

    #[test]
    fn test_whitespace_variants_rejected() {
        for value in [" token", "token ", " token "] {
            let headers = headers_with("authorization", value);
            assert!(
                !shared_secret_valid(&headers, "token", "Authorization"),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(!shared_secret_valid(&HeaderMap::new(), "token", "Authorization"));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let headers = headers_with("authorization", "x");
        assert!(!shared_secret_valid(&headers, "", "Authorization"));
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let headers = headers_with("authorization", "token");
        assert!(!shared_secret_valid(&headers, "token", "bad name"));
    }
}
