//! HMAC signature verification with provider-style formats.
//!
//! Signature header formats:
//!
//! | Format                | Header value                 |
//! |-----------------------|------------------------------|
//! | `algorithm=signature` | `sha256=<hex>` (GitHub)      |
//! | `signature_only`      | `<hex>`                      |
//! | `version=signature`   | `v0=<hex>` (Slack)           |
//!
//! When a `payload_template` is configured, the signed message is the
//! template with `{version}`, `{timestamp}` and `{body}` substituted, e.g.
//! Slack's `"{version}:{timestamp}:{body}"`.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use tracing::debug;

use super::{constant_time_eq, is_clean_header_value, single_header};
use crate::config::AuthConfig;

/// Signature header used when an endpoint does not name one.
pub const DEFAULT_HMAC_HEADER: &str = "X-Signature";

/// Version prefix for `version=signature` and `{version}` in templates.
pub const DEFAULT_VERSION_PREFIX: &str = "v0";

/// Replay window when a timestamp header is configured without a tolerance.
pub const DEFAULT_TIMESTAMP_TOLERANCE_SECS: u64 = 300;

const DEFAULT_ALGORITHM: &str = "sha256";
const DEFAULT_FORMAT: &str = "algorithm=signature";

/// Supported HMAC digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    /// Parse an algorithm name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" => Some(Algorithm::Sha1),
            "sha256" => Some(Algorithm::Sha256),
            "sha384" => Some(Algorithm::Sha384),
            "sha512" => Some(Algorithm::Sha512),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }

    /// Lowercase hex HMAC of `message` under `secret`.
    pub fn hex_digest(self, secret: &[u8], message: &[u8]) -> Option<String> {
        match self {
            Algorithm::Sha1 => hex_mac::<Hmac<Sha1>>(secret, message),
            Algorithm::Sha256 => hex_mac::<Hmac<Sha256>>(secret, message),
            Algorithm::Sha384 => hex_mac::<Hmac<Sha384>>(secret, message),
            Algorithm::Sha512 => hex_mac::<Hmac<Sha512>>(secret, message),
        }
    }
}

fn hex_mac<M: Mac + KeyInit>(secret: &[u8], message: &[u8]) -> Option<String> {
    let mut mac = <M as KeyInit>::new_from_slice(secret).ok()?;
    mac.update(message);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// How the signature is laid out in the header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFormat {
    AlgorithmPrefixed,
    SignatureOnly,
    VersionPrefixed,
}

impl SignatureFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "algorithm=signature" | "algorithm=hex" => Some(SignatureFormat::AlgorithmPrefixed),
            "signature_only" => Some(SignatureFormat::SignatureOnly),
            "version=signature" | "version=hex" => Some(SignatureFormat::VersionPrefixed),
            _ => None,
        }
    }
}

/// Verify an HMAC signature against the current wall clock.
///
/// Never fails: any missing header, unknown algorithm or format, stale
/// timestamp, or mismatch yields `false`.
pub fn hmac_valid(payload: &[u8], headers: &HeaderMap, secret: &str, config: &AuthConfig) -> bool {
    hmac_valid_at(payload, headers, secret, config, Utc::now().timestamp())
}

/// Verify an HMAC signature as of `now` (unix seconds).
pub fn hmac_valid_at(
    payload: &[u8],
    headers: &HeaderMap,
    secret: &str,
    config: &AuthConfig,
    now: i64,
) -> bool {
    verify(payload, headers, secret, config, now).unwrap_or(false)
}

fn verify(
    payload: &[u8],
    headers: &HeaderMap,
    secret: &str,
    config: &AuthConfig,
    now: i64,
) -> Option<bool> {
    if secret.is_empty() {
        debug!("HMAC secret is empty, rejecting");
        return None;
    }

    let header_name = config.header.as_deref().unwrap_or(DEFAULT_HMAC_HEADER);
    let provided = single_header(headers, header_name)?;
    if !is_clean_header_value(provided) {
        debug!(header = header_name, "Signature header failed hygiene check");
        return None;
    }

    let timestamp = match &config.timestamp_header {
        Some(name) => {
            let value = single_header(headers, name)?;
            if !is_clean_header_value(value) {
                return None;
            }
            let tolerance = config
                .timestamp_tolerance
                .unwrap_or(DEFAULT_TIMESTAMP_TOLERANCE_SECS);
            if !timestamp_fresh(value, now, tolerance) {
                debug!(header = %name, "Timestamp outside tolerance window");
                return None;
            }
            Some(value)
        }
        None => None,
    };

    let expected = compute_signature(payload, secret, config, timestamp)?;
    Some(constant_time_eq(&expected, provided))
}

/// Compute the header value a sender would produce for `payload`.
///
/// Returns `None` for an unknown algorithm or format, or when the payload
/// template references `{timestamp}` and no timestamp is given.
pub fn compute_signature(
    payload: &[u8],
    secret: &str,
    config: &AuthConfig,
    timestamp: Option<&str>,
) -> Option<String> {
    let algorithm = Algorithm::parse(config.algorithm.as_deref().unwrap_or(DEFAULT_ALGORITHM))?;
    let format = SignatureFormat::parse(config.format.as_deref().unwrap_or(DEFAULT_FORMAT))?;
    let version = config
        .version_prefix
        .as_deref()
        .unwrap_or(DEFAULT_VERSION_PREFIX);

    let message = signing_payload(payload, config.payload_template.as_deref(), version, timestamp)?;
    let digest = algorithm.hex_digest(secret.as_bytes(), &message)?;

    Some(match format {
        SignatureFormat::AlgorithmPrefixed => format!("{}={digest}", algorithm.as_str()),
        SignatureFormat::SignatureOnly => digest,
        SignatureFormat::VersionPrefixed => format!("{version}={digest}"),
    })
}

/// Build the signed message. The body is spliced in as raw bytes so
/// non-UTF-8 payloads sign exactly as received.
fn signing_payload(
    body: &[u8],
    template: Option<&str>,
    version: &str,
    timestamp: Option<&str>,
) -> Option<Vec<u8>> {
    let Some(template) = template else {
        return Some(body.to_vec());
    };

    let mut rendered = template.replace("{version}", version);
    if rendered.contains("{timestamp}") {
        rendered = rendered.replace("{timestamp}", timestamp?);
    }

    let mut message = Vec::with_capacity(rendered.len() + body.len());
    let mut segments = rendered.split("{body}");
    if let Some(first) = segments.next() {
        message.extend_from_slice(first.as_bytes());
    }
    for segment in segments {
        message.extend_from_slice(body);
        message.extend_from_slice(segment.as_bytes());
    }
    Some(message)
}

/// Accepts unix seconds or RFC 3339. Past and future skew are both bounded.
fn timestamp_fresh(value: &str, now: i64, tolerance: u64) -> bool {
    let parsed = if value.bytes().all(|b| b.is_ascii_digit()) {
        value.parse::<i64>().ok()
    } else {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.timestamp())
    };

    parsed.is_some_and(|ts| now.abs_diff(ts) <= tolerance)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const NOW: i64 = 1_700_000_000;

    fn github_config() -> AuthConfig {
        AuthConfig {
            kind: "hmac".to_string(),
            header: Some("X-Hub-Signature-256".to_string()),
            algorithm: Some("sha256".to_string()),
            format: Some("algorithm=signature".to_string()),
            ..AuthConfig::default()
        }
    }

    fn slack_config() -> AuthConfig {
        AuthConfig {
            kind: "hmac".to_string(),
            header: Some("X-Slack-Signature".to_string()),
            algorithm: Some("sha256".to_string()),
            format: Some("version=signature".to_string()),
            version_prefix: Some("v0".to_string()),
            timestamp_header: Some("X-Slack-Request-Timestamp".to_string()),
            timestamp_tolerance: Some(300),
            payload_template: Some("{version}:{timestamp}:{body}".to_string()),
            ..AuthConfig::default()
        }
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_known_sha256_vector() {
        // RFC 4231 test case 2
        let digest = Algorithm::Sha256
            .hex_digest(b"Jefe", b"what do ya want for nothing?")
            .unwrap();
        assert_eq!(
            digest,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_github_style_signature_validates() {
        let config = github_config();
        let body = br#"{"action":"opened"}"#;
        let signature = compute_signature(body, "secret", &config, None).unwrap();
        assert!(signature.starts_with("sha256="));

        let headers = headers(&[("x-hub-signature-256", &signature)]);
        assert!(hmac_valid_at(body, &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let config = github_config();
        let signature = compute_signature(b"original", "secret", &config, None).unwrap();
        let headers = headers(&[("x-hub-signature-256", &signature)]);

        assert!(!hmac_valid_at(b"tampered", &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = github_config();
        let signature = compute_signature(b"body", "other", &config, None).unwrap();
        let headers = headers(&[("x-hub-signature-256", &signature)]);

        assert!(!hmac_valid_at(b"body", &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_single_byte_payload_change_rejected() {
        let config = github_config();
        let body = br#"{"action":"opened","number":42}"#.to_vec();
        let signature = compute_signature(&body, "secret", &config, None).unwrap();
        let headers = headers(&[("x-hub-signature-256", &signature)]);
        assert!(hmac_valid_at(&body, &headers, "secret", &config, NOW));

        for index in [0, body.len() / 2, body.len() - 1] {
            let mut flipped = body.clone();
            flipped[index] ^= 0x01;
            assert!(
                !hmac_valid_at(&flipped, &headers, "secret", &config, NOW),
                "byte {index}"
            );
        }
    }

    #[test]
    fn test_single_byte_secret_change_rejected() {
        let config = github_config();
        let signature = compute_signature(b"body", "secret", &config, None).unwrap();
        let headers = headers(&[("x-hub-signature-256", &signature)]);

        for other in ["secreu", "tecret", "seCret"] {
            assert!(!hmac_valid_at(b"body", &headers, other, &config, NOW), "{other}");
        }
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(!hmac_valid_at(b"body", &HeaderMap::new(), "secret", &github_config(), NOW));
    }

    #[test]
    fn test_defaults_apply() {
        let config = AuthConfig {
            kind: "hmac".to_string(),
            ..AuthConfig::default()
        };
        let signature = compute_signature(b"body", "secret", &config, None).unwrap();
        assert!(signature.starts_with("sha256="));

        let headers = headers(&[("x-signature", &signature)]);
        assert!(hmac_valid_at(b"body", &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_signature_only_format() {
        let config = AuthConfig {
            format: Some("signature_only".to_string()),
            algorithm: Some("sha1".to_string()),
            ..github_config()
        };
        let signature = compute_signature(b"body", "secret", &config, None).unwrap();
        assert_eq!(signature.len(), 40);
        assert!(!signature.contains('='));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let config = AuthConfig {
            algorithm: Some("md5".to_string()),
            ..github_config()
        };
        assert!(compute_signature(b"body", "secret", &config, None).is_none());

        let headers = headers(&[("x-hub-signature-256", "md5=abc")]);
        assert!(!hmac_valid_at(b"body", &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_padded_signature_rejected() {
        let config = github_config();
        let signature = compute_signature(b"body", "secret", &config, None).unwrap();
        let headers = headers(&[("x-hub-signature-256", &format!("{signature} "))]);

        assert!(!hmac_valid_at(b"body", &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_slack_style_signature_validates() {
        let config = slack_config();
        let ts = NOW.to_string();
        let signature = compute_signature(b"token=abc", "secret", &config, Some(&ts)).unwrap();
        assert!(signature.starts_with("v0="));

        let headers = headers(&[
            ("x-slack-signature", &signature),
            ("x-slack-request-timestamp", &ts),
        ]);
        assert!(hmac_valid_at(b"token=abc", &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_template_substitution() {
        let message =
            signing_payload(b"BODY", Some("{version}:{timestamp}:{body}"), "v0", Some("123")).unwrap();
        assert_eq!(message, b"v0:123:BODY");
    }

    #[test]
    fn test_template_needs_timestamp() {
        assert!(signing_payload(b"x", Some("{timestamp}:{body}"), "v0", None).is_none());
    }

    fn slack_signed_at(ts: i64) -> HeaderMap {
        let ts = ts.to_string();
        let signature = compute_signature(b"x", "secret", &slack_config(), Some(&ts)).unwrap();
        headers(&[
            ("x-slack-signature", &signature),
            ("x-slack-request-timestamp", &ts),
        ])
    }

    #[test]
    fn test_timestamp_tolerance_boundary() {
        let config = slack_config();
        for ts in [NOW - 300, NOW + 300] {
            assert!(hmac_valid_at(b"x", &slack_signed_at(ts), "secret", &config, NOW), "{ts}");
        }
        for ts in [NOW - 301, NOW + 301] {
            assert!(!hmac_valid_at(b"x", &slack_signed_at(ts), "secret", &config, NOW), "{ts}");
        }
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let config = slack_config();
        let stale = (NOW - 600).to_string();
        let signature = compute_signature(b"x", "secret", &config, Some(&stale)).unwrap();
        let headers = headers(&[
            ("x-slack-signature", &signature),
            ("x-slack-request-timestamp", &stale),
        ]);

        assert!(!hmac_valid_at(b"x", &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let config = slack_config();
        let future = (NOW + 600).to_string();
        let signature = compute_signature(b"x", "secret", &config, Some(&future)).unwrap();
        let headers = headers(&[
            ("x-slack-signature", &signature),
            ("x-slack-request-timestamp", &future),
        ]);

        assert!(!hmac_valid_at(b"x", &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_missing_timestamp_rejected() {
        let config = slack_config();
        let ts = NOW.to_string();
        let signature = compute_signature(b"x", "secret", &config, Some(&ts)).unwrap();
        let headers = headers(&[("x-slack-signature", &signature)]);

        assert!(!hmac_valid_at(b"x", &headers, "secret", &config, NOW));
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(timestamp_fresh("1700000000", NOW, 300));
        assert!(timestamp_fresh("2023-11-14T22:13:20Z", NOW, 300));
        assert!(!timestamp_fresh("yesterday", NOW, 300));
        assert!(!timestamp_fresh("-5", NOW, 300));
        assert!(!timestamp_fresh("99999999999999999999999", NOW, 300));
    }

    #[test]
    fn test_format_aliases() {
        assert_eq!(
            SignatureFormat::parse("algorithm=hex"),
            Some(SignatureFormat::AlgorithmPrefixed)
        );
        assert_eq!(
            SignatureFormat::parse("version=hex"),
            Some(SignatureFormat::VersionPrefixed)
        );
        assert_eq!(SignatureFormat::parse("base64"), None);
    }
}
