//! Fuzz testing for the signature verifiers.
//!
//! Arbitrary bodies, secrets, header values and auth settings are fed to
//! the HMAC and shared-secret verifiers. They must never panic, and a
//! signature computed for the exact input must always verify.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_verifiers
//! ```

#![no_main]

use arbitrary::Arbitrary;
use http::{HeaderMap, HeaderName, HeaderValue};
use libfuzzer_sys::fuzz_target;

use hooks_gateway::config::AuthConfig;
use hooks_gateway::signature::{compute_signature, hmac_valid_at, shared_secret_valid};

const NOW: i64 = 1_700_000_000;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    body: &'a [u8],
    secret: &'a str,
    signature: &'a str,
    timestamp: &'a str,
    algorithm: Option<&'a str>,
    format: Option<&'a str>,
    template: Option<&'a str>,
    use_timestamp: bool,
}

fuzz_target!(|input: Input<'_>| {
    let config = AuthConfig {
        kind: "hmac".to_string(),
        header: Some("X-Signature".to_string()),
        algorithm: input.algorithm.map(str::to_string),
        format: input.format.map(str::to_string),
        payload_template: input.template.map(str::to_string),
        timestamp_header: input.use_timestamp.then(|| "X-Timestamp".to_string()),
        ..AuthConfig::default()
    };

    // Arbitrary header values.
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(input.signature) {
        headers.insert(HeaderName::from_static("x-signature"), value.clone());
        headers.insert(HeaderName::from_static("authorization"), value);
    }
    if let Ok(value) = HeaderValue::from_str(input.timestamp) {
        headers.insert(HeaderName::from_static("x-timestamp"), value);
    }
    let _ = hmac_valid_at(input.body, &headers, input.secret, &config, NOW);
    let _ = shared_secret_valid(&headers, input.secret, "Authorization");

    // A freshly computed signature must verify.
    if input.secret.is_empty() {
        return;
    }
    let timestamp = NOW.to_string();
    let signed_at = input.use_timestamp.then_some(timestamp.as_str());
    let Some(signature) = compute_signature(input.body, input.secret, &config, signed_at) else {
        return;
    };
    let mut signed = HeaderMap::new();
    let Ok(value) = HeaderValue::from_str(&signature) else {
        return;
    };
    signed.insert(HeaderName::from_static("x-signature"), value);
    signed.insert(
        HeaderName::from_static("x-timestamp"),
        HeaderValue::from(NOW),
    );
    assert!(hmac_valid_at(input.body, &signed, input.secret, &config, NOW));
});
