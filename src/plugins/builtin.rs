//! Plugins shipped with the gateway.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::Utc;
use metrics::{Label, counter, gauge, histogram};
use serde_json::json;
use tracing::{error, warn};

use super::{
    AuthValidator, FailbotSink, Handler, HandlerRequest, HandlerResult, StatsSink, Tags,
};
use crate::config::AuthConfig;
use crate::signature::{DEFAULT_SHARED_SECRET_HEADER, hmac_valid, shared_secret_valid};

/// HMAC signature verification (`type: hmac`).
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacAuth;

impl AuthValidator for HmacAuth {
    fn valid(
        &self,
        payload: &[u8],
        headers: &HeaderMap,
        secret: &str,
        config: &AuthConfig,
    ) -> bool {
        hmac_valid(payload, headers, secret, config)
    }
}

/// Plain shared-secret header comparison (`type: shared_secret`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedSecretAuth;

impl AuthValidator for SharedSecretAuth {
    fn valid(
        &self,
        _payload: &[u8],
        headers: &HeaderMap,
        secret: &str,
        config: &AuthConfig,
    ) -> bool {
        let header = config
            .header
            .as_deref()
            .unwrap_or(DEFAULT_SHARED_SECRET_HEADER);
        shared_secret_valid(headers, secret, header)
    }
}

/// Acknowledges every webhook. Also serves the catch-all route.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

#[async_trait]
impl Handler for DefaultHandler {
    async fn call(&self, _request: HandlerRequest<'_>) -> HandlerResult {
        Ok(json!({
            "message": "webhook processed successfully",
            "handler": "DefaultHandler",
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}

/// Discards every metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStats;

impl StatsSink for NoopStats {
    fn record(&self, _metric: &str, _value: f64, _tags: &Tags) {}
    fn increment(&self, _metric: &str, _tags: &Tags) {}
    fn timing(&self, _metric: &str, _duration: Duration, _tags: &Tags) {}
    fn gauge(&self, _metric: &str, _value: f64, _tags: &Tags) {}
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFailbot;

impl FailbotSink for NoopFailbot {
    fn report(&self, _error: &(dyn std::error::Error + 'static), _context: &Tags) {}
    fn critical(&self, _error: &(dyn std::error::Error + 'static), _context: &Tags) {}
    fn warning(&self, _message: &str, _context: &Tags) {}
}

/// Forwards to the `metrics` facade, and from there to the Prometheus
/// exporter when one is installed.
///
/// Timings are recorded as histograms in seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsStats;

fn labels(tags: &Tags) -> Vec<Label> {
    tags.iter()
        .map(|(k, v)| Label::new(k.clone(), v.clone()))
        .collect()
}

impl StatsSink for MetricsStats {
    fn record(&self, metric: &str, value: f64, tags: &Tags) {
        histogram!(metric.to_string(), labels(tags)).record(value);
    }

    fn increment(&self, metric: &str, tags: &Tags) {
        counter!(metric.to_string(), labels(tags)).increment(1);
    }

    fn timing(&self, metric: &str, duration: Duration, tags: &Tags) {
        histogram!(metric.to_string(), labels(tags)).record(duration.as_secs_f64());
    }

    fn gauge(&self, metric: &str, value: f64, tags: &Tags) {
        gauge!(metric.to_string(), labels(tags)).set(value);
    }
}

/// Emits failbot reports as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailbot;

impl FailbotSink for TracingFailbot {
    fn report(&self, err: &(dyn std::error::Error + 'static), context: &Tags) {
        error!(error = %err, context = ?context, "Failbot report");
    }

    fn critical(&self, err: &(dyn std::error::Error + 'static), context: &Tags) {
        error!(error = %err, context = ?context, critical = true, "Failbot critical report");
    }

    fn warning(&self, message: &str, context: &Tags) {
        warn!(context = ?context, "Failbot warning: {message}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::pipeline::{Headers, Payload, RequestContext};
    use crate::plugins::tags;
    use crate::signature::compute_signature;
    use axum::http::HeaderValue;
    use serde_json::{Map, Value};

    #[test]
    fn test_hmac_auth_delegates() {
        let config = AuthConfig {
            kind: "hmac".to_string(),
            ..AuthConfig::default()
        };
        let signature = compute_signature(b"body", "secret", &config, None).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-signature", HeaderValue::from_str(&signature).unwrap());

        assert!(HmacAuth.valid(b"body", &headers, "secret", &config));
        assert!(!HmacAuth.valid(b"other", &headers, "secret", &config));
    }

    #[test]
    fn test_shared_secret_default_header() {
        let config = AuthConfig {
            kind: "shared_secret".to_string(),
            ..AuthConfig::default()
        };
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("token"));

        assert!(SharedSecretAuth.valid(b"", &headers, "token", &config));
    }

    #[test]
    fn test_shared_secret_custom_header() {
        let config = AuthConfig {
            kind: "shared_secret".to_string(),
            header: Some("X-Token".to_string()),
            ..AuthConfig::default()
        };
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("token"));

        assert!(!SharedSecretAuth.valid(b"", &headers, "token", &config));
    }

    #[tokio::test]
    async fn test_default_handler_response() {
        let payload = Payload::Raw(String::new());
        let headers = Headers::new();
        let context = RequestContext::for_path("/webhooks/x", "DefaultHandler");
        let opts = Map::new();

        let value = DefaultHandler
            .call(HandlerRequest {
                payload: &payload,
                headers: &headers,
                context: &context,
                opts: &opts,
            })
            .await
            .unwrap();

        assert_eq!(value["message"], "webhook processed successfully");
        assert_eq!(value["handler"], "DefaultHandler");
        assert!(matches!(value["timestamp"], Value::String(_)));
    }

    #[test]
    fn test_sinks_accept_calls_without_recorder() {
        let t = tags([("handler", "DefaultHandler")]);
        MetricsStats.increment("hooks.test.count", &t);
        MetricsStats.timing("hooks.test.duration", Duration::from_millis(5), &t);
        MetricsStats.gauge("hooks.test.gauge", 1.0, &t);
        MetricsStats.record("hooks.test.value", 2.0, &t);

        let err = std::io::Error::other("boom");
        TracingFailbot.report(&err, &t);
        TracingFailbot.critical(&err, &t);
        TracingFailbot.warning("careful", &t);
    }
}
