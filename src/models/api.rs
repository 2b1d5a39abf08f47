use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
    /// Service version
    pub version: String,
    /// Seconds since the server started
    pub uptime_seconds: u64,
}

/// Version response.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Structured error body returned for gateway-generated failures.
///
/// Handler-declared errors bypass this type and are sent verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error tag (`ip_filtering_failed`, `server_error`, ...)
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    /// Handler name, outside production only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    /// Error chain or captured backtrace, outside production only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            request_id: None,
            handler: None,
            backtrace: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_omits_debug_fields() {
        let body = ErrorResponse::new("authentication_failed", "authentication failed")
            .with_request_id(Uuid::nil());
        let json = serde_json::to_value(&body).expect("Serialization should succeed");

        assert_eq!(json["error"], "authentication_failed");
        assert_eq!(json["request_id"], Uuid::nil().to_string());
        assert!(json.get("handler").is_none());
        assert!(json.get("backtrace").is_none());
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            version: "0.1.0".to_string(),
            uptime_seconds: 42,
        };
        let json = serde_json::to_value(&response).expect("Serialization should succeed");

        assert_eq!(json["status"], "healthy");
        assert_eq!(json["uptime_seconds"], 42);
        assert!(json["timestamp"].is_string());
    }
}
