use std::collections::BTreeMap;

use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;

/// Request headers as handed to handlers.
pub type Headers = BTreeMap<String, String>;

/// Parsed request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Body decoded as JSON.
    Structured(Value),
    /// Body kept as text (lossy UTF-8).
    Raw(String),
}

impl Payload {
    /// Decode `body` according to its content type.
    ///
    /// JSON content types (`application/json`, `text/json`, `*/*+json`) are
    /// decoded when well-formed. Without a content type, bodies that look like
    /// a JSON object or array are tried too. Everything else, and any decode
    /// failure, falls back to [`Payload::Raw`].
    pub fn parse(body: &[u8], content_type: Option<&str>) -> Self {
        let try_json = match content_type {
            Some(value) => is_json_media_type(value),
            None => looks_like_json(body),
        };

        if try_json && let Ok(value) = serde_json::from_slice::<Value>(body) {
            return Payload::Structured(value);
        }

        Payload::Raw(String::from_utf8_lossy(body).into_owned())
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Structured(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Structured(_) => None,
            Payload::Raw(text) => Some(text),
        }
    }
}

fn is_json_media_type(content_type: &str) -> bool {
    let media = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media == "application/json" || media == "text/json" || media.ends_with("+json")
}

fn looks_like_json(body: &[u8]) -> bool {
    body.trim_ascii_start()
        .first()
        .is_some_and(|b| *b == b'{' || *b == b'[')
}

/// Content-Type header value, if present and readable.
pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// Collect request headers into a map for handlers.
///
/// Names are always lowercase. With `normalize`, values are trimmed as well.
/// Repeated headers are joined with `", "`.
pub fn collect_headers(headers: &HeaderMap, normalize: bool) -> Headers {
    let mut collected = Headers::new();
    for (name, value) in headers {
        let text = String::from_utf8_lossy(value.as_bytes());
        let text = if normalize { text.trim() } else { text.as_ref() };

        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(text);
            })
            .or_insert_with(|| text.to_string());
    }
    collected
}
