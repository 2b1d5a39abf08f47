//! Per-request webhook processing.
//!
//! # Stages
//!
//! ```text
//! context -> on_request hooks -> IP filter -> size limit -> auth
//!         -> payload parse -> handler -> on_response | on_error hooks
//! ```
//!
//! Rejections (403, 413, 401) and handler-declared errors end the request
//! without `on_error` hooks. Unexpected failures (500) run `on_error` hooks
//! and are reported to the failbot sink. Lifecycle hook failures never change
//! the response; they are logged and reported.
//!
//! The catch-all mode skips IP filtering and lifecycle hooks and always uses
//! `DefaultHandler`.

mod context;
mod payload;
mod response;
mod secrets;

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use tracing::{Instrument, debug, error, info, info_span, warn};

pub use self::context::RequestContext;
pub use self::payload::{Headers, Payload, collect_headers, content_type};
pub use self::response::{REQUEST_ID_HEADER, WebhookResponse};
pub use self::secrets::{EnvSecrets, SecretSource};

use crate::components::Components;
use crate::config::{AuthConfig, EndpointConfig, GlobalConfig};
use crate::error::RequestError;
use crate::ip_filter;
use crate::plugins::{HandlerRequest, PluginRegistry, Tags, tags};

/// Metric emitted once per request with the request duration.
pub const REQUEST_DURATION_METRIC: &str = "hooks.request.duration";
/// Metric incremented once per request.
pub const REQUEST_COUNT_METRIC: &str = "hooks.request.count";

const CATCHALL_HANDLER: &str = "DefaultHandler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Endpoint,
    CatchAll,
}

/// Stateless request processor shared by every route.
pub struct RequestPipeline {
    config: Arc<GlobalConfig>,
    registry: Arc<PluginRegistry>,
    components: Components,
    secrets: Arc<dyn SecretSource>,
}

impl RequestPipeline {
    /// Pipeline reading secrets from the environment and instruments from
    /// the registry.
    pub fn new(config: Arc<GlobalConfig>, registry: Arc<PluginRegistry>) -> Self {
        let components = Components::new(Arc::clone(&registry));
        Self {
            config,
            registry,
            components,
            secrets: Arc::new(EnvSecrets),
        }
    }

    pub fn with_components(mut self, components: Components) -> Self {
        self.components = components;
        self
    }

    pub fn with_secrets(mut self, secrets: impl SecretSource + 'static) -> Self {
        self.secrets = Arc::new(secrets);
        self
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Process a request for a declared endpoint.
    pub async fn process(
        &self,
        endpoint: Arc<EndpointConfig>,
        request: Request<Body>,
    ) -> WebhookResponse {
        let context = RequestContext::new(request.uri().path(), endpoint);
        self.run(context, request, Mode::Endpoint).await
    }

    /// Process an unmatched request through the catch-all route.
    pub async fn process_catchall(&self, request: Request<Body>) -> WebhookResponse {
        let context = RequestContext::for_path(request.uri().path(), CATCHALL_HANDLER);
        self.run(context, request, Mode::CatchAll).await
    }

    async fn run(&self, context: RequestContext, request: Request<Body>, mode: Mode) -> WebhookResponse {
        let span = info_span!(
            "webhook",
            request_id = %context.request_id,
            path = %context.path,
            handler = %context.handler,
        );

        async move {
            let (parts, body) = request.into_parts();
            debug!(catchall = mode == Mode::CatchAll, "Processing webhook");

            if mode == Mode::Endpoint {
                self.notify_request(&context, &parts.headers).await;
            }

            let response = match self.dispatch(&context, &parts.headers, body, mode).await {
                Ok(value) => {
                    if mode == Mode::Endpoint {
                        self.notify_response(&context, &value).await;
                    }
                    info!(
                        status = 200,
                        duration_ms = context.elapsed().as_millis() as u64,
                        "Webhook processed"
                    );
                    WebhookResponse::ok(value, context.request_id)
                }
                Err(error) => self.fail(&context, error, mode).await,
            };

            self.record(&context, response.status);
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        context: &RequestContext,
        headers: &HeaderMap,
        body: Body,
        mode: Mode,
    ) -> Result<Value, RequestError> {
        let endpoint = &context.endpoint;

        if mode == Mode::Endpoint
            && !ip_filter::check(
                headers,
                endpoint.ip_filtering.as_ref(),
                self.config.ip_filtering.as_ref(),
            )
        {
            return Err(RequestError::IpFilterDenied);
        }

        let body = self.read_body(headers, body).await?;

        if let Some(auth) = &endpoint.auth {
            self.authenticate(auth, &body, headers)?;
        }

        let payload = Payload::parse(&body, content_type(headers));
        let handler_headers = collect_headers(headers, self.config.normalize_headers);
        let handler = self.registry.get_handler(&context.handler)?;

        let value = handler
            .call(HandlerRequest {
                payload: &payload,
                headers: &handler_headers,
                context,
                opts: &endpoint.opts,
            })
            .await?;

        Ok(value)
    }

    /// Enforce the size limit from `Content-Length` before reading, then
    /// again while streaming for bodies without a declared length.
    async fn read_body(&self, headers: &HeaderMap, body: Body) -> Result<Bytes, RequestError> {
        let limit = self.config.request_limit;
        let too_large = RequestError::RequestTooLarge { limit };

        let declared = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        if declared.is_some_and(|len| len > limit) {
            return Err(too_large);
        }

        let max = usize::try_from(limit).unwrap_or(usize::MAX);
        match Limited::new(body, max).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.is::<LengthLimitError>() => Err(too_large),
            Err(e) => Err(RequestError::Unhandled(anyhow::anyhow!(
                "failed to read request body: {e}"
            ))),
        }
    }

    fn authenticate(
        &self,
        auth: &AuthConfig,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<(), RequestError> {
        let Some(key) = auth.secret_env_key.as_deref() else {
            debug!(auth = %auth.kind, "No secret_env_key configured, skipping authentication");
            return Ok(());
        };

        let secret = self
            .secrets
            .secret(key)
            .ok_or_else(|| RequestError::MissingSecret(key.to_string()))?;

        let validator = self.registry.get_auth(&auth.plugin_name())?;
        if validator.valid(body, headers, &secret, auth) {
            Ok(())
        } else {
            Err(RequestError::AuthenticationFailed)
        }
    }

    async fn fail(&self, context: &RequestContext, error: RequestError, mode: Mode) -> WebhookResponse {
        let status = error.status().as_u16();
        match &error {
            RequestError::IpFilterDenied | RequestError::RequestTooLarge { .. } => {
                info!(status, reason = error.kind(), "Webhook rejected");
            }
            RequestError::AuthenticationFailed => {
                warn!(status, "Webhook authentication failed");
            }
            RequestError::Declared(_) => {
                info!(status, "Handler returned a declared error");
            }
            RequestError::MissingSecret(_)
            | RequestError::UnknownPlugin(_)
            | RequestError::Unhandled(_) => {
                error!(status, error = %format!("{error:#}"), "Webhook processing failed");
            }
        }

        if error.is_unhandled() {
            if mode == Mode::Endpoint {
                self.notify_error(context, &error).await;
            }
            self.components
                .failbot()
                .report(&error, &self.report_tags(context));
        }

        WebhookResponse::from_error(&error, context, self.config.production)
    }

    async fn notify_request(&self, context: &RequestContext, headers: &HeaderMap) {
        for (name, hook) in self.registry.lifecycle_hooks() {
            if let Err(e) = hook.on_request(context, headers).await {
                self.hook_failed(context, name, "on_request", &e);
            }
        }
    }

    async fn notify_response(&self, context: &RequestContext, response: &Value) {
        for (name, hook) in self.registry.lifecycle_hooks() {
            if let Err(e) = hook.on_response(context, response).await {
                self.hook_failed(context, name, "on_response", &e);
            }
        }
    }

    async fn notify_error(&self, context: &RequestContext, error: &RequestError) {
        for (name, hook) in self.registry.lifecycle_hooks() {
            if let Err(e) = hook.on_error(context, error).await {
                self.hook_failed(context, name, "on_error", &e);
            }
        }
    }

    fn hook_failed(&self, context: &RequestContext, hook: &str, phase: &str, err: &anyhow::Error) {
        warn!(hook, phase, error = %format!("{err:#}"), "Lifecycle hook failed, continuing");

        let mut report = self.report_tags(context);
        report.insert("hook".to_string(), hook.to_string());
        report.insert("phase".to_string(), phase.to_string());
        self.components.failbot().report(&**err, &report);
    }

    fn report_tags(&self, context: &RequestContext) -> Tags {
        let request_id = context.request_id.to_string();
        tags([
            ("request_id", request_id.as_str()),
            ("path", context.path.as_str()),
            ("handler", context.handler.as_str()),
        ])
    }

    fn record(&self, context: &RequestContext, status: StatusCode) {
        let stats = self.components.stats();
        let labels = tags([
            ("handler", context.handler.as_str()),
            ("status", status.as_str()),
        ]);
        stats.timing(REQUEST_DURATION_METRIC, context.elapsed(), &labels);
        stats.increment(REQUEST_COUNT_METRIC, &labels);
    }
}
