//! Lazy-load middleware.
//!
//! Drives [`LazyLoadFilter`] around the origin call:
//!
//! ```text
//! request ─▶ HttpExchange (route, child flag, user agent, client sink)
//!         ─▶ BEFORE (capture or skip)
//!         ─▶ next.run(request)  (origin renders the page)
//!         ─▶ page body written to the active sink
//!         ─▶ AFTER (rewrite or discard) ─▶ client sink becomes the response body
//! ```
//!
//! Captured requests are forwarded with `Accept-Encoding: identity` so the
//! origin answers with a body that can be rewritten. Only `text/html` bodies
//! without a `Content-Encoding` go through the sink. Everything else, and
//! every skipped request, streams through untouched.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::PageSpeedConfig;
use crate::http::origin::{failure_body, OriginFailure};
use crate::interceptor::{
    ActionContext, After, Before, CaptureBuffer, LazyLoadFilter, OutputSink, PendingFinalize,
};
use crate::observability::metrics;
use crate::routing::{RequestTarget, RouteData, Router};

/// Request extension marking a nested/partial sub-render.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildRender;

/// Shared state of the middleware.
#[derive(Debug, Clone)]
pub struct LazyLoadState {
    pub filter: Arc<LazyLoadFilter>,
    pub router: Arc<Router>,
    pub enabled: bool,
    pub partial_render_header: String,
    pub max_body_bytes: usize,
    pub body_timeout: Duration,
}

impl LazyLoadState {
    pub fn from_config(config: &PageSpeedConfig) -> Self {
        Self {
            filter: Arc::new(LazyLoadFilter::from_config(&config.lazy_load)),
            router: Arc::new(Router::from_config(&config.routes)),
            enabled: config.lazy_load.enabled,
            partial_render_header: config.lazy_load.partial_render_header.clone(),
            max_body_bytes: config.origin.max_body_bytes,
            body_timeout: Duration::from_secs(config.timeouts.request_secs),
        }
    }
}

/// One request as seen by the interceptor.
pub struct HttpExchange {
    route: Option<RouteData>,
    child: bool,
    user_agent: Option<String>,
    client: CaptureBuffer,
    output: Box<dyn OutputSink>,
    pending: PendingFinalize,
}

impl HttpExchange {
    /// Collect what the interceptor needs from `request`. A `RouteData`
    /// extension set by an embedding application wins over the route table.
    pub fn from_request<B>(request: &Request<B>, state: &LazyLoadState) -> Self {
        let route = request
            .extensions()
            .get::<RouteData>()
            .cloned()
            .or_else(|| state.router.resolve(&RequestTarget::from_request(request)));
        let child = request.extensions().get::<ChildRender>().is_some()
            || request
                .headers()
                .contains_key(state.partial_render_header.as_str());
        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let client = CaptureBuffer::new();
        Self {
            route,
            child,
            user_agent,
            output: Box::new(client.clone()),
            client,
            pending: PendingFinalize::new(),
        }
    }

    /// Everything written to the client sink so far.
    pub fn take_client_output(&self) -> String {
        self.client.take()
    }
}

impl ActionContext for HttpExchange {
    fn route_data(&self) -> Option<&RouteData> {
        self.route.as_ref()
    }

    fn is_child_action(&self) -> bool {
        self.child
    }

    fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    fn output(&mut self) -> &mut dyn OutputSink {
        self.output.as_mut()
    }

    fn replace_output(&mut self, sink: Box<dyn OutputSink>) -> Box<dyn OutputSink> {
        std::mem::replace(&mut self.output, sink)
    }

    fn pending(&mut self) -> &mut PendingFinalize {
        &mut self.pending
    }
}

/// True for uncompressed HTML responses.
pub fn is_rewritable(headers: &HeaderMap) -> bool {
    let html = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"));
    let encoded = headers
        .get_all(header::CONTENT_ENCODING)
        .iter()
        .any(|v| !v.as_bytes().eq_ignore_ascii_case(b"identity"));
    html && !encoded
}

pub async fn lazy_load_middleware(
    State(state): State<LazyLoadState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled {
        metrics::record_request("disabled");
        return next.run(request).await;
    }

    let mut exchange = HttpExchange::from_request(&request, &state);
    if let Before::Skipped(reason) = state.filter.on_action_executing(&mut exchange) {
        metrics::record_request(reason.as_str());
        return next.run(request).await;
    }

    request
        .headers_mut()
        .insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    let response = next.run(request).await;

    if let Some(failure) = response.extensions().get::<OriginFailure>().cloned() {
        return fail(&state.filter, exchange, response.status(), &failure);
    }

    if !is_rewritable(response.headers()) {
        state.filter.on_result_executed(&mut exchange, None);
        metrics::record_request("not_html");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let read = axum::body::to_bytes(body, state.max_body_bytes);
    let bytes = match tokio::time::timeout(state.body_timeout, read).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Failed to read origin body");
            metrics::record_origin_failure();
            return fail(&state.filter, exchange, StatusCode::BAD_GATEWAY, &e);
        }
        Err(elapsed) => {
            tracing::warn!(timeout = ?state.body_timeout, "Origin body not received in time");
            metrics::record_origin_failure();
            return fail(&state.filter, exchange, StatusCode::GATEWAY_TIMEOUT, &elapsed);
        }
    };

    // Non-UTF-8 pages are left as the origin sent them.
    if let Ok(page) = std::str::from_utf8(&bytes) {
        exchange.output().write_str(page);
    }
    let after = state.filter.on_result_executed(&mut exchange, None);
    metrics::record_request(after.as_str());

    if after == After::Rewritten {
        parts.headers.remove(header::CONTENT_LENGTH);
        Response::from_parts(parts, Body::from(exchange.take_client_output()))
    } else {
        Response::from_parts(parts, Body::from(bytes))
    }
}

/// Finalize with an error, then write the error page to the restored sink.
fn fail(
    filter: &LazyLoadFilter,
    mut exchange: HttpExchange,
    status: StatusCode,
    failure: &(dyn Error + 'static),
) -> Response {
    let after = filter.on_result_executed(&mut exchange, Some(failure));
    metrics::record_request(after.as_str());
    exchange.output().write_str(failure_body(status));
    (status, exchange.take_client_output()).into_response()
}
