//! Origin forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the origin's scheme and authority
//! - Forward over a pooled hyper-util client
//! - Bound each origin call by `timeouts.request_secs`
//! - Turn transport failures into `502 Bad Gateway` and missed deadlines into
//!   `504 Gateway Timeout`, both tagged with [`OriginFailure`]

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::Authority, uri::InvalidUri, uri::Scheme, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::{OriginConfig, TimeoutConfig};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Body sent to clients for a failed origin call answered with `status`.
pub fn failure_body(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Bad Gateway")
}

#[derive(Debug, Error)]
pub enum OriginError {
    #[error("invalid origin URL: {0}")]
    InvalidUrl(#[from] InvalidUri),

    #[error("origin URL {0:?} needs a scheme and a host")]
    IncompleteUrl(String),

    #[error("failed to build origin request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("origin request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("origin did not respond within {0:?}")]
    Timeout(Duration),
}

impl OriginError {
    /// Status sent to the client when this error ends a request.
    pub fn status(&self) -> StatusCode {
        match self {
            OriginError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Response extension marking a pipeline failure at the origin.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct OriginFailure {
    pub message: String,
}

impl OriginFailure {
    pub fn new(error: &OriginError) -> Self {
        Self {
            message: error.to_string(),
        }
    }
}

/// Client for the origin application.
#[derive(Clone)]
pub struct OriginClient {
    client: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
    request_timeout: Duration,
}

impl OriginClient {
    pub fn new(origin: &OriginConfig, timeouts: &TimeoutConfig) -> Result<Self, OriginError> {
        let base: Uri = origin.url.parse()?;
        let (Some(scheme), Some(authority)) = (base.scheme().cloned(), base.authority().cloned())
        else {
            return Err(OriginError::IncompleteUrl(origin.url.clone()));
        };

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            scheme,
            authority,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Target URI on the origin for an incoming request URI.
    pub fn origin_uri(&self, uri: &Uri) -> Result<Uri, OriginError> {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        Ok(Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }

    /// Forward `request` to the origin and return its response unchanged.
    /// The deadline covers the response head; the body streams afterwards.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, OriginError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.origin_uri(&parts.uri)?;
        parts.headers.remove(header::CONNECTION);

        let pending = self.client.request(Request::from_parts(parts, body));
        let response = tokio::time::timeout(self.request_timeout, pending)
            .await
            .map_err(|_| OriginError::Timeout(self.request_timeout))??;
        Ok(response.map(Body::new))
    }
}

impl std::fmt::Debug for OriginClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginClient")
            .field("scheme", &self.scheme)
            .field("authority", &self.authority)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Terminal handler: every request is rendered by the origin.
pub async fn origin_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    match state.origin.forward(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Origin request failed");
            metrics::record_origin_failure();
            let status = e.status();
            let mut response = (status, failure_body(status)).into_response();
            response.extensions_mut().insert(OriginFailure::new(&e));
            response
        }
    }
}
