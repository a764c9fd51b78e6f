// ────────────────────────────────
// src/proxy/proxy.rs
// Dev proxy: forwards the API prefix to the backend, serves the rest locally
// ────────────────────────────────

use hyper::client::HttpConnector;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Body, Client, Request, Response, StatusCode};
use hyper_tls::HttpsConnector;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::rule::{strip_hop_by_hop, ProxyRule};
use super::static_files::StaticFiles;
use crate::config::{Config, DEFAULT_PROXY_TIMEOUT_MS};
use crate::metrics::{MetricsCollector, MetricsRegistry, Timer};

pub const X_REQUEST_ID: &str = "x-request-id";

type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

pub struct DevProxy {
    rule: ProxyRule,
    client: HttpClient,
    upstream_timeout: Duration,
    static_files: Option<StaticFiles>,
    metrics: Option<Arc<MetricsCollector>>,
    metrics_endpoint: Option<(String, MetricsRegistry)>,
}

impl DevProxy {
    pub fn new(rule: ProxyRule) -> Self {
        let client = Client::builder().build::<_, Body>(HttpsConnector::new());
        Self {
            rule,
            client,
            upstream_timeout: Duration::from_millis(DEFAULT_PROXY_TIMEOUT_MS),
            static_files: None,
            metrics: None,
            metrics_endpoint: None,
        }
    }

    /// Proxy wired from the resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self, ProxyError> {
        let rule = ProxyRule::new(
            &config.proxy.prefix,
            &config.backend.origin(),
            config.proxy.change_origin,
        )?;
        let mut proxy = Self::new(rule).with_upstream_timeout(config.proxy.timeout());
        if let Some(dir) = &config.frontend.static_dir {
            proxy = proxy.with_static_files(StaticFiles::new(dir.clone()));
        }
        Ok(proxy)
    }

    pub fn with_upstream_timeout(mut self, upstream_timeout: Duration) -> Self {
        self.upstream_timeout = upstream_timeout;
        self
    }

    pub fn with_static_files(mut self, files: StaticFiles) -> Self {
        self.static_files = Some(files);
        self
    }

    /// Records request metrics; also exposes them on `path` when given.
    pub fn with_metrics(mut self, registry: MetricsRegistry, path: Option<String>) -> Self {
        self.metrics = Some(registry.collector());
        self.metrics_endpoint = path.map(|path| (path, registry));
        self
    }

    pub fn rule(&self) -> &ProxyRule {
        &self.rule
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let timer = Timer::new();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let (route, result) = if self.rule.matches(&path) {
            ("proxy", self.forward(req).await)
        } else if let Some((metrics_path, registry)) = self
            .metrics_endpoint
            .as_ref()
            .filter(|(metrics_path, _)| *metrics_path == path)
        {
            debug!(path = %metrics_path, "serving metrics");
            ("metrics", metrics_response(registry))
        } else if let Some(files) = &self.static_files {
            ("static", files.serve(&path).await)
        } else {
            ("none", Err(ProxyError::NotFound(path.clone())))
        };

        if let Some(metrics) = &self.metrics {
            let status = match &result {
                Ok(response) => response.status(),
                Err(e) => e.status(),
            };
            metrics.record_request(method.as_str(), status.as_u16(), route, timer.elapsed());
        }

        result
    }

    async fn forward(&self, mut req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let request_id = req
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let uri = self.rule.forward_uri(req.uri())?;
        let span = info_span!(
            "proxy",
            %request_id,
            method = %req.method(),
            path = %req.uri().path(),
            upstream = %uri,
        );

        async move {
            self.rule.rewrite_headers(req.headers_mut());
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                req.headers_mut()
                    .insert(HeaderName::from_static(X_REQUEST_ID), value);
            }
            *req.uri_mut() = uri;

            match timeout(self.upstream_timeout, self.client.request(req)).await {
                Ok(Ok(mut response)) => {
                    strip_hop_by_hop(response.headers_mut());
                    info!(status = %response.status(), "forwarded");
                    Ok(response)
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "backend unreachable");
                    Err(ProxyError::BackendError(e.to_string()))
                }
                Err(_) => {
                    warn!(timeout = ?self.upstream_timeout, "backend did not answer in time");
                    Err(ProxyError::Timeout(self.upstream_timeout))
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn metrics_response(registry: &MetricsRegistry) -> Result<Response<Body>, ProxyError> {
    let body = registry
        .gather()
        .map_err(|e| ProxyError::Metrics(e.to_string()))?;
    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    Ok(response)
}

// Custom error type for proxy operations
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid proxy target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("invalid forwarded URI: {0}")]
    InvalidUri(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to encode metrics: {0}")]
    Metrics(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidUri(_) => StatusCode::BAD_REQUEST,
            ProxyError::BackendError(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::InvalidTarget { .. } | ProxyError::Metrics(_) | ProxyError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Convert ProxyError to Hyper Response for error handling
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let status = err.status();
        let message = match &err {
            ProxyError::BackendError(_) => "Bad gateway".to_string(),
            ProxyError::Timeout(_) => "Gateway timeout".to_string(),
            ProxyError::NotFound(_) => "Not Found".to_string(),
            other => other.to_string(),
        };

        let mut response = Response::new(Body::from(message));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        response
    }
}
