//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router for the configured deployment mode
//! - Wire up middleware (request ID, tracing, timeout, body limit, security headers)
//! - Turn inbound requests into `ProxyRequest`s, rejecting bad targets with 400
//! - Run the proxy listener, the admin listener and the cache reaper until shutdown

use axum::{
    body::{to_bytes, Body},
    extract::{rejection::QueryRejection, Query, State},
    http::{request::Parts, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{self, AdminState};
use crate::config::ProxyConfig;
use crate::lifecycle::shutdown::wait;
use crate::proxy::{target, CachingProxy, ProxyRequest, TransportError, ValidationError};
use crate::security::with_security_headers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: CachingProxy,
    /// Fixed origin, when running in fixed-origin mode.
    pub origin: Option<Arc<str>>,
    pub max_body_size: usize,
}

/// Query parameters of the multi-origin `/proxy` endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
    pub method: Option<String>,
    pub ttl: Option<String>,
}

/// HTTP server for the caching proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    proxy: CachingProxy,
}

impl HttpServer {
    /// Create a server backed by the network upstream client.
    pub fn new(config: ProxyConfig) -> Result<Self, TransportError> {
        let proxy = CachingProxy::from_config(&config)?;
        Ok(Self::with_proxy(config, proxy))
    }

    /// Create a server around an existing proxy instance.
    pub fn with_proxy(config: ProxyConfig, proxy: CachingProxy) -> Self {
        let state = AppState {
            proxy: proxy.clone(),
            origin: config.proxy.origin.as_deref().map(Arc::from),
            max_body_size: config.listener.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Self { router, config, proxy }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let routes = match state.origin {
            Some(_) => Router::new()
                .route("/", any(origin_handler))
                .route("/{*path}", any(origin_handler)),
            None => Router::new().route("/proxy", any(query_handler)),
        };

        let mut router = routes.with_state(state);
        if config.security.enable_headers {
            router = with_security_headers(router);
        }

        router
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Router serving proxied traffic; exposed for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Router serving the admin endpoints.
    pub fn admin_router(&self) -> Router {
        admin::setup_admin_router(AdminState {
            proxy: self.proxy.clone(),
            api_key: self.config.admin.api_key.as_deref().map(Arc::from),
        })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        match &self.config.proxy.origin {
            Some(origin) => tracing::info!(address = %addr, origin = %origin, "Caching proxy starting (fixed origin)"),
            None => tracing::info!(address = %addr, "Caching proxy starting (multi-origin, /proxy?url=...)"),
        }

        let reaper = self.proxy.store().spawn_reaper(
            Duration::from_millis(self.config.cache.reap_interval_ms),
            shutdown.resubscribe(),
        );

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin endpoint listening");

            let admin_app = self.admin_router();
            let admin_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                if let Err(e) = axum::serve(admin_listener, admin_app)
                    .with_graceful_shutdown(wait(admin_shutdown))
                    .await
                {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait(shutdown))
            .await?;

        let _ = reaper.await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn proxy(&self) -> &CachingProxy {
        &self.proxy
    }
}

/// Multi-origin handler: target comes from `?url=`.
async fn query_handler(
    State(state): State<AppState>,
    params: Result<Query<ProxyParams>, QueryRejection>,
    request: Request<Body>,
) -> Response {
    // Duplicated or undecodable parameters leave no usable target.
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => return reject(ValidationError::InvalidUrl, &e.body_text()),
    };

    let target = match target::from_query(params.url.as_deref()) {
        Ok(t) => t,
        Err(e) => return reject(e, params.url.as_deref().unwrap_or("")),
    };

    let (parts, body) = request.into_parts();
    let method = match params.method.as_deref() {
        Some(raw) => match parse_method(raw) {
            Ok(m) => m,
            Err(e) => return reject(e, raw),
        },
        None => parts.method.clone(),
    };
    let ttl_secs = params.ttl.as_deref().and_then(|t| t.trim().parse::<u64>().ok());

    dispatch(&state, parts, body, method, target, ttl_secs).await
}

/// Fixed-origin handler: target is origin + incoming path and query.
async fn origin_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let Some(origin) = state.origin.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();

    let target = match target::from_origin(&origin, &path_and_query) {
        Ok(t) => t,
        Err(e) => return reject(e, &path_and_query),
    };

    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    dispatch(&state, parts, body, method, target, None).await
}

async fn dispatch(
    state: &AppState,
    parts: Parts,
    body: Body,
    method: Method,
    target: target::Target,
    ttl_secs: Option<u64>,
) -> Response {
    let body = match to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let request = ProxyRequest {
        method,
        target,
        headers: parts.headers,
        body,
        ttl_secs,
    };

    state.proxy.handle(request).await.into_response()
}

fn parse_method(raw: &str) -> Result<Method, ValidationError> {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(ValidationError::InvalidMethod);
    }
    Method::from_bytes(upper.as_bytes()).map_err(|_| ValidationError::InvalidMethod)
}

fn reject(error: ValidationError, input: &str) -> Response {
    tracing::warn!(input = %input, error = %error, "Rejected proxy request");
    error.into_response()
}
