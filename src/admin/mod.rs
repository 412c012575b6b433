//! Administrative HTTP surface.
//!
//! Served on its own listener so it can stay bound to localhost while the
//! proxy listener is exposed.
//!
//! - `GET  /admin/status`      version and liveness
//! - `GET  /admin/cache`       entry count, hit and miss counters
//! - `POST /admin/cache/clear` flush the whole cache

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::proxy::CachingProxy;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub proxy: CachingProxy,
    pub api_key: Option<Arc<str>>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/cache", get(get_cache))
        .route("/admin/cache/clear", post(clear_cache))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::config::ProxyConfig;
    use crate::proxy::materializer::{CachedResponse, ResponseBody};
    use axum::{
        body::{to_bytes, Body},
        http::{HeaderMap, Request, StatusCode},
    };
    use bytes::Bytes;
    use tower::ServiceExt;

    fn state(api_key: Option<&str>) -> AdminState {
        let proxy = CachingProxy::from_config(&ProxyConfig::default()).unwrap();
        proxy.store().set(
            CacheKey::from("http://origin.test/a"),
            CachedResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: ResponseBody::Raw(Bytes::from_static(b"a")),
            },
            None,
        );
        AdminState {
            proxy,
            api_key: api_key.map(Arc::from),
        }
    }

    #[tokio::test]
    async fn test_clear_cache_flushes_store() {
        let state = state(None);
        let app = setup_admin_router(state.clone());

        let response = app
            .oneshot(Request::post("/admin/cache/clear").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let result: ClearCacheResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.cleared, 1);
        assert_eq!(result.message, "Cache cleared successfully");
        assert!(state.proxy.store().is_empty());
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let app = setup_admin_router(state(Some("secret")));

        let denied = app
            .clone()
            .oneshot(Request::get("/admin/cache").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = app
            .oneshot(
                Request::get("/admin/cache")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);

        let body = to_bytes(allowed.into_body(), usize::MAX).await.unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats["entries"], 1);
    }
}
