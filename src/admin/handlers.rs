use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::cache::CacheStats;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

/// Reply of the clear-cache operation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearCacheResult {
    pub cleared: usize,
    pub message: String,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_cache(State(state): State<AdminState>) -> Json<CacheStats> {
    Json(state.proxy.stats())
}

pub async fn clear_cache(State(state): State<AdminState>) -> Json<ClearCacheResult> {
    let cleared = state.proxy.clear_cache();
    tracing::info!(cleared, "Cache cleared via admin endpoint");

    Json(ClearCacheResult {
        cleared,
        message: "Cache cleared successfully".to_string(),
    })
}
