//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, mode-specific routes)
//!     → target validation (400 on missing/invalid URL)
//!     → proxy::CachingProxy (cache decision + forwarding)
//!     → ProxyResponse with X-Cache
//!     → Send to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer, ProxyParams};
