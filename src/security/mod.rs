//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing response:
//!     → headers.rs (add hardening headers if not already present)
//! ```
//!
//! Rate limiting, TLS and caller authentication are left to the hosting
//! environment.

pub mod headers;

pub use headers::with_security_headers;
