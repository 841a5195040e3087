//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Preferred (host, port)
//!     → binder.rs (consecutive run, then bounded random search)
//!     → listener.rs (owned socket, effective port)
//!     → tls.rs (optional rustls wrapping)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Contention is retried, every other bind failure is fatal
//! - TLS is optional and enabled only by a certificate

pub mod binder;
pub mod listener;
pub mod tls;

pub use binder::{acquire, BindError, DEFAULT_MAX_ATTEMPTS};
pub use listener::BoundListener;
pub use tls::{load_tls_config, TlsError, TlsParams};
