//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum-server, optional rustls)
//!     → router nested under base_url (url.rs)
//!     → handlers.rs (kernels, notebooks, clusters)
//! ```

pub mod handlers;
pub mod server;
pub mod url;

pub use server::{build_router, serve, AppState};
pub use url::{browser_url, display_url, url_path_join};
