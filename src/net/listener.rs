//! The socket produced by port acquisition.
//!
//! # Responsibilities
//! - Own the bound socket for the lifetime of the server
//! - Report the concrete (host, port) that was chosen
//! - Hand the socket to the async HTTP layer

use std::net::{SocketAddr, TcpListener};

/// A TCP socket bound to a concrete `(host, port)`.
///
/// Dropping it closes the socket.
#[derive(Debug)]
pub struct BoundListener {
    inner: TcpListener,
    host: String,
    port: u16,
}

impl BoundListener {
    pub fn new(inner: TcpListener, host: &str, port: u16) -> Self {
        tracing::info!(host, port, "Listener bound");
        Self {
            inner,
            host: host.to_string(),
            port,
        }
    }

    /// The port acquisition settled on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The host the socket was bound with.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Switch to non-blocking mode and release the std socket.
    pub fn into_std(self) -> Result<TcpListener, std::io::Error> {
        self.inner.set_nonblocking(true)?;
        Ok(self.inner)
    }

    /// Register the socket with the current Tokio runtime.
    pub fn into_tokio(self) -> Result<tokio::net::TcpListener, std::io::Error> {
        tokio::net::TcpListener::from_std(self.into_std()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn converts_to_tokio_listener() {
        let socket = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = socket.local_addr().unwrap().port();
        let bound = BoundListener::new(socket, "127.0.0.1", port);

        assert_eq!(bound.host(), "127.0.0.1");
        let listener = bound.into_tokio().unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }
}
