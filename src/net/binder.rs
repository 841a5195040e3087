//! Listening-port acquisition under contention.
//!
//! # Responsibilities
//! - Try the preferred port and a short consecutive run after it
//! - Fall back to a bounded randomized search centred on the preferred port
//! - Distinguish contention (retry) from any other bind failure (abort)
//!
//! # Design Decisions
//! - Attempts are bounded by count, never by wall-clock time
//! - Random candidates are drawn fresh each time and may repeat
//! - The bind primitive is a trait so contention can be simulated in tests

use rand::Rng;
use std::io;
use std::net::TcpListener;

use crate::net::listener::BoundListener;

/// Default number of random attempts after the consecutive run.
pub const DEFAULT_MAX_ATTEMPTS: u16 = 50;

/// Length of the deterministic run starting at the preferred port.
pub const SEQUENTIAL_RUN: u16 = 5;

/// Error type for port acquisition.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// Every candidate was already in use.
    #[error("no available port: {attempts} attempts around {preferred} on {host} were all in use")]
    NoAvailablePort {
        host: String,
        preferred: u16,
        attempts: u32,
    },
    /// A failure that trying another port will not fix.
    #[error("failed to bind {host}:{port}: {source}")]
    Fatal {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
}

/// The bind primitive used by [`acquire_with`].
pub trait Bind {
    type Listener;

    fn bind(&mut self, host: &str, port: u16) -> io::Result<Self::Listener>;
}

/// Binds real TCP sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpBind;

impl Bind for TcpBind {
    type Listener = TcpListener;

    fn bind(&mut self, host: &str, port: u16) -> io::Result<TcpListener> {
        TcpListener::bind((host, port))
    }
}

/// Bounded sequence of candidate ports.
///
/// Yields `preferred ..= preferred + 4`, then `max_attempts` independent draws
/// from `[preferred - 2*max_attempts, preferred + 2*max_attempts]`. Every value
/// is clamped to `1..=65535`.
#[derive(Debug)]
pub struct CandidatePorts<R> {
    preferred: u16,
    max_attempts: u16,
    emitted: u32,
    rng: R,
}

impl<R: Rng> CandidatePorts<R> {
    pub fn new(preferred: u16, max_attempts: u16, rng: R) -> Self {
        Self {
            preferred,
            max_attempts,
            emitted: 0,
            rng,
        }
    }

    fn total(&self) -> u32 {
        u32::from(SEQUENTIAL_RUN) + u32::from(self.max_attempts)
    }

    /// Inclusive range random candidates are drawn from (before clamping).
    pub fn random_span(preferred: u16, max_attempts: u16) -> (i64, i64) {
        let spread = 2 * i64::from(max_attempts);
        (i64::from(preferred) - spread, i64::from(preferred) + spread)
    }
}

fn clamp_port(candidate: i64) -> u16 {
    candidate.clamp(1, i64::from(u16::MAX)) as u16
}

impl<R: Rng> Iterator for CandidatePorts<R> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.emitted >= self.total() {
            return None;
        }
        let index = self.emitted;
        self.emitted += 1;

        if index < u32::from(SEQUENTIAL_RUN) {
            return Some(clamp_port(i64::from(self.preferred) + i64::from(index)));
        }

        let (low, high) = Self::random_span(self.preferred, self.max_attempts);
        Some(clamp_port(self.rng.gen_range(low..=high)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total() - self.emitted) as usize;
        (remaining, Some(remaining))
    }
}

impl<R: Rng> ExactSizeIterator for CandidatePorts<R> {}

/// Acquire a listener using an explicit bind primitive and RNG.
///
/// Returns the bound listener together with the port that was chosen.
pub fn acquire_with<B, R>(
    binder: &mut B,
    rng: R,
    host: &str,
    preferred: u16,
    max_attempts: u16,
) -> Result<(B::Listener, u16), BindError>
where
    B: Bind,
    R: Rng,
{
    let mut attempts = 0u32;

    for port in CandidatePorts::new(preferred, max_attempts, rng) {
        attempts += 1;
        match binder.bind(host, port) {
            Ok(listener) => {
                tracing::debug!(host, port, attempts, "Port acquired");
                return Ok((listener, port));
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                tracing::info!("The port {} is already in use, trying another port.", port);
            }
            Err(source) => {
                return Err(BindError::Fatal {
                    host: host.to_string(),
                    port,
                    source,
                });
            }
        }
    }

    Err(BindError::NoAvailablePort {
        host: host.to_string(),
        preferred,
        attempts,
    })
}

/// Bind a TCP listener on `host`, starting at `preferred_port`.
pub fn acquire(
    preferred_port: u16,
    host: &str,
    max_attempts: u16,
) -> Result<BoundListener, BindError> {
    let (listener, port) = acquire_with(
        &mut TcpBind,
        rand::thread_rng(),
        host,
        preferred_port,
        max_attempts,
    )?;
    Ok(BoundListener::new(listener, host, port))
}
