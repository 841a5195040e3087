//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::ListenConfig;

/// Error type for TLS setup.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Certificate file not found: {0:?}")]
    CertificateNotFound(PathBuf),
    #[error("Private key file not found: {0:?}")]
    KeyNotFound(PathBuf),
    #[error("No private key in {0:?} and no keyfile configured")]
    NoPrivateKey(PathBuf),
    #[error("Failed to load TLS material: {0}")]
    Io(#[from] std::io::Error),
}

/// Certificate and key paths resolved from the listener config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsParams {
    pub certfile: PathBuf,
    pub keyfile: Option<PathBuf>,
}

impl TlsParams {
    /// TLS is only enabled by a certificate; a key on its own is ignored.
    pub fn from_config(config: &ListenConfig) -> Option<Self> {
        let certfile = config.certfile.clone()?;
        Some(Self {
            certfile,
            keyfile: config.keyfile.clone(),
        })
    }
}

/// Load TLS configuration from certificate and optional key files.
///
/// Without a keyfile the private key is read from the certificate PEM.
pub async fn load_tls_config(params: &TlsParams) -> Result<RustlsConfig, TlsError> {
    let cert_path = params.certfile.as_path();
    if !cert_path.exists() {
        return Err(TlsError::CertificateNotFound(cert_path.to_path_buf()));
    }

    let key_path = match params.keyfile.as_deref() {
        Some(key_path) => {
            if !key_path.exists() {
                return Err(TlsError::KeyNotFound(key_path.to_path_buf()));
            }
            key_path
        }
        None => {
            if !contains_private_key(cert_path)? {
                return Err(TlsError::NoPrivateKey(cert_path.to_path_buf()));
            }
            cert_path
        }
    };

    Ok(RustlsConfig::from_pem_file(cert_path, key_path).await?)
}

fn contains_private_key(path: &Path) -> Result<bool, std::io::Error> {
    let mut reader = BufReader::new(File::open(path)?);
    Ok(rustls_pemfile::private_key(&mut reader)?.is_some())
}
