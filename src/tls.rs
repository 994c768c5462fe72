//! Loading a `rustls::ServerConfig` from [`TlsSettings`] (spec §6).
//!
//! Missing cert/key files disable the TLS listener with a log line rather
//! than aborting the whole server — the plain listener keeps running (spec
//! §7, "TLS setup").

use std::path::Path;
use std::sync::Arc;

use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;

use crate::config::TlsSettings;
use crate::error::ImplError;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[derive(Debug, ImplError)]
pub enum TlsSetupError {
	#[error("could not read certificate file at {path}: {source}")]
	CertFile {
		path: String,
		source: std::io::Error,
	},
	#[error("could not read private key file at {path}: {source}")]
	KeyFile {
		path: String,
		source: std::io::Error,
	},
	#[error("private key file at {0} contained no usable private key")]
	NoPrivateKey(String),
	#[error(transparent)]
	Rustls(#[from] rustls::Error),
}

/// Loads the certificate chain and private key named in `settings` and
/// builds a [`TlsAcceptor`] ready to wrap accepted TCP streams.
pub fn build_acceptor(settings: &TlsSettings) -> Result<TlsAcceptor, TlsSetupError> {
	let certs = load_certs(&settings.cert_path)?;
	let key = load_key(&settings.key_path)?;

	let config = rustls::ServerConfig::builder()
		.with_no_client_auth()
		.with_single_cert(certs, key)?;

	Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsSetupError> {
	let bytes = std::fs::read(path).map_err(|source| TlsSetupError::CertFile {
		path: path.display().to_string(),
		source,
	})?;

	let mut reader = std::io::Cursor::new(bytes);

	rustls_pemfile::certs(&mut reader)
		.collect::<Result<Vec<_>, _>>()
		.map_err(|source| TlsSetupError::CertFile {
			path: path.display().to_string(),
			source,
		})
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsSetupError> {
	let bytes = std::fs::read(path).map_err(|source| TlsSetupError::KeyFile {
		path: path.display().to_string(),
		source,
	})?;

	let mut reader = std::io::Cursor::new(bytes);

	rustls_pemfile::private_key(&mut reader)
		.map_err(|source| TlsSetupError::KeyFile {
			path: path.display().to_string(),
			source,
		})?
		.ok_or_else(|| TlsSetupError::NoPrivateKey(path.display().to_string()))
}

/// Attempts to build a TLS acceptor, logging and returning `None` instead of
/// propagating on any setup failure, so the caller (the listener) can fall
/// back to running plain-only.
pub fn try_build_acceptor(settings: &TlsSettings) -> Option<TlsAcceptor> {
	match build_acceptor(settings) {
		Ok(acceptor) => Some(acceptor),
		Err(error) => {
			tracing::warn!(%error, "TLS listener disabled, falling back to plain only");
			None
		}
	}
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_cert_file_is_reported_not_panicked() {
		let settings = TlsSettings::new("/no/such/cert.pem", "/no/such/key.pem");
		let result = build_acceptor(&settings);
		assert!(matches!(result, Err(TlsSetupError::CertFile { .. })));
	}

	#[test]
	fn try_build_acceptor_returns_none_on_failure_instead_of_panicking() {
		let settings = TlsSettings::new("/no/such/cert.pem", "/no/such/key.pem");
		assert!(try_build_acceptor(&settings).is_none());
	}
}
