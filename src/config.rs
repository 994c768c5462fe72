//! Server configuration (spec §3, §6), built the way the teacher's `Server`
//! exposes `with_*` setters rather than requiring a constructor with every
//! field spelled out.

use std::path::PathBuf;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// TLS listener settings, embedded in [`ServerConfig`] (spec §6, "TLS settings").
#[derive(Debug, Clone)]
pub struct TlsSettings {
	pub cert_path: PathBuf,
	pub key_path: PathBuf,
	pub port: u16,
	pub peer_verify: bool,
}

impl TlsSettings {
	pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
		Self {
			cert_path: cert_path.into(),
			key_path: key_path.into(),
			port: 8443,
			peer_verify: false,
		}
	}

	pub fn with_port(mut self, port: u16) -> Self {
		self.port = port;
		self
	}

	pub fn with_peer_verify(mut self, peer_verify: bool) -> Self {
		self.peer_verify = peer_verify;
		self
	}

	/// Resolves a cert/key path relative to `base_dir` if it isn't absolute
	/// already (spec §6: "Paths are resolved relative to the app directory
	/// if not absolute").
	pub fn resolve_paths(&mut self, base_dir: &std::path::Path) {
		if self.cert_path.is_relative() {
			self.cert_path = base_dir.join(&self.cert_path);
		}
		if self.key_path.is_relative() {
			self.key_path = base_dir.join(&self.key_path);
		}
	}
}

/// Top-level server configuration, created once at startup (spec §3).
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub address: String,
	pub port: u16,
	pub trace: bool,
	pub reuse_address: bool,
	pub reuse_port: bool,
	pub tls_settings: Option<TlsSettings>,
	pub max_body_length: u64,
	pub keep_alive: bool,
	pub tmp_dir: PathBuf,
	pub tmp_body_dir: PathBuf,
	pub read_body_buffer: usize,
}

impl Default for ServerConfig {
	fn default() -> Self {
		let tmp_dir = std::env::temp_dir();

		Self {
			address: "0.0.0.0".to_owned(),
			port: 8000,
			trace: false,
			reuse_address: false,
			reuse_port: false,
			tls_settings: None,
			max_body_length: 268_435_456,
			keep_alive: false,
			tmp_body_dir: tmp_dir.clone(),
			tmp_dir,
			read_body_buffer: 1024,
		}
	}
}

impl ServerConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_address(mut self, address: impl Into<String>) -> Self {
		self.address = address.into();
		self
	}

	pub fn with_port(mut self, port: u16) -> Self {
		self.port = port;
		self
	}

	pub fn with_trace(mut self, trace: bool) -> Self {
		self.trace = trace;
		self
	}

	pub fn with_reuse_address(mut self, reuse_address: bool) -> Self {
		self.reuse_address = reuse_address;
		self
	}

	pub fn with_reuse_port(mut self, reuse_port: bool) -> Self {
		self.reuse_port = reuse_port;
		self
	}

	pub fn with_tls_settings(mut self, tls_settings: TlsSettings) -> Self {
		self.tls_settings = Some(tls_settings);
		self
	}

	pub fn with_max_body_length(mut self, max_body_length: u64) -> Self {
		self.max_body_length = max_body_length;
		self
	}

	pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
		self.keep_alive = keep_alive;
		self
	}

	pub fn with_tmp_body_dir(mut self, tmp_body_dir: impl Into<PathBuf>) -> Self {
		self.tmp_body_dir = tmp_body_dir.into();
		self
	}

	pub fn with_read_body_buffer(mut self, read_body_buffer: usize) -> Self {
		self.read_body_buffer = read_body_buffer;
		self
	}
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_the_documented_values() {
		let config = ServerConfig::default();
		assert_eq!(config.port, 8000);
		assert_eq!(config.max_body_length, 268_435_456);
		assert_eq!(config.read_body_buffer, 1024);
		assert!(!config.keep_alive);
		assert!(config.tls_settings.is_none());
	}

	#[test]
	fn tls_settings_default_port_is_8443() {
		let tls = TlsSettings::new("cert.pem", "key.pem");
		assert_eq!(tls.port, 8443);
	}

	#[test]
	fn relative_paths_resolve_against_base_dir() {
		let mut tls = TlsSettings::new("cert.pem", "/abs/key.pem");
		tls.resolve_paths(std::path::Path::new("/app"));

		assert_eq!(tls.cert_path, std::path::PathBuf::from("/app/cert.pem"));
		assert_eq!(tls.key_path, std::path::PathBuf::from("/abs/key.pem"));
	}
}
