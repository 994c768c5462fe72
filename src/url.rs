//! Request-target → URL construction (spec §4.4.c).
//!
//! The URI grammar itself is an external collaborator (spec §1) — this module
//! only handles assembling a full `url::Url` out of a request-target that, in
//! the overwhelmingly common origin-form case, is just `path[?query]` with no
//! scheme or authority of its own. The scheme and host are filled in after the
//! fact from transport and header information that isn't available until
//! later in request parsing.

use url::Url;

use crate::error::ImplError;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[derive(Debug, ImplError)]
pub enum UrlError {
	#[error("request-target could not be resolved into a URL: {0}")]
	Unparsable(#[from] url::ParseError),
}

/// A request URL, built incrementally as more of the request becomes known:
/// first the request-target, then the transport-implied scheme, then (if
/// present) the `Host` header overriding both host and port.
#[derive(Debug, Clone)]
pub struct RequestUrl(Url);

impl RequestUrl {
	/// Parses `target` as a request-target. Absolute-form targets (rare,
	/// mostly seen through forward proxies) parse directly; origin-form
	/// targets (`/path?query`, the common case) are resolved against a
	/// placeholder base so `url::Url` has an authority to replace later.
	pub fn from_request_target(target: &str) -> Result<Self, UrlError> {
		if let Ok(url) = Url::parse(target) {
			return Ok(Self(url));
		}

		let placeholder = Url::parse("http://placeholder.invalid").expect(crate::error::SCOPE_VALIDITY);
		let url = placeholder.join(target)?;

		Ok(Self(url))
	}

	/// Sets the scheme to `http`/`https` (plain/TLS) or `ws`/`wss` (once a
	/// WebSocket upgrade is detected), per spec §4.4.c/d.
	pub fn set_scheme(&mut self, scheme: &str) {
		let _ = self.0.set_scheme(scheme);
	}

	/// Overrides host (and optionally port) from either the listener's local
	/// bind address (before headers arrive) or the `Host` header (once it
	/// does) — the header always wins since it's applied second.
	pub fn set_authority(&mut self, host: &str, port: Option<u16>) {
		let _ = self.0.set_host(Some(host));
		let _ = self.0.set_port(port);
	}

	/// Splits a raw `Host` header value (`host` or `host:port`) and applies
	/// it via [`set_authority`](Self::set_authority).
	pub fn override_from_host_header(&mut self, host_header: &str) {
		match host_header.rsplit_once(':') {
			Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) && !port.is_empty() => {
				let port: u16 = port.parse().unwrap_or(80);
				self.set_authority(host, Some(port));
			}
			_ => self.set_authority(host_header, None),
		}
	}

	pub fn scheme(&self) -> &str {
		self.0.scheme()
	}

	pub fn host(&self) -> Option<&str> {
		self.0.host_str()
	}

	pub fn path(&self) -> &str {
		self.0.path()
	}

	pub fn query(&self) -> Option<&str> {
		self.0.query()
	}

	pub fn as_url(&self) -> &Url {
		&self.0
	}
}

// --------------------------------------------------------------------------------
