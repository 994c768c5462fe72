//! The response a handler populates (spec §3).

use bytes::Bytes;

use crate::header::HeaderMap;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// The response a handler populates before calling `HttpContext::send`.
/// Zeroed (status 200, empty headers and body) for every request; the
/// handler mutates it in place.
#[derive(Debug, Clone)]
pub struct Response {
	pub status_code: u16,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Default for Response {
	fn default() -> Self {
		Self {
			status_code: 200,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}
}

impl Response {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_status(status_code: u16) -> Self {
		Self {
			status_code,
			..Self::default()
		}
	}

	/// Builds a server-originated response for a size-policy rejection (spec
	/// §4.4.h) — the connection state machine sends this itself, without
	/// invoking the user callback.
	pub fn policy_rejection(status_code: u16, message: impl Into<String>) -> Self {
		let mut response = Self::with_status(status_code);
		response.body = Bytes::from(message.into());
		response
	}

	/// Clears status/headers/body back to defaults for the next keep-alive
	/// request on the same connection (spec §4.5 step 4).
	pub fn reset(&mut self) {
		self.status_code = 200;
		self.headers.clear();
		self.body = Bytes::new();
	}
}

// --------------------------------------------------------------------------------
