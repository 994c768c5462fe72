//! The closed set of methods the request-line parser recognizes.

use std::fmt::{self, Display, Formatter};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// An HTTP request method.
///
/// Any token that doesn't match one of these variants is an *unknown method*;
/// per the request-line grammar (spec §4.2) the connection is closed rather
/// than answered, so there is no `Other(String)` catch-all here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
	Get,
	Post,
	Put,
	Patch,
	Delete,
	Head,
	Options,
	Trace,
	Connect,
}

impl HttpMethod {
	/// Parses a request-line method token. Returns `None` for anything outside
	/// the closed set, which the caller treats as an invalid request.
	pub fn parse(token: &str) -> Option<Self> {
		Some(match token {
			"GET" => Self::Get,
			"POST" => Self::Post,
			"PUT" => Self::Put,
			"PATCH" => Self::Patch,
			"DELETE" => Self::Delete,
			"HEAD" => Self::Head,
			"OPTIONS" => Self::Options,
			"TRACE" => Self::Trace,
			"CONNECT" => Self::Connect,
			_ => return None,
		})
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
			Self::Head => "HEAD",
			Self::Options => "OPTIONS",
			Self::Trace => "TRACE",
			Self::Connect => "CONNECT",
		}
	}

	/// Methods the body spooler (spec §4.3) reads a declared-length body for.
	pub fn carries_request_body(&self) -> bool {
		matches!(self, Self::Post | Self::Put | Self::Patch | Self::Delete)
	}
}

impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn recognizes_every_closed_variant() {
		for (token, method) in [
			("GET", HttpMethod::Get),
			("POST", HttpMethod::Post),
			("PUT", HttpMethod::Put),
			("PATCH", HttpMethod::Patch),
			("DELETE", HttpMethod::Delete),
			("HEAD", HttpMethod::Head),
			("OPTIONS", HttpMethod::Options),
			("TRACE", HttpMethod::Trace),
			("CONNECT", HttpMethod::Connect),
		] {
			assert_eq!(HttpMethod::parse(token), Some(method));
			assert_eq!(method.as_str(), token);
		}
	}

	#[test]
	fn rejects_unknown_and_lowercase_tokens() {
		assert_eq!(HttpMethod::parse("LOCK"), None);
		assert_eq!(HttpMethod::parse("get"), None);
		assert_eq!(HttpMethod::parse(""), None);
	}

	#[test]
	fn only_entity_bearing_methods_carry_a_body() {
		assert!(HttpMethod::Post.carries_request_body());
		assert!(HttpMethod::Put.carries_request_body());
		assert!(HttpMethod::Patch.carries_request_body());
		assert!(HttpMethod::Delete.carries_request_body());
		assert!(!HttpMethod::Get.carries_request_body());
		assert!(!HttpMethod::Head.carries_request_body());
	}
}
