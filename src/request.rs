//! The parsed request (spec §3).

use crate::body::Body;
use crate::header::HeaderMap;
use crate::method::HttpMethod;
use crate::url::RequestUrl;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// A parsed HTTP request, freshly constructed for each request on a
/// connection and reset (not reallocated) between keep-alive requests.
#[derive(Debug, Clone)]
pub struct Request {
	pub version: String,
	pub method: HttpMethod,
	pub url: RequestUrl,
	pub headers: HeaderMap,
	pub body: Body,
}

impl Request {
	pub fn new(version: String, method: HttpMethod, url: RequestUrl) -> Self {
		Self {
			version,
			method,
			url,
			headers: HeaderMap::new(),
			body: Body::Empty,
		}
	}

	/// Resets all fields for reuse on the next keep-alive request, keeping
	/// the allocation behind `headers` around.
	pub fn reset(&mut self, version: String, method: HttpMethod, url: RequestUrl) {
		self.version = version;
		self.method = method;
		self.url = url;
		self.headers.clear();
		self.body = Body::Empty;
	}
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reset_clears_headers_and_body() {
		let url = RequestUrl::from_request_target("/").unwrap();
		let mut request = Request::new("HTTP/1.1".into(), HttpMethod::Get, url.clone());
		request.headers.append("X-Trace", "1");
		request.body = Body::Bytes(bytes::Bytes::from_static(b"x"));

		request.reset("HTTP/1.1".into(), HttpMethod::Post, url);

		assert!(request.headers.is_empty());
		assert!(matches!(request.body, Body::Empty));
		assert_eq!(request.method, HttpMethod::Post);
	}
}
