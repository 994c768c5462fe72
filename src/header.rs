//! The request-line/header-block codec (spec §4.2).
//!
//! The header map deliberately isn't a thin wrapper over a generic
//! `HashMap` — a plain map keyed by a lowercased string would normalize the
//! original casing away, and spec §3 requires emit-time casing to survive a
//! case-insensitive *lookup*. Instead each distinct field name (compared
//! case-insensitively) owns one entry that remembers the casing it was first
//! seen with, plus the accumulated list of values for that name.

use std::fmt::Write as _;

use crate::error::ImplError;
use crate::method::HttpMethod;
use crate::status::reason_phrase;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct HeaderEntry {
	name: String,
	values: Vec<String>,
}

/// A case-insensitive, multi-valued header map with stable insertion order.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
	entries: Vec<HeaderEntry>,
}

impl HeaderMap {
	pub fn new() -> Self {
		Self::default()
	}

	fn position(&self, name: &str) -> Option<usize> {
		self
			.entries
			.iter()
			.position(|entry| entry.name.eq_ignore_ascii_case(name))
	}

	/// Appends a value, accumulating onto an existing entry for the same name
	/// (case-insensitively) or creating a new one. This is how repeated
	/// request header fields are parsed (spec §4.2).
	pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();
		let value = value.into();

		match self.position(&name) {
			Some(index) => self.entries[index].values.push(value),
			None => self.entries.push(HeaderEntry {
				name,
				values: vec![value],
			}),
		}
	}

	/// Replaces all values for `name` with a single value, preserving the
	/// entry's position if it already existed.
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();
		let value = value.into();

		match self.position(&name) {
			Some(index) => {
				self.entries[index].name = name;
				self.entries[index].values = vec![value];
			}
			None => self.entries.push(HeaderEntry {
				name,
				values: vec![value],
			}),
		}
	}

	/// The last-inserted value for `name`, compared case-insensitively
	/// (spec §8 invariant 6).
	pub fn get(&self, name: &str) -> Option<&str> {
		self
			.position(name)
			.and_then(|index| self.entries[index].values.last())
			.map(String::as_str)
	}

	pub fn get_all(&self, name: &str) -> impl Iterator<Item = &str> {
		self
			.position(name)
			.into_iter()
			.flat_map(|index| self.entries[index].values.iter().map(String::as_str))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.position(name).is_some()
	}

	pub fn remove(&mut self, name: &str) {
		if let Some(index) = self.position(name) {
			self.entries.remove(index);
		}
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Yields `(name, value)` pairs in insertion order, one pair per value —
	/// a field with three accumulated values yields three pairs in a row.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().flat_map(|entry| {
			entry
				.values
				.iter()
				.map(move |value| (entry.name.as_str(), value.as_str()))
		})
	}

	/// `true` iff `name`'s value contains `token` as a comma-separated,
	/// case-insensitively compared element (used for `Connection: keep-alive`
	/// / `Connection: close` per spec §4.5).
	pub fn value_contains_token(&self, name: &str, token: &str) -> bool {
		self
			.get(name)
			.map(|value| {
				value
					.split(',')
					.map(str::trim)
					.any(|part| part.eq_ignore_ascii_case(token))
			})
			.unwrap_or(false)
	}
}

// --------------------------------------------------------------------------------
// Request-line + header block parsing

#[derive(Debug, ImplError)]
pub enum ParseError {
	#[error("connection closed before a complete line was read")]
	ConnectionClosed,
	#[error("malformed line: stray CR or LF outside the terminating CRLF")]
	MalformedLine,
	#[error("request line did not have exactly three space-separated tokens")]
	MalformedRequestLine,
	#[error("header line was missing a ':' separator")]
	MalformedHeaderLine,
}

/// The parsed `METHOD SP REQUEST-TARGET SP HTTP-VERSION` line.
#[derive(Debug, Clone)]
pub struct RequestLine {
	pub method_token: String,
	pub target: String,
	pub version: String,
}

/// Splits a request line into exactly three space-separated tokens. An empty
/// line is reported distinctly by the caller (it signals a clean end of the
/// keep-alive loop, not a parse failure) — this function is only ever called
/// with a non-empty line.
pub fn parse_request_line(line: &str) -> Result<RequestLine, ParseError> {
	let mut parts = line.splitn(3, ' ');

	let method_token = parts.next().ok_or(ParseError::MalformedRequestLine)?;
	let target = parts.next().ok_or(ParseError::MalformedRequestLine)?;
	let version = parts.next().ok_or(ParseError::MalformedRequestLine)?;

	if version.contains(' ') {
		return Err(ParseError::MalformedRequestLine);
	}

	Ok(RequestLine {
		method_token: method_token.to_owned(),
		target: target.to_owned(),
		version: version.to_owned(),
	})
}

/// Parses one `field-name ":" OWS field-value OWS` header line and appends it
/// to `headers`. The blank line that ends the header block is recognized by
/// the caller before this is reached.
pub fn parse_header_line(line: &str, headers: &mut HeaderMap) -> Result<(), ParseError> {
	let (name, value) = line
		.split_once(':')
		.ok_or(ParseError::MalformedHeaderLine)?;

	let name = name.trim();
	let value = value.trim();

	if name.is_empty() {
		return Err(ParseError::MalformedHeaderLine);
	}

	headers.append(name, value);

	Ok(())
}

// --------------------------------------------------------------------------------
// Response header block emission (spec §4.2)

/// Writes the fixed-order response head: status line, `Server`, `Date`,
/// `Connection`, `Content-Length` (unless the handler already set one), then
/// every user-supplied header in insertion order, then the terminating blank
/// line. Returns the head as a single buffer ready to write to the wire.
pub fn render_response_head(
	status_code: u16,
	server_name: &str,
	keep_alive: bool,
	is_head_request: bool,
	body_len: usize,
	headers: &HeaderMap,
) -> String {
	let mut head = String::with_capacity(256);

	let _ = write!(
		head,
		"HTTP/1.1 {} {}\r\n",
		status_code,
		reason_phrase(status_code)
	);
	let _ = write!(head, "Server: {server_name}\r\n");
	let _ = write!(
		head,
		"Date: {}\r\n",
		httpdate::fmt_http_date(std::time::SystemTime::now())
	);
	let _ = write!(
		head,
		"Connection: {}\r\n",
		if keep_alive { "keep-alive" } else { "close" }
	);

	if !headers.contains("content-length") && !is_head_request {
		let _ = write!(head, "Content-Length: {body_len}\r\n");
	}

	for (name, value) in headers.iter() {
		let _ = write!(head, "{name}: {value}\r\n");
	}

	head.push_str("\r\n");

	head
}

/// Writes the WebSocket handshake response head (spec §4.7 "Handshake"):
/// `101 Switching Protocols`, `Server`, `Date`, `Connection: Upgrade`, then
/// every header in `headers` (`Upgrade`, `Sec-WebSocket-Accept`, and any
/// user-supplied ones) in insertion order, then the terminating blank line.
/// Distinct from [`render_response_head`] because the 101 response never
/// carries `Content-Length` and fixes `Connection` to `Upgrade` rather than
/// deriving it from a keep-alive decision.
pub fn render_handshake_head(server_name: &str, headers: &HeaderMap) -> String {
	let mut head = String::with_capacity(256);

	let _ = write!(head, "HTTP/1.1 101 {}\r\n", reason_phrase(101));
	let _ = write!(head, "Server: {server_name}\r\n");
	let _ = write!(
		head,
		"Date: {}\r\n",
		httpdate::fmt_http_date(std::time::SystemTime::now())
	);
	head.push_str("Connection: Upgrade\r\n");

	for (name, value) in headers.iter() {
		let _ = write!(head, "{name}: {value}\r\n");
	}

	head.push_str("\r\n");

	head
}

/// `true` iff `method` is unaffected by body emission (HEAD writes only the
/// header block — spec §4.5 step 3).
pub fn suppresses_response_body(method: HttpMethod) -> bool {
	matches!(method, HttpMethod::Head)
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn case_insensitive_lookup_returns_last_inserted_value() {
		let mut headers = HeaderMap::new();
		headers.append("X-Trace", "one");
		headers.append("x-trace", "two");

		assert_eq!(headers.get("X-TRACE"), Some("two"));
		assert_eq!(
			headers.get_all("x-trace").collect::<Vec<_>>(),
			["one", "two"]
		);
	}

	#[test]
	fn original_casing_is_retained_on_emit() {
		let mut headers = HeaderMap::new();
		headers.append("X-Custom-Header", "v1");

		let (name, _value) = headers.iter().next().unwrap();
		assert_eq!(name, "X-Custom-Header");
	}

	#[test]
	fn request_line_requires_exactly_three_tokens() {
		let line = parse_request_line("GET /index.html HTTP/1.1").unwrap();
		assert_eq!(line.method_token, "GET");
		assert_eq!(line.target, "/index.html");
		assert_eq!(line.version, "HTTP/1.1");

		assert!(parse_request_line("GET /index.html").is_err());
		assert!(parse_request_line("GET / HTTP/1.1 extra").is_err());
	}

	#[test]
	fn header_line_requires_colon() {
		let mut headers = HeaderMap::new();
		assert!(parse_header_line("Host h", &mut headers).is_err());
		parse_header_line("Host: h", &mut headers).unwrap();
		assert_eq!(headers.get("host"), Some("h"));
	}

	#[test]
	fn connection_header_token_matching_is_case_insensitive() {
		let mut headers = HeaderMap::new();
		headers.append("Connection", "Keep-Alive");
		assert!(headers.value_contains_token("connection", "keep-alive"));
		assert!(!headers.value_contains_token("connection", "close"));
	}

	#[test]
	fn response_head_emits_fixed_order() {
		let mut headers = HeaderMap::new();
		headers.append("X-App", "demo");

		let head = render_response_head(200, "brazier", true, false, 4, &headers);
		let mut lines = head.split("\r\n");

		assert_eq!(lines.next(), Some("HTTP/1.1 200 OK"));
		assert_eq!(lines.next(), Some("Server: brazier"));
		assert!(lines.next().unwrap().starts_with("Date: "));
		assert_eq!(lines.next(), Some("Connection: keep-alive"));
		assert_eq!(lines.next(), Some("Content-Length: 4"));
		assert_eq!(lines.next(), Some("X-App: demo"));
		assert_eq!(lines.next(), Some(""));
	}

	#[test]
	fn head_request_response_omits_content_length() {
		let headers = HeaderMap::new();
		let head = render_response_head(200, "brazier", false, true, 4, &headers);
		assert!(!head.contains("Content-Length"));
	}

	#[test]
	fn handler_supplied_content_length_is_not_duplicated() {
		let mut headers = HeaderMap::new();
		headers.append("Content-Length", "0");
		let head = render_response_head(204, "brazier", false, false, 0, &headers);
		assert_eq!(head.matches("Content-Length").count(), 1);
	}

	#[test]
	fn handshake_head_never_carries_content_length_and_fixes_connection_to_upgrade() {
		let mut headers = HeaderMap::new();
		headers.append("Upgrade", "websocket");
		headers.append("Sec-WebSocket-Accept", "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");

		let head = render_handshake_head("brazier", &headers);
		let mut lines = head.split("\r\n");

		assert_eq!(lines.next(), Some("HTTP/1.1 101 Switching Protocols"));
		assert_eq!(lines.next(), Some("Server: brazier"));
		assert!(lines.next().unwrap().starts_with("Date: "));
		assert_eq!(lines.next(), Some("Connection: Upgrade"));
		assert_eq!(lines.next(), Some("Upgrade: websocket"));
		assert_eq!(
			lines.next(),
			Some("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=")
		);
		assert_eq!(lines.next(), Some(""));
		assert!(!head.contains("Content-Length"));
	}
}
