//! The per-connection request/response context (spec §3, §4.4-§4.5).
//!
//! Unlike the WebSocket frame codec, which is handed a `&mut Stream` for the
//! duration of a single read or write, `HttpContext` owns the connection's
//! `Stream` outright. The spec describes the context as holding a "client
//! stream reference" because the source this spec is based on threads a
//! shared handle through callback closures; in Rust, since exactly one
//! `HttpContext` ever exists per connection and it is never shared across
//! tasks, outright ownership is the direct translation and avoids a
//! self-referential lifetime for no behavioral difference (see DESIGN.md).

use bytes::Bytes;

use crate::error::ImplError;
use crate::header::{render_response_head, suppresses_response_body};
use crate::request::Request;
use crate::response::Response;
use crate::stream::Stream;
use crate::ws::WebSocket;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[derive(Debug, ImplError)]
pub enum SendError {
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// One per connection (spec §3), constructed right after accept and reused
/// (cleared, not reallocated) across every keep-alive request on that
/// connection.
pub struct HttpContext {
	pub request: Request,
	pub response: Response,
	stream: Stream,
	pub is_secure: bool,
	pub keep_alive: bool,
	pub websocket: Option<WebSocket>,
	pub(crate) server_name: &'static str,
	server_keep_alive: bool,
	sent: bool,
}

impl HttpContext {
	/// `server_keep_alive` is [`ServerConfig::keep_alive`](crate::config::ServerConfig::keep_alive)
	/// — fixed for the connection's lifetime, so it's baked in here rather
	/// than threaded through every [`send`](Self::send) call.
	pub fn new(
		stream: Stream,
		request: Request,
		server_name: &'static str,
		server_keep_alive: bool,
	) -> Self {
		let is_secure = stream.is_secure();

		Self {
			request,
			response: Response::new(),
			stream,
			is_secure,
			keep_alive: true,
			websocket: None,
			server_name,
			server_keep_alive,
			sent: false,
		}
	}

	pub fn stream_mut(&mut self) -> &mut Stream {
		&mut self.stream
	}

	pub fn into_stream(self) -> Stream {
		self.stream
	}

	/// `true` once [`send`](Self::send) has been called for the current
	/// request — the connection loop uses this to detect a handler that
	/// never called it (spec §6, "failing to call send leaks the connection").
	pub fn has_sent(&self) -> bool {
		self.sent
	}

	/// The response framer (spec §4.5). Computes the keep-alive decision,
	/// renders the header block, writes header (and, unless this was a HEAD
	/// request, the body) to the stream, and records whether the connection
	/// should be reused. Does not itself close the stream on a `close`
	/// decision — that's the connection loop's job, since it owns the accept
	/// loop's notion of "this connection is done".
	pub async fn send(&mut self) -> Result<(), SendError> {
		use tokio::io::AsyncWriteExt;

		let reuse = self.server_keep_alive
			&& self.keep_alive
			&& self.request.headers.value_contains_token("connection", "keep-alive")
			&& !self.request.headers.value_contains_token("connection", "close");

		let head = render_response_head(
			self.response.status_code,
			self.server_name,
			reuse,
			suppresses_response_body(self.request.method),
			self.response.body.len(),
			&self.response.headers,
		);

		self.stream.write_all(head.as_bytes()).await?;

		if !suppresses_response_body(self.request.method) {
			self.stream.write_all(&self.response.body).await?;
		}

		self.stream.flush().await?;

		self.keep_alive = reuse;
		self.sent = true;

		Ok(())
	}

	/// Sends a server-originated response (spec §4.4.h, size-policy
	/// rejections) without going through the user callback at all. Always
	/// closes the connection afterward, matching every current §8 scenario
	/// that triggers one (411, 413).
	pub async fn send_policy_rejection(
		&mut self,
		status_code: u16,
		message: impl Into<String>,
	) -> Result<(), SendError> {
		self.response = Response::policy_rejection(status_code, message);
		self.keep_alive = false;
		self.send().await
	}

	pub fn response_body(&self) -> &Bytes {
		&self.response.body
	}
}

// --------------------------------------------------------------------------------
