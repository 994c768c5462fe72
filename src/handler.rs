//! The single application-supplied callback the connection state machine
//! dispatches into (spec §1, "a user collaborator: the core exposes a
//! context object and invokes a single application-supplied callback per
//! request").
//!
//! The callback takes the [`HttpContext`] *by value* and hands it back once
//! it's done. A borrowing signature (`Fn(&mut HttpContext) -> impl Future`)
//! can't be expressed as a single concrete associated type without `async fn`
//! in traits supporting per-call lifetimes, which stable Rust doesn't give a
//! trait-object-safe way to do; by-value ownership sidesteps that and is the
//! same trick `tower::Service` and `hyper::service::Service` use (see
//! DESIGN.md).

use std::future::Future;
use std::pin::Pin;

use crate::context::HttpContext;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Invoked once per plain HTTP request (spec §4.4.f) and, independently,
/// once per inbound non-control WebSocket frame (spec §4.7 "Open state").
/// Both share this trait: the context either carries a populated
/// `Request`/`Response` pair or a populated `WebSocket.in_frame`, and the
/// handler is expected to call [`HttpContext::send`](crate::context::HttpContext::send)
/// (HTTP) or set `out_frame` (WebSocket) before returning.
pub trait RequestHandler: Send + Sync + 'static {
	fn call(&self, ctx: HttpContext) -> BoxFuture<HttpContext>;
}

impl<F, Fut> RequestHandler for F
where
	F: Fn(HttpContext) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = HttpContext> + Send + 'static,
{
	fn call(&self, ctx: HttpContext) -> BoxFuture<HttpContext> {
		Box::pin((self)(ctx))
	}
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::method::HttpMethod;
	use crate::request::Request;
	use crate::stream::Stream;
	use crate::url::RequestUrl;
	use bytes::Bytes;

	async fn connected_stream() -> Stream {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
			.await
			.unwrap();
		let addr = listener.local_addr().unwrap();
		let _client = tokio::net::TcpStream::connect(addr).await.unwrap();
		let (server, _) = listener.accept().await.unwrap();
		Stream::Plain(server)
	}

	#[tokio::test]
	async fn a_plain_async_closure_implements_request_handler() {
		let handler = |mut ctx: HttpContext| async move {
			ctx.response.body = Bytes::from_static(b"Halo");
			ctx
		};

		let request = Request::new(
			"HTTP/1.1".into(),
			HttpMethod::Get,
			RequestUrl::from_request_target("/").unwrap(),
		);
		let ctx = HttpContext::new(connected_stream().await, request, "brazier", false);

		let ctx = handler.call(ctx).await;
		assert_eq!(ctx.response_body(), &Bytes::from_static(b"Halo"));
	}
}
