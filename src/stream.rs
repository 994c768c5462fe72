//! The polymorphic plain/TLS byte stream and the two wire primitives built on
//! top of it (spec §4.1, §9 "Polymorphic stream").

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;

#[cfg(feature = "tls")]
use tokio_rustls::server::TlsStream;

use crate::error::ImplError;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// A connection's transport, generic over plain TCP and TLS at the read/write
/// interface. The connection state machine and everything above it is
/// written against this type and never needs to know which variant it holds,
/// other than through [`is_secure`](Stream::is_secure).
pub enum Stream {
	Plain(TcpStream),
	#[cfg(feature = "tls")]
	Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
	pub fn is_secure(&self) -> bool {
		match self {
			Stream::Plain(_) => false,
			#[cfg(feature = "tls")]
			Stream::Tls(_) => true,
		}
	}
}

impl AsyncRead for Stream {
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &mut ReadBuf<'_>,
	) -> Poll<std::io::Result<()>> {
		match self.get_mut() {
			Stream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
			#[cfg(feature = "tls")]
			Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
		}
	}
}

impl AsyncWrite for Stream {
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &[u8],
	) -> Poll<std::io::Result<usize>> {
		match self.get_mut() {
			Stream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
			#[cfg(feature = "tls")]
			Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
		}
	}

	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
		match self.get_mut() {
			Stream::Plain(stream) => Pin::new(stream).poll_flush(cx),
			#[cfg(feature = "tls")]
			Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
		}
	}

	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
		match self.get_mut() {
			Stream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
			#[cfg(feature = "tls")]
			Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
		}
	}
}

// --------------------------------------------------------------------------------
// Wire primitives (spec §4.1)

#[derive(Debug, ImplError)]
pub enum WireError {
	#[error("connection closed before a complete line was read")]
	ConnectionClosed,
	#[error("malformed line: stray CR or LF outside the terminating CRLF")]
	MalformedLine,
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// Reads bytes up to and including a CRLF, returning the line with the
/// terminator stripped. A lone CR or LF that isn't part of a CRLF pair is a
/// `MalformedLine`; EOF before any byte is read is `ConnectionClosed`.
pub async fn read_line(stream: &mut Stream) -> Result<String, WireError> {
	let mut line = Vec::new();
	let mut previous_was_cr = false;
	let mut byte = [0u8; 1];
	let mut read_any = false;

	loop {
		let n = stream.read(&mut byte).await?;

		if n == 0 {
			if !read_any {
				return Err(WireError::ConnectionClosed);
			}
			return Err(WireError::MalformedLine);
		}

		read_any = true;
		let b = byte[0];

		if previous_was_cr {
			if b == b'\n' {
				line.pop();
				break;
			} else {
				return Err(WireError::MalformedLine);
			}
		}

		if b == b'\n' {
			return Err(WireError::MalformedLine);
		}

		line.push(b);
		previous_was_cr = b == b'\r';
	}

	String::from_utf8(line).map_err(|_| WireError::MalformedLine)
}

/// Reads exactly `n` bytes, chunked internally so a single call never asks
/// the platform for an unbounded read. `ConnectionClosed` on early EOF.
pub async fn read_exact_chunked(
	stream: &mut Stream,
	n: usize,
	chunk_size: usize,
) -> Result<Vec<u8>, WireError> {
	let mut out = Vec::with_capacity(n);
	let mut remaining = n;

	while remaining > 0 {
		let this_chunk = remaining.min(chunk_size.max(1));
		let mut buffer = vec![0u8; this_chunk];

		stream
			.read_exact(&mut buffer)
			.await
			.map_err(|err| match err.kind() {
				std::io::ErrorKind::UnexpectedEof => WireError::ConnectionClosed,
				_ => WireError::Io(err),
			})?;

		out.extend_from_slice(&buffer);
		remaining -= this_chunk;
	}

	Ok(out)
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::net::{TcpListener, TcpStream};

	async fn connected_pair() -> (Stream, TcpStream) {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		let client = TcpStream::connect(addr).await.unwrap();
		let (server, _) = listener.accept().await.unwrap();

		(Stream::Plain(server), client)
	}

	#[tokio::test]
	async fn read_line_strips_crlf() {
		let (mut server, mut client) = connected_pair().await;
		client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

		let line = read_line(&mut server).await.unwrap();
		assert_eq!(line, "GET / HTTP/1.1");
	}

	#[tokio::test]
	async fn read_line_rejects_lone_lf() {
		let (mut server, mut client) = connected_pair().await;
		client.write_all(b"abc\ndef").await.unwrap();
		client.shutdown().await.unwrap();

		let result = read_line(&mut server).await;
		assert!(matches!(result, Err(WireError::MalformedLine)));
	}

	#[tokio::test]
	async fn read_line_reports_connection_closed_on_immediate_eof() {
		let (mut server, client) = connected_pair().await;
		drop(client);

		let result = read_line(&mut server).await;
		assert!(matches!(result, Err(WireError::ConnectionClosed)));
	}

	#[tokio::test]
	async fn read_exact_chunked_assembles_full_payload_across_chunks() {
		let (mut server, mut client) = connected_pair().await;
		let payload = vec![7u8; 10_000];
		client.write_all(&payload).await.unwrap();

		let read = read_exact_chunked(&mut server, payload.len(), 1024)
			.await
			.unwrap();

		assert_eq!(read, payload);
	}

	#[tokio::test]
	async fn plain_stream_reports_insecure() {
		let (server, _client) = connected_pair().await;
		assert!(!server.is_secure());
	}
}
