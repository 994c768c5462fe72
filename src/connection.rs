//! The per-connection state machine (spec §4.4): request loop, dispatch,
//! response framing, and the point where a request diverts into the
//! WebSocket lifecycle (spec §4.7).

use std::sync::Arc;

use crate::body::{spool_body, SpoolOutcome};
use crate::config::ServerConfig;
use crate::context::HttpContext;
use crate::diagnostics::trace_event;
use crate::handler::RequestHandler;
use crate::header::{parse_header_line, parse_request_line, HeaderMap};
use crate::method::HttpMethod;
use crate::request::Request;
use crate::stream::{read_line, Stream, WireError};
use crate::url::RequestUrl;
use crate::ws::{handshake, WSFrame, WSOpCode, WSState, WSStatusCode, WebSocket};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// The `Server` header value (spec §6: "implementers should choose their own
/// identifier string").
pub const SERVER_NAME: &str = "brazier";

enum RequestOutcome {
	Normal,
	WebSocketPending,
	PolicyRejection { status: u16, message: String },
}

/// Runs one accepted connection to completion: the sequential keep-alive
/// request loop, diverting into the WebSocket lifecycle the first time a
/// request upgrades, and returning once the connection closes for any
/// reason. All errors are contained here — nothing propagates to the
/// listener (spec §7, "Propagation policy").
pub async fn handle_connection(
	mut stream: Stream,
	config: Arc<ServerConfig>,
	handler: Arc<dyn RequestHandler>,
) {
	let is_secure = stream.is_secure();
	let local_port = if is_secure {
		config
			.tls_settings
			.as_ref()
			.map(|tls| tls.port)
			.unwrap_or(config.port)
	} else {
		config.port
	};

	loop {
		let line = match read_line(&mut stream).await {
			Ok(line) => line,
			Err(WireError::ConnectionClosed) => {
				trace_event(config.trace, "connection closed before next request");
				return;
			}
			Err(error) => {
				trace_event(config.trace, &format!("I/O failure reading request line: {error}"));
				return;
			}
		};

		if line.is_empty() {
			trace_event(config.trace, "empty request line; closing connection");
			return;
		}

		let (request, outcome) =
			match build_request(&mut stream, &line, is_secure, &config.address, local_port, &config).await {
				Ok(parsed) => parsed,
				Err(()) => {
					trace_event(
						config.trace,
						"malformed request line/headers or unknown method; closing connection",
					);
					return;
				}
			};

		let mut ctx = HttpContext::new(stream, request, SERVER_NAME, config.keep_alive);

		match outcome {
			RequestOutcome::PolicyRejection { status, message } => {
				if let Err(error) = ctx.send_policy_rejection(status, message).await {
					trace_event(config.trace, &format!("write failure on policy rejection: {error}"));
				}
				return;
			}
			RequestOutcome::WebSocketPending => {
				run_websocket(ctx, &config, &handler).await;
				return;
			}
			RequestOutcome::Normal => {
				ctx = handler.call(ctx).await;

				if !ctx.has_sent() {
					trace_event(
						config.trace,
						"handler returned without calling HttpContext::send; closing connection",
					);
					return;
				}

				let keep_alive = ctx.keep_alive;
				crate::body::release(&ctx.request.body).await;
				stream = ctx.into_stream();

				if !keep_alive {
					return;
				}
			}
		}
	}
}

/// Parses the request line, headers, and (if applicable) spools the body,
/// returning the assembled `Request` plus what the connection loop should
/// do with it. Any parse failure is reported as `Err(())` — spec §4.2: an
/// unknown method or malformed line closes the connection silently, with no
/// error response.
async fn build_request(
	stream: &mut Stream,
	request_line: &str,
	is_secure: bool,
	bind_address: &str,
	bind_port: u16,
	config: &ServerConfig,
) -> Result<(Request, RequestOutcome), ()> {
	let line = parse_request_line(request_line).map_err(|_| ())?;
	let method = HttpMethod::parse(&line.method_token).ok_or(())?;

	let mut url = RequestUrl::from_request_target(&line.target).map_err(|_| ())?;
	url.set_scheme(if is_secure { "https" } else { "http" });
	url.set_authority(bind_address, Some(bind_port));

	let mut headers = HeaderMap::new();

	loop {
		let header_line = read_line(stream).await.map_err(|_| ())?;

		if header_line.is_empty() {
			break;
		}

		parse_header_line(&header_line, &mut headers).map_err(|_| ())?;
	}

	if let Some(host_header) = headers.get("host") {
		url.override_from_host_header(host_header);
	}

	let is_websocket_upgrade =
		method == HttpMethod::Get && headers.value_contains_token("upgrade", "websocket");

	if is_websocket_upgrade {
		url.set_scheme(if is_secure { "wss" } else { "ws" });
	}

	let mut request = Request::new(line.version, method, url);
	request.headers = headers;

	if is_websocket_upgrade {
		return Ok((request, RequestOutcome::WebSocketPending));
	}

	if method.carries_request_body() {
		let declared_length = request
			.headers
			.get("content-length")
			.and_then(|value| value.trim().parse::<u64>().ok());

		match spool_body(
			stream,
			declared_length,
			config.max_body_length,
			config.read_body_buffer,
			&config.tmp_body_dir,
		)
		.await
		{
			Ok(SpoolOutcome::Spooled(body)) => request.body = body,
			Ok(SpoolOutcome::LengthRequired) => {
				return Ok((
					request,
					RequestOutcome::PolicyRejection {
						status: 411,
						message: "Length Required".to_owned(),
					},
				));
			}
			Ok(SpoolOutcome::PayloadTooLarge { max_body_length }) => {
				let max_mb = max_body_length / (1024 * 1024);
				return Ok((
					request,
					RequestOutcome::PolicyRejection {
						status: 413,
						message: format!("request larger than {max_mb} MB not allowed."),
					},
				));
			}
			Err(_) => return Err(()),
		}
	}

	Ok((request, RequestOutcome::Normal))
}

// --------------------------------------------------------------------------------
// WebSocket lifecycle (spec §4.7)

/// Completes the upgrade handshake and, on success, runs the Open-state
/// frame loop until the connection closes. `ctx` arrives with
/// `request`/`response` populated from the upgrade request itself; the
/// handshake response is written directly to the stream rather than through
/// `HttpContext::send` since its header set (`Upgrade`, `Sec-WebSocket-Accept`)
/// doesn't fit the plain-HTTP framer.
async fn run_websocket(mut ctx: HttpContext, config: &ServerConfig, handler: &Arc<dyn RequestHandler>) {
	let client_key = ctx.request.headers.get("sec-websocket-key").map(str::to_owned);

	let mut websocket = WebSocket::new(ctx.request.headers.clone());

	let Some(client_key) = client_key.filter(|key| !key.is_empty()) else {
		websocket.last_status = Some(WSStatusCode::HandShakeFailed);
		trace_event(config.trace, "WebSocket handshake failed: missing Sec-WebSocket-Key");
		return;
	};

	let accept = handshake::accept_key(&client_key);

	let mut response_headers = HeaderMap::new();
	response_headers.append("Upgrade", "websocket");
	response_headers.append("Sec-WebSocket-Accept", accept);

	let head = crate::header::render_handshake_head(SERVER_NAME, &response_headers);

	use tokio::io::AsyncWriteExt;
	if let Err(error) = ctx.stream_mut().write_all(head.as_bytes()).await {
		trace_event(config.trace, &format!("WebSocket handshake write failed: {error}"));
		return;
	}

	websocket.handshake_response_headers = response_headers;
	websocket.state = WSState::Open;
	ctx.websocket = Some(websocket);

	run_open_loop(ctx, config, handler).await;
}

/// The Open-state per-frame loop (spec §4.7 "Open state, per frame").
async fn run_open_loop(mut ctx: HttpContext, config: &ServerConfig, handler: &Arc<dyn RequestHandler>) {
	loop {
		let frame = {
			let stream = ctx.stream_mut();
			WSFrame::read(stream, config.max_body_length).await
		};

		let frame = match frame {
			Ok(frame) => frame,
			Err(crate::ws::FrameError::PayloadTooBig(_)) => {
				let ws = ctx.websocket.as_mut().expect("websocket is attached in the open loop");
				ws.last_status = Some(WSStatusCode::PayloadTooBig);
				trace_event(config.trace, "WebSocket payload exceeded the configured maximum; closing");
				return;
			}
			Err(_) => {
				trace_event(config.trace, "WebSocket read failure; closing connection");
				return;
			}
		};

		match frame.opcode {
			WSOpCode::Text | WSOpCode::Binary | WSOpCode::Continuation => {
				ctx.websocket.as_mut().expect("websocket is attached").in_frame = Some(frame);

				ctx = handler.call(ctx).await;

				let out_frame = ctx
					.websocket
					.as_mut()
					.expect("handler must not clear the websocket state")
					.out_frame
					.take();

				if let Some(out_frame) = out_frame {
					let stream = ctx.stream_mut();
					if let Err(error) = out_frame.write(stream).await {
						trace_event(config.trace, &format!("WebSocket write failure: {error}"));
						return;
					}
				}
			}
			WSOpCode::Ping => {
				let pong = WSFrame::new(WSOpCode::Pong, frame.payload);
				let stream = ctx.stream_mut();
				if let Err(error) = pong.write(stream).await {
					trace_event(config.trace, &format!("WebSocket pong write failure: {error}"));
					return;
				}
			}
			WSOpCode::Pong => {
				let ws = ctx.websocket.as_mut().expect("websocket is attached");
				if frame.payload.as_slice() != ws.hash_id {
					ws.last_status = Some(WSStatusCode::UnknownOpcode);
					trace_event(config.trace, "unsolicited WebSocket pong with unexpected nonce; closing");
					return;
				}
			}
			WSOpCode::Close => {
				let ws = ctx.websocket.as_mut().expect("websocket is attached");
				ws.state = WSState::Close;
				ws.last_status = Some(WSStatusCode::UnexpectedClose);
				trace_event(config.trace, "received WebSocket close frame; closing connection");
				return;
			}
			WSOpCode::Other(opcode) => {
				trace_event(config.trace, &format!("ignoring unrecognized WebSocket opcode {opcode}"));
			}
		}
	}
}

// --------------------------------------------------------------------------------
