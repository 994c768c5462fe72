#![allow(dead_code)]

//! An HTTP/1.1 origin server with persistent connections and an integrated
//! WebSocket (RFC 6455) upgrade path.
//!
//! The crate exposes a [`config::ServerConfig`], a [`handler::RequestHandler`]
//! the application implements (or a plain async closure, via the blanket
//! impl), and a [`listener::serve`] entry point that ties the two together
//! with an accept loop.

mod body;
mod config;
mod connection;
mod context;
mod diagnostics;
mod error;
mod handler;
mod header;
mod listener;
mod method;
mod request;
mod response;
mod status;
mod stream;
#[cfg(feature = "tls")]
mod tls;
mod url;
mod ws;

pub use body::Body;
pub use config::{ServerConfig, TlsSettings};
pub use context::HttpContext;
pub use diagnostics::last_bound_site_url;
pub use handler::RequestHandler;
pub use header::HeaderMap;
pub use listener::{serve, ListenError};
pub use method::HttpMethod;
pub use request::Request;
pub use response::Response;
pub use ws::{WSFrame, WSOpCode, WSState, WSStatusCode, WebSocket};
