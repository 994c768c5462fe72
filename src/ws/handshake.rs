//! The WebSocket upgrade handshake (spec §4.7 "Handshake").

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha1::{Digest, Sha1};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

const MAGIC_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes `Sec-WebSocket-Accept = Base64(SHA1(client_key || MAGIC_GUID))`
/// (spec §4.7, §8 invariant 4).
pub fn accept_key(client_key: &str) -> String {
	let mut hasher = Sha1::new();
	hasher.update(client_key.as_bytes());
	hasher.update(MAGIC_GUID.as_bytes());
	let digest = hasher.finalize();

	BASE64.encode(digest)
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn matches_the_rfc_6455_worked_example() {
		// spec §8 scenario 6 / RFC 6455 §1.3.
		assert_eq!(
			accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
			"s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
		);
	}
}
