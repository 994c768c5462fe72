//! The WebSocket frame codec: parse and serialize, with XOR masking applied
//! or stripped in place (spec §4.6).

use rand::Rng;

use crate::error::ImplError;
use crate::stream::{read_exact_chunked, Stream, WireError};
use crate::ws::opcode::WSOpCode;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[derive(Debug, ImplError)]
pub enum FrameError {
	#[error(transparent)]
	Wire(#[from] WireError),
	#[error("frame payload length {0} exceeds the configured maximum")]
	PayloadTooBig(u64),
}

/// A single WebSocket frame (spec §3). Payload is always held unmasked —
/// masking is a wire-level transform applied at the read/write boundary,
/// never part of the frame's logical content.
#[derive(Debug, Clone)]
pub struct WSFrame {
	pub fin: bool,
	pub rsv1: bool,
	pub rsv2: bool,
	pub rsv3: bool,
	pub opcode: WSOpCode,
	pub payload: Vec<u8>,
}

impl WSFrame {
	pub fn new(opcode: WSOpCode, payload: Vec<u8>) -> Self {
		Self {
			fin: true,
			rsv1: false,
			rsv2: false,
			rsv3: false,
			opcode,
			payload,
		}
	}

	/// Reads one frame off `stream` (spec §4.6 "Inbound frame parse"). Masked
	/// frames are unmasked in place before the payload is returned; a payload
	/// over `max_payload_len` is reported without being buffered in full.
	pub async fn read(stream: &mut Stream, max_payload_len: u64) -> Result<Self, FrameError> {
		let header = read_exact_chunked(stream, 2, 2).await?;

		let fin = header[0] & 0b1000_0000 != 0;
		let rsv1 = header[0] & 0b0100_0000 != 0;
		let rsv2 = header[0] & 0b0010_0000 != 0;
		let rsv3 = header[0] & 0b0001_0000 != 0;
		let opcode = WSOpCode::from_nibble(header[0] & 0b0000_1111);

		let masked = header[1] & 0b1000_0000 != 0;
		let len7 = header[1] & 0b0111_1111;

		let payload_len: u64 = match len7 {
			126 => {
				let extended = read_exact_chunked(stream, 2, 2).await?;
				u16::from_be_bytes([extended[0], extended[1]]) as u64
			}
			127 => {
				let extended = read_exact_chunked(stream, 8, 8).await?;
				u64::from_be_bytes(extended.try_into().expect("exactly 8 bytes were read"))
			}
			n => n as u64,
		};

		if payload_len > max_payload_len {
			return Err(FrameError::PayloadTooBig(payload_len));
		}

		let mask_key = if masked {
			let key = read_exact_chunked(stream, 4, 4).await?;
			Some([key[0], key[1], key[2], key[3]])
		} else {
			None
		};

		let mut payload = read_exact_chunked(stream, payload_len as usize, 64 * 1024).await?;

		if let Some(mask_key) = mask_key {
			apply_mask(&mut payload, mask_key);
		}

		Ok(Self {
			fin,
			rsv1,
			rsv2,
			rsv3,
			opcode,
			payload,
		})
	}

	/// Serializes this frame for the wire. The server always sends unmasked
	/// frames; `masked_send` exists only for self-testing a client role
	/// (spec §4.6, "the codec additionally supports a masked-send mode used
	/// only for self-testing").
	pub fn encode(&self) -> Vec<u8> {
		self.encode_with_mask(false)
	}

	#[cfg(test)]
	pub fn encode_masked(&self) -> Vec<u8> {
		self.encode_with_mask(true)
	}

	fn encode_with_mask(&self, masked: bool) -> Vec<u8> {
		let mut out = Vec::with_capacity(self.payload.len() + 14);

		let mut first = self.opcode.to_nibble();
		if self.fin {
			first |= 0b1000_0000;
		}
		if self.rsv1 {
			first |= 0b0100_0000;
		}
		if self.rsv2 {
			first |= 0b0010_0000;
		}
		if self.rsv3 {
			first |= 0b0001_0000;
		}
		out.push(first);

		let len = self.payload.len();
		let mask_bit = if masked { 0b1000_0000 } else { 0 };

		if len < 126 {
			out.push(mask_bit | len as u8);
		} else if len <= u16::MAX as usize {
			out.push(mask_bit | 126);
			out.extend_from_slice(&(len as u16).to_be_bytes());
		} else {
			out.push(mask_bit | 127);
			out.extend_from_slice(&(len as u64).to_be_bytes());
		}

		if masked {
			let mask_key: [u8; 4] = rand::thread_rng().gen();
			out.extend_from_slice(&mask_key);

			let mut payload = self.payload.clone();
			apply_mask(&mut payload, mask_key);
			out.extend_from_slice(&payload);
		} else {
			out.extend_from_slice(&self.payload);
		}

		out
	}

	pub async fn write(&self, stream: &mut Stream) -> Result<(), FrameError> {
		use tokio::io::AsyncWriteExt;

		stream.write_all(&self.encode()).await.map_err(WireError::from)?;

		Ok(())
	}
}

/// XORs `data` in place against the repeating 4-byte `mask_key` — the same
/// transform decodes an inbound masked payload and encodes an outbound one
/// (spec §4.6 step 6).
pub fn apply_mask(data: &mut [u8], mask_key: [u8; 4]) {
	for (index, byte) in data.iter_mut().enumerate() {
		*byte ^= mask_key[index % 4];
	}
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::io::AsyncWriteExt;
	use tokio::net::{TcpListener, TcpStream};

	async fn connected_pair() -> (Stream, TcpStream) {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		let client = TcpStream::connect(addr).await.unwrap();
		let (server, _) = listener.accept().await.unwrap();

		(Stream::Plain(server), client)
	}

	#[test]
	fn mask_is_its_own_inverse() {
		let mut data = b"Hello".to_vec();
		let key = [1, 2, 3, 4];

		apply_mask(&mut data, key);
		assert_ne!(data, b"Hello");

		apply_mask(&mut data, key);
		assert_eq!(data, b"Hello");
	}

	#[tokio::test]
	async fn round_trips_unmasked_frame_of_every_boundary_length() {
		for len in [0usize, 125, 126, 65535, 65536] {
			let (mut server, mut client) = connected_pair().await;
			let payload = vec![0x42u8; len];
			let frame = WSFrame::new(WSOpCode::Binary, payload.clone());

			client.write_all(&frame.encode()).await.unwrap();
			drop(client);

			let parsed = WSFrame::read(&mut server, 1 << 20).await.unwrap();
			assert_eq!(parsed.payload, payload);
			assert_eq!(parsed.opcode, WSOpCode::Binary);
			assert!(parsed.fin);
		}
	}

	#[tokio::test]
	async fn round_trips_masked_frame() {
		let (mut server, mut client) = connected_pair().await;
		let frame = WSFrame::new(WSOpCode::Text, b"Hello".to_vec());

		client.write_all(&frame.encode_masked()).await.unwrap();
		drop(client);

		let parsed = WSFrame::read(&mut server, 1 << 20).await.unwrap();
		assert_eq!(parsed.payload, b"Hello");
	}

	#[tokio::test]
	async fn oversized_payload_is_rejected_before_full_read() {
		let (mut server, mut client) = connected_pair().await;
		let frame = WSFrame::new(WSOpCode::Binary, vec![0u8; 1000]);

		client.write_all(&frame.encode()).await.unwrap();

		let result = WSFrame::read(&mut server, 100).await;
		assert!(matches!(result, Err(FrameError::PayloadTooBig(1000))));
	}
}
