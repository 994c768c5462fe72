//! WebSocket close status codes, RFC 6455 §7.4.1 (spec §4.7).

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WSStatusCode {
	Ok,
	GoingAway,
	BadProtocol,
	UnknownOpcode,
	BadPayload,
	ViolatesPolicy,
	PayloadTooBig,
	HandShakeFailed,
	UnexpectedClose,
}

impl WSStatusCode {
	pub fn code(self) -> u16 {
		match self {
			Self::Ok => 1000,
			Self::GoingAway => 1001,
			Self::BadProtocol => 1002,
			Self::UnknownOpcode => 1003,
			Self::BadPayload => 1007,
			Self::ViolatesPolicy => 1008,
			Self::PayloadTooBig => 1009,
			Self::HandShakeFailed => 1010,
			Self::UnexpectedClose => 1011,
		}
	}

	pub fn from_code(code: u16) -> Option<Self> {
		Some(match code {
			1000 => Self::Ok,
			1001 => Self::GoingAway,
			1002 => Self::BadProtocol,
			1003 => Self::UnknownOpcode,
			1007 => Self::BadPayload,
			1008 => Self::ViolatesPolicy,
			1009 => Self::PayloadTooBig,
			1010 => Self::HandShakeFailed,
			1011 => Self::UnexpectedClose,
			_ => return None,
		})
	}
}

// --------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn codes_match_the_rfc_6455_registry() {
		assert_eq!(WSStatusCode::Ok.code(), 1000);
		assert_eq!(WSStatusCode::UnknownOpcode.code(), 1003);
		assert_eq!(WSStatusCode::PayloadTooBig.code(), 1009);
		assert_eq!(WSStatusCode::HandShakeFailed.code(), 1010);
		assert_eq!(WSStatusCode::UnexpectedClose.code(), 1011);
	}

	#[test]
	fn from_code_round_trips() {
		for status in [
			WSStatusCode::Ok,
			WSStatusCode::GoingAway,
			WSStatusCode::BadProtocol,
			WSStatusCode::UnknownOpcode,
			WSStatusCode::BadPayload,
			WSStatusCode::ViolatesPolicy,
			WSStatusCode::PayloadTooBig,
			WSStatusCode::HandShakeFailed,
			WSStatusCode::UnexpectedClose,
		] {
			assert_eq!(WSStatusCode::from_code(status.code()), Some(status));
		}
	}

	#[test]
	fn unregistered_code_is_none() {
		assert_eq!(WSStatusCode::from_code(9999), None);
	}
}
