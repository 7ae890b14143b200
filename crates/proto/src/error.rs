//! Decode errors for malformed message payloads.

use thiserror::Error;

/// A recognized message whose payload could not be decoded.
///
/// These are never fatal: the offending line is dropped and the stream
/// continues with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
	/// Payload is not valid base64.
	#[error("invalid base64 payload for {token}: {reason}")]
	Base64 {
		/// Token prefix of the offending message.
		token: &'static str,
		/// Decoder diagnostic.
		reason: String,
	},

	/// Payload decoded to bytes that are not UTF-8.
	#[error("payload for {token} is not valid UTF-8")]
	Utf8 {
		/// Token prefix of the offending message.
		token: &'static str,
	},

	/// The line itself is not UTF-8, so no token could be read.
	#[error("editor line of {len} bytes is not valid UTF-8")]
	NotUtf8Line {
		/// Line length in bytes, without the delimiter.
		len: usize,
	},

	/// Cursor payload is not an integer.
	#[error("invalid cursor position {0:?}")]
	Cursor(String),
}
