//! Newline framing over a byte stream.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};

use crate::error::DecodeError;
use crate::message::{Inbound, Outbound};

/// Default upper bound for one line. Documents larger than this are dropped.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// One decoded line.
///
/// Per-line problems are items rather than codec errors: a framed stream
/// stops after its first error, and a bad line must never end the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
	/// A recognized message.
	Message(Inbound),
	/// A line matching no known token.
	Ignored(String),
	/// A recognized token with a bad payload.
	Malformed(DecodeError),
	/// A line exceeding the length limit; its bytes were discarded.
	Oversized,
}

/// Codec decoding editor lines into [`Frame`]s and encoding [`Outbound`]
/// messages as single flushed lines.
#[derive(Debug, Clone)]
pub struct MessageCodec {
	lines: AnyDelimiterCodec,
}

impl MessageCodec {
	/// Creates a codec with [`DEFAULT_MAX_LINE_LENGTH`].
	#[must_use]
	pub fn new() -> Self {
		Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
	}

	/// Creates a codec that discards lines longer than `max_length` bytes.
	#[must_use]
	pub fn with_max_length(max_length: usize) -> Self {
		Self {
			lines: AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), max_length),
		}
	}

	fn classify(chunk: Bytes) -> Frame {
		let bytes: &[u8] = chunk.strip_suffix(b"\r").unwrap_or(&chunk);
		let Ok(line) = std::str::from_utf8(bytes) else {
			return Frame::Malformed(DecodeError::NotUtf8Line { len: bytes.len() });
		};
		match Inbound::decode(line) {
			Ok(Some(msg)) => Frame::Message(msg),
			Ok(None) => Frame::Ignored(line.to_string()),
			Err(e) => Frame::Malformed(e),
		}
	}

	fn lift(result: Result<Option<Bytes>, AnyDelimiterCodecError>) -> io::Result<Option<Frame>> {
		match result {
			Ok(line) => Ok(line.map(Self::classify)),
			Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => Ok(Some(Frame::Oversized)),
			Err(AnyDelimiterCodecError::Io(e)) => Err(e),
		}
	}
}

impl Default for MessageCodec {
	fn default() -> Self {
		Self::new()
	}
}

impl Decoder for MessageCodec {
	type Item = Frame;
	type Error = io::Error;

	fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Frame>> {
		Self::lift(self.lines.decode(src))
	}

	fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<Frame>> {
		Self::lift(self.lines.decode_eof(src))
	}
}

impl Encoder<Outbound> for MessageCodec {
	type Error = io::Error;

	fn encode(&mut self, msg: Outbound, dst: &mut BytesMut) -> io::Result<()> {
		let line = msg.encode();
		dst.reserve(line.len() + 1);
		dst.extend_from_slice(line.as_bytes());
		dst.extend_from_slice(b"\n");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use futures::{SinkExt, StreamExt};
	use pretty_assertions::assert_eq;
	use tokio::io::AsyncWriteExt;
	use tokio_util::codec::{FramedRead, FramedWrite};

	use super::*;

	#[tokio::test(flavor = "current_thread")]
	async fn bad_lines_do_not_end_the_stream() {
		let (mut tx, rx) = tokio::io::duplex(1024);
		tx.write_all(b"STRUDEL_CONTENT:%%%\nSOMETHING_NEW\r\nSTRUDEL_QUIT\n").await.unwrap();
		drop(tx);

		let frames: Vec<_> = FramedRead::new(rx, MessageCodec::new())
			.map(|f| f.unwrap())
			.collect()
			.await;

		assert_eq!(frames.len(), 3);
		assert!(matches!(frames[0], Frame::Malformed(DecodeError::Base64 { .. })));
		assert_eq!(frames[1], Frame::Ignored("SOMETHING_NEW".to_string()));
		assert_eq!(frames[2], Frame::Message(Inbound::Quit));
	}

	#[tokio::test(flavor = "current_thread")]
	async fn non_utf8_line_is_malformed_not_fatal() {
		let (mut tx, rx) = tokio::io::duplex(1024);
		tx.write_all(b"STRUDEL_TOGGLE\nGARBAGE\xff\xfe\nSTRUDEL_CONTENT:aGVsbG8=\r\n").await.unwrap();
		drop(tx);

		let frames: Vec<_> = FramedRead::new(rx, MessageCodec::new())
			.map(|f| f.unwrap())
			.collect()
			.await;

		assert_eq!(
			frames,
			vec![
				Frame::Message(Inbound::Toggle),
				Frame::Malformed(DecodeError::NotUtf8Line { len: 9 }),
				Frame::Message(Inbound::Content("hello".into())),
			]
		);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn oversized_lines_are_skipped() {
		let (mut tx, rx) = tokio::io::duplex(1024);
		tx.write_all(b"STRUDEL_CONTENT:aGVsbG8gd29ybGQ=\nSTRUDEL_STOP\n").await.unwrap();
		drop(tx);

		let frames: Vec<_> = FramedRead::new(rx, MessageCodec::with_max_length(20))
			.map(|f| f.unwrap())
			.collect()
			.await;

		assert_eq!(frames, vec![Frame::Oversized, Frame::Message(Inbound::Stop)]);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn final_line_without_newline_is_decoded() {
		let (mut tx, rx) = tokio::io::duplex(64);
		tx.write_all(b"STRUDEL_TOGGLE").await.unwrap();
		drop(tx);

		let frames: Vec<_> = FramedRead::new(rx, MessageCodec::new())
			.map(|f| f.unwrap())
			.collect()
			.await;

		assert_eq!(frames, vec![Frame::Message(Inbound::Toggle)]);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn each_outbound_message_is_one_line() {
		let mut buf = Vec::new();
		{
			let mut sink = FramedWrite::new(&mut buf, MessageCodec::new());
			sink.send(Outbound::Ready).await.unwrap();
			sink.send(Outbound::Content("a\nb".into())).await.unwrap();
		}

		assert_eq!(String::from_utf8(buf).unwrap(), "STRUDEL_READY\nSTRUDEL_CONTENT:YQpi\n");
	}
}
