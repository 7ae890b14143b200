//! Message vocabulary and single-line encoding.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::DecodeError;

/// Wire tokens.
pub mod token {
	/// Document content, base64 payload. Sent in both directions.
	pub const CONTENT: &str = "STRUDEL_CONTENT:";
	/// Close the session and terminate the bridge.
	pub const QUIT: &str = "STRUDEL_QUIT";
	/// Toggle play/stop.
	pub const TOGGLE: &str = "STRUDEL_TOGGLE";
	/// Alias of [`TOGGLE`].
	pub const PLAY_STOP: &str = "STRUDEL_PLAY_STOP";
	/// Trigger (re-)evaluation.
	pub const UPDATE: &str = "STRUDEL_UPDATE";
	/// Re-evaluate only if playback already started.
	pub const REFRESH: &str = "STRUDEL_REFRESH";
	/// Stop playback and end the session.
	pub const STOP: &str = "STRUDEL_STOP";
	/// The bridge is ready for content.
	pub const READY: &str = "STRUDEL_READY";
	/// Cursor position, decimal integer payload.
	pub const CURSOR: &str = "STRUDEL_CURSOR:";
	/// Evaluation error message, base64 payload.
	pub const EVAL_ERROR: &str = "STRUDEL_EVAL_ERROR:";
}

/// Exact-match control tokens, checked before any prefixed token.
const CONTROL_TOKENS: [(&str, Inbound); 6] = [
	(token::QUIT, Inbound::Quit),
	(token::TOGGLE, Inbound::Toggle),
	(token::PLAY_STOP, Inbound::Toggle),
	(token::UPDATE, Inbound::Evaluate),
	(token::REFRESH, Inbound::Refresh),
	(token::STOP, Inbound::Stop),
];

/// Payload-free classification of a message, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
	/// Document content.
	Content,
	/// Play/stop toggle.
	Toggle,
	/// Evaluate.
	Evaluate,
	/// Conditional re-evaluation.
	Refresh,
	/// Stop playback and end the session.
	Stop,
	/// Session teardown.
	Quit,
	/// Cursor move.
	Cursor,
	/// Readiness signal.
	Ready,
	/// Evaluation error report.
	EvalError,
}

impl MessageKind {
	/// Short lowercase name for log fields.
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Content => "content",
			Self::Toggle => "toggle",
			Self::Evaluate => "evaluate",
			Self::Refresh => "refresh",
			Self::Stop => "stop",
			Self::Quit => "quit",
			Self::Cursor => "cursor",
			Self::Ready => "ready",
			Self::EvalError => "eval-error",
		}
	}
}

/// Editor → bridge message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
	/// Replace the surface document with this text.
	Content(String),
	/// Toggle play/stop.
	Toggle,
	/// Trigger (re-)evaluation.
	Evaluate,
	/// Re-evaluate only if already started.
	Refresh,
	/// Stop playback and end the session.
	Stop,
	/// Close the session and terminate.
	Quit,
	/// Move the cursor to this character offset (clamped by the receiver).
	Cursor(i64),
}

impl Inbound {
	/// Classifies one line.
	///
	/// Returns `Ok(None)` for lines that match no known token; those are
	/// ignored so newer editors can send tokens this bridge predates.
	///
	/// # Errors
	///
	/// Returns [`DecodeError`] when a recognized token carries a malformed
	/// payload.
	pub fn decode(line: &str) -> Result<Option<Self>, DecodeError> {
		let line = line.trim();

		for (control, msg) in &CONTROL_TOKENS {
			if line == *control {
				return Ok(Some(msg.clone()));
			}
		}

		if let Some(payload) = line.strip_prefix(token::CONTENT) {
			return decode_text(token::CONTENT, payload).map(|text| Some(Self::Content(text)));
		}
		if let Some(payload) = line.strip_prefix(token::CURSOR) {
			return payload
				.trim()
				.parse::<i64>()
				.map(|pos| Some(Self::Cursor(pos)))
				.map_err(|_| DecodeError::Cursor(payload.to_string()));
		}

		Ok(None)
	}

	/// Renders this message as one line without the trailing newline.
	#[must_use]
	pub fn encode(&self) -> String {
		match self {
			Self::Content(text) => format!("{}{}", token::CONTENT, STANDARD.encode(text)),
			Self::Toggle => token::TOGGLE.to_string(),
			Self::Evaluate => token::UPDATE.to_string(),
			Self::Refresh => token::REFRESH.to_string(),
			Self::Stop => token::STOP.to_string(),
			Self::Quit => token::QUIT.to_string(),
			Self::Cursor(pos) => format!("{}{pos}", token::CURSOR),
		}
	}

	/// Returns the payload-free kind.
	#[must_use]
	pub const fn kind(&self) -> MessageKind {
		match self {
			Self::Content(_) => MessageKind::Content,
			Self::Toggle => MessageKind::Toggle,
			Self::Evaluate => MessageKind::Evaluate,
			Self::Refresh => MessageKind::Refresh,
			Self::Stop => MessageKind::Stop,
			Self::Quit => MessageKind::Quit,
			Self::Cursor(_) => MessageKind::Cursor,
		}
	}
}

/// Bridge → editor message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
	/// The document changed on the surface.
	Content(String),
	/// The session became active.
	Ready,
	/// The surface's evaluation error message changed.
	EvalError(String),
}

impl Outbound {
	/// Renders this message as one line without the trailing newline.
	#[must_use]
	pub fn encode(&self) -> String {
		match self {
			Self::Content(text) => format!("{}{}", token::CONTENT, STANDARD.encode(text)),
			Self::Ready => token::READY.to_string(),
			Self::EvalError(text) => format!("{}{}", token::EVAL_ERROR, STANDARD.encode(text)),
		}
	}

	/// Parses one line written by the bridge. Used by editor-side clients
	/// and tests.
	///
	/// # Errors
	///
	/// Returns [`DecodeError`] when a recognized token carries a malformed
	/// payload.
	pub fn decode(line: &str) -> Result<Option<Self>, DecodeError> {
		let line = line.trim();
		if line == token::READY {
			return Ok(Some(Self::Ready));
		}
		if let Some(payload) = line.strip_prefix(token::CONTENT) {
			return decode_text(token::CONTENT, payload).map(|text| Some(Self::Content(text)));
		}
		if let Some(payload) = line.strip_prefix(token::EVAL_ERROR) {
			return decode_text(token::EVAL_ERROR, payload).map(|text| Some(Self::EvalError(text)));
		}
		Ok(None)
	}

	/// Returns the payload-free kind.
	#[must_use]
	pub const fn kind(&self) -> MessageKind {
		match self {
			Self::Content(_) => MessageKind::Content,
			Self::Ready => MessageKind::Ready,
			Self::EvalError(_) => MessageKind::EvalError,
		}
	}
}

impl fmt::Display for Inbound {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.encode())
	}
}

impl fmt::Display for Outbound {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.encode())
	}
}

fn decode_text(token: &'static str, payload: &str) -> Result<String, DecodeError> {
	let bytes = STANDARD.decode(payload.trim()).map_err(|e| DecodeError::Base64 {
		token,
		reason: e.to_string(),
	})?;
	String::from_utf8(bytes).map_err(|_| DecodeError::Utf8 { token })
}
