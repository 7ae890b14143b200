//! Error types for browser launch and DevTools traffic.

use std::path::PathBuf;
use std::time::Duration;

use strudel_sync::SurfaceError;
use thiserror::Error;

/// Errors raised while launching or talking to the browser.
#[derive(Debug, Error)]
pub enum CdpError {
	/// No usable browser executable was found.
	#[error("no Chromium-family browser found (tried {tried})")]
	BrowserNotFound {
		/// Candidates that were tried, comma separated.
		tried: String,
	},

	/// The configured browser path does not exist or is not executable.
	#[error("browser executable not usable: {}", path.display())]
	BrowserUnusable {
		/// Configured path.
		path: PathBuf,
	},

	/// The browser process could not be started.
	#[error("failed to start browser: {0}")]
	Spawn(#[source] std::io::Error),

	/// The browser never announced its DevTools endpoint.
	#[error("browser did not announce a DevTools endpoint within {0:?}")]
	DevToolsTimeout(Duration),

	/// The browser exited before announcing its DevTools endpoint.
	#[error("browser exited before announcing a DevTools endpoint")]
	BrowserExited,

	/// Websocket handshake or transport failure.
	#[error("devtools websocket error: {0}")]
	WebSocket(String),

	/// The browser answered a request with an error.
	#[error("devtools error {code} on {method}: {message}")]
	Protocol {
		/// Request method.
		method: String,
		/// Protocol error code.
		code: i64,
		/// Protocol error message.
		message: String,
	},

	/// A response did not have the expected shape.
	#[error("unexpected devtools response: {0}")]
	UnexpectedResponse(String),

	/// JSON encoding or decoding failed.
	#[error("devtools json error: {0}")]
	Json(#[from] serde_json::Error),

	/// No page target appeared.
	#[error("no page target found")]
	NoPage,

	/// A page script threw.
	#[error("page script threw: {0}")]
	Exception(String),

	/// The REPL editor handle is not available on the page.
	#[error("strudel editor not available on the page")]
	MissingEditor,

	/// The page document changed before a patch could be applied.
	#[error("page document changed before the patch was applied")]
	StaleDocument,

	/// The connection is closed.
	#[error("devtools connection closed")]
	Disconnected,
}

impl From<CdpError> for SurfaceError {
	fn from(err: CdpError) -> Self {
		match err {
			CdpError::Disconnected => Self::Disconnected,
			CdpError::MissingEditor => Self::MissingEditor,
			CdpError::StaleDocument => Self::StaleDocument,
			CdpError::Exception(msg) => Self::Evaluate(msg),
			other => Self::Transport(other.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn surface_relevant_errors_keep_their_meaning() {
		assert_eq!(SurfaceError::from(CdpError::Disconnected), SurfaceError::Disconnected);
		assert_eq!(SurfaceError::from(CdpError::StaleDocument), SurfaceError::StaleDocument);
		assert_eq!(
			SurfaceError::from(CdpError::Exception("boom".into())),
			SurfaceError::Evaluate("boom".into())
		);
		assert!(matches!(
			SurfaceError::from(CdpError::NoPage),
			SurfaceError::Transport(msg) if msg == "no page target found"
		));
	}
}
