//! Error types for surface calls and session startup.

use std::time::Duration;

use thiserror::Error;

/// A command could not be delivered to the surface.
///
/// Recovered per command: the dispatcher logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
	/// The surface connection is gone.
	#[error("surface disconnected")]
	Disconnected,

	/// The editor element or REPL handle is not present.
	#[error("editor not available on the surface")]
	MissingEditor,

	/// The surface document changed between reading it and patching it.
	#[error("surface document changed before the patch was applied")]
	StaleDocument,

	/// A script on the surface threw.
	#[error("surface evaluation failed: {0}")]
	Evaluate(String),

	/// Transport or protocol failure talking to the surface.
	#[error("surface transport error: {0}")]
	Transport(String),
}

/// Fatal session failures.
#[derive(Debug, Error)]
pub enum SessionError {
	/// The anchor element never appeared.
	#[error("surface did not become ready within {0:?}")]
	StartupTimeout(Duration),

	/// The surface failed during startup.
	#[error("surface failed during startup: {0}")]
	Surface(#[from] SurfaceError),
}
