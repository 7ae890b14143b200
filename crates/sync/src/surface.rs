//! Interface to the live-coding surface.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::diff::Patch;
use crate::error::SurfaceError;

/// The execution surface the session keeps in sync.
///
/// Offsets are character (Unicode scalar) offsets into the surface document;
/// implementations convert to whatever unit their editor uses.
#[async_trait]
pub trait Surface: Send + Sync + 'static {
	/// Resolves once the anchor element is present and the REPL is
	/// interactive. May wait indefinitely; the session bounds it.
	async fn wait_for_anchor(&self) -> Result<(), SurfaceError>;

	/// Injects a stylesheet.
	async fn add_style(&self, css: &str) -> Result<(), SurfaceError>;

	/// Starts reporting document mutations on [`SurfaceEvents::changed`].
	async fn observe_changes(&self) -> Result<(), SurfaceError>;

	/// Reads the current document.
	async fn document(&self) -> Result<String, SurfaceError>;

	/// Replaces `patch.from..patch.to` of `base` in place, leaving everything
	/// outside the range untouched, then simulates a user interaction.
	///
	/// Fails with [`SurfaceError::StaleDocument`] if the surface no longer
	/// holds `base`.
	async fn apply_patch(&self, base: &str, patch: &Patch) -> Result<(), SurfaceError>;

	/// Moves the cursor to an already clamped offset.
	async fn set_cursor(&self, offset: usize) -> Result<(), SurfaceError>;

	/// Toggles play/stop.
	async fn toggle(&self) -> Result<(), SurfaceError>;

	/// Evaluates the current document.
	async fn evaluate(&self) -> Result<(), SurfaceError>;

	/// Re-evaluates if playback has started.
	async fn refresh(&self) -> Result<(), SurfaceError>;

	/// Stops playback.
	async fn stop(&self) -> Result<(), SurfaceError>;

	/// Reads the current evaluation error message, if any.
	async fn eval_error(&self) -> Result<Option<String>, SurfaceError>;

	/// Tears the surface down. Best effort.
	async fn close(&self);
}

/// Notifications a surface pushes to the session.
pub struct SurfaceEvents {
	/// One unit per observed mutation batch.
	pub changed: mpsc::UnboundedReceiver<()>,
	/// Cancelled when the surface disconnects or its window closes.
	pub disconnected: CancellationToken,
}

impl SurfaceEvents {
	/// Creates the event pair and the sending half kept by the surface.
	#[must_use]
	pub fn channel() -> (mpsc::UnboundedSender<()>, CancellationToken, Self) {
		let (tx, rx) = mpsc::unbounded_channel();
		let disconnected = CancellationToken::new();
		let events = Self {
			changed: rx,
			disconnected: disconnected.clone(),
		};
		(tx, disconnected, events)
	}
}
