//! Synchronization session.
//!
//! A [`Session`] owns everything that describes the shared document: the
//! echo slot, the last known snapshot and the lifecycle state. It is the
//! [`CommandHandler`] behind the dispatcher, so every mutation happens on the
//! single drain loop started by [`Session::run`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strudel_proto::{Fingerprint, Inbound, Outbound};
use tokio_util::sync::CancellationToken;

use crate::diff::compute_patch;
use crate::dispatch::{Command, CommandHandler, Flow};
use crate::echo::{Direction, EchoCache};
use crate::error::{SessionError, SurfaceError};
use crate::outbox::Outbox;
use crate::style::StyleConfig;
use crate::surface::Surface;

mod run;

/// Default bound on waiting for the surface's anchor element.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default eval-error poll period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	/// Surface starting; editor input is buffered, not processed.
	Launching,
	/// Anchor observed; styles and observer are being installed.
	Ready,
	/// Normal bidirectional sync.
	Active,
	/// Terminal.
	Closed,
}

/// Why a session ended cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
	/// The editor sent `STRUDEL_QUIT`, or shutdown was requested.
	Quit,
	/// The editor sent `STRUDEL_STOP`; playback was stopped first.
	Stop,
	/// The editor closed its input stream.
	EditorClosed,
	/// The surface went away.
	Disconnected,
}

/// Session tunables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Bound on [`Surface::wait_for_anchor`].
	pub startup_timeout: Duration,
	/// Eval-error poll period.
	pub poll_interval: Duration,
	/// Headless surfaces get no content observer.
	pub headless: bool,
	/// Stylesheets injected once ready.
	pub styles: StyleConfig,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			startup_timeout: DEFAULT_STARTUP_TIMEOUT,
			poll_interval: DEFAULT_POLL_INTERVAL,
			headless: false,
			styles: StyleConfig::default(),
		}
	}
}

/// One editor ↔ surface synchronization session.
pub struct Session<S: Surface> {
	surface: Arc<S>,
	outbox: Outbox,
	config: SessionConfig,
	echo: EchoCache,
	snapshot: String,
	state: SessionState,
	close_reason: Option<CloseReason>,
	shutdown: CancellationToken,
}

impl<S: Surface> Session<S> {
	/// Creates a session in [`SessionState::Launching`].
	pub fn new(surface: Arc<S>, outbox: Outbox, config: SessionConfig) -> Self {
		Self {
			surface,
			outbox,
			config,
			echo: EchoCache::new(),
			snapshot: String::new(),
			state: SessionState::Launching,
			close_reason: None,
			shutdown: CancellationToken::new(),
		}
	}

	/// Current lifecycle state.
	#[must_use]
	pub fn state(&self) -> SessionState {
		self.state
	}

	/// Last known document: the last applied inbound or emitted outbound one.
	#[must_use]
	pub fn snapshot(&self) -> &str {
		&self.snapshot
	}

	/// Fingerprint of the last synced document.
	#[must_use]
	pub fn last_synced(&self) -> Option<&Fingerprint> {
		self.echo.last_synced()
	}

	/// Token that closes a running session as [`CloseReason::Quit`] when
	/// cancelled.
	#[must_use]
	pub fn shutdown_token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	fn transition(&mut self, next: SessionState) {
		if self.state != next {
			tracing::debug!(from = ?self.state, to = ?next, "session state");
			self.state = next;
		}
	}

	/// Waits for the surface, prepares it and announces readiness.
	///
	/// # Errors
	///
	/// [`SessionError::StartupTimeout`] if the anchor does not appear in
	/// time, or [`SessionError::Surface`] if waiting for it fails.
	pub async fn start(&mut self) -> Result<(), SessionError> {
		let timeout = self.config.startup_timeout;
		tokio::time::timeout(timeout, self.surface.wait_for_anchor())
			.await
			.map_err(|_| SessionError::StartupTimeout(timeout))??;
		self.transition(SessionState::Ready);

		for css in self.config.styles.stylesheets() {
			if let Err(e) = self.surface.add_style(css).await {
				tracing::warn!(error = %e, "failed to inject stylesheet");
			}
		}

		if self.config.headless {
			tracing::debug!("headless surface, content observer not installed");
		} else if let Err(e) = self.surface.observe_changes().await {
			tracing::warn!(error = %e, "failed to install content observer");
		}

		self.outbox.send(Outbound::Ready);
		self.transition(SessionState::Active);
		tracing::info!("session active");
		Ok(())
	}

	async fn apply_content(&mut self, text: String) -> Result<(), SurfaceError> {
		let fingerprint = Fingerprint::of(&text);
		if !self.echo.should_apply(Direction::Inbound, &fingerprint) {
			return Ok(());
		}

		let mut base = self.surface.document().await?;
		let mut retried = false;
		while let Some(patch) = compute_patch(&base, &text) {
			match self.surface.apply_patch(&base, &patch).await {
				Ok(()) => {
					tracing::debug!(
						from = patch.from,
						to = patch.to,
						inserted = patch.insert.chars().count(),
						"applied editor content"
					);
					break;
				}
				Err(SurfaceError::StaleDocument) if !retried => {
					tracing::debug!("surface document moved, rediffing");
					retried = true;
					base = self.surface.document().await?;
				}
				Err(e) => return Err(e),
			}
		}

		self.snapshot = text;
		Ok(())
	}

	async fn publish_surface_document(&mut self) -> Result<(), SurfaceError> {
		let document = self.surface.document().await?;
		let fingerprint = Fingerprint::of(&document);
		if !self.echo.should_apply(Direction::Outbound, &fingerprint) {
			return Ok(());
		}
		self.outbox.send(Outbound::Content(document.clone()));
		self.snapshot = document;
		Ok(())
	}

	async fn move_cursor(&mut self, position: i64) -> Result<(), SurfaceError> {
		let document = self.surface.document().await?;
		let offset = clamp_cursor(position, document.chars().count());
		self.surface.set_cursor(offset).await
	}

	fn stop_with(&mut self, reason: CloseReason) -> Flow {
		self.close_reason = Some(reason);
		Flow::Stop
	}
}

#[async_trait]
impl<S: Surface> CommandHandler for Session<S> {
	async fn handle(&mut self, cmd: Command) -> Result<Flow, SurfaceError> {
		match cmd {
			Command::Editor(Inbound::Content(text)) => self.apply_content(text).await?,
			Command::Editor(Inbound::Toggle) => self.surface.toggle().await?,
			Command::Editor(Inbound::Evaluate) => self.surface.evaluate().await?,
			Command::Editor(Inbound::Refresh) => self.surface.refresh().await?,
			Command::Editor(Inbound::Stop) => {
				if let Err(e) = self.surface.stop().await {
					tracing::warn!(error = %e, "failed to stop playback before closing");
				}
				return Ok(self.stop_with(CloseReason::Stop));
			}
			Command::Editor(Inbound::Cursor(position)) => self.move_cursor(position).await?,
			Command::Editor(Inbound::Quit) => return Ok(self.stop_with(CloseReason::Quit)),
			Command::EditorClosed => return Ok(self.stop_with(CloseReason::EditorClosed)),
			Command::SurfaceChanged => self.publish_surface_document().await?,
		}
		Ok(Flow::Continue)
	}
}

/// Clamps an editor cursor position to `[0, len]`.
#[must_use]
pub fn clamp_cursor(position: i64, len: usize) -> usize {
	usize::try_from(position).map_or(0, |p| p.min(len))
}

#[cfg(test)]
mod tests;
