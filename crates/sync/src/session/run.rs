use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{CloseReason, Session, SessionState};
use crate::dispatch::{Command, Dispatcher, Flow};
use crate::error::SessionError;
use crate::ingress::pump_editor_input;
use crate::poll::poll_eval_errors;
use crate::surface::{Surface, SurfaceEvents};

impl<S: Surface> Session<S> {
	/// Runs the session to completion.
	///
	/// Editor lines are read from `input` from the start, so anything sent
	/// while the surface is launching is buffered and handled in order once
	/// the session is active. Surface notifications arrive on `events`.
	///
	/// # Errors
	///
	/// Only startup failures are errors. Quit, end of editor input and
	/// surface disconnects close the session cleanly.
	pub async fn run<R>(mut self, events: SurfaceEvents, input: R) -> Result<CloseReason, SessionError>
	where
		R: AsyncRead + Unpin + Send + 'static,
	{
		let SurfaceEvents {
			mut changed,
			disconnected,
		} = events;
		let shutdown = self.shutdown.clone();

		let (editor_tx, mut editor_rx) = mpsc::unbounded_channel();
		let pump = tokio::spawn(pump_editor_input(input, editor_tx));

		let started = tokio::select! {
			biased;
			_ = disconnected.cancelled() => Ok(Some(CloseReason::Disconnected)),
			_ = shutdown.cancelled() => Ok(Some(CloseReason::Quit)),
			res = self.start() => res.map(|()| None),
		};

		let poll_cancel = CancellationToken::new();
		match started {
			Ok(None) => {}
			Ok(Some(reason)) => {
				tracing::info!(?reason, "session closed before becoming active");
				self.close(&pump, None, &poll_cancel).await;
				return Ok(reason);
			}
			Err(e) => {
				tracing::error!(error = %e, "session failed to start");
				self.close(&pump, None, &poll_cancel).await;
				return Err(e);
			}
		}

		let poller = tokio::spawn(poll_eval_errors(
			Arc::clone(&self.surface),
			self.outbox.clone(),
			self.config.poll_interval,
			poll_cancel.child_token(),
		));

		let mut dispatcher = Dispatcher::new();
		let reason = loop {
			let cmd = tokio::select! {
				biased;
				_ = disconnected.cancelled() => break CloseReason::Disconnected,
				_ = shutdown.cancelled() => break CloseReason::Quit,
				Some(()) = changed.recv() => Command::SurfaceChanged,
				Some(cmd) = editor_rx.recv() => cmd,
			};

			let flow = tokio::select! {
				biased;
				_ = disconnected.cancelled() => break CloseReason::Disconnected,
				_ = shutdown.cancelled() => break CloseReason::Quit,
				flow = dispatcher.enqueue(cmd, &mut self) => flow,
			};
			if flow == Flow::Stop {
				break self.close_reason.unwrap_or(CloseReason::Quit);
			}
		};

		if dispatcher.is_draining() || !dispatcher.is_empty() {
			tracing::debug!(queued = dispatcher.len(), "abandoning in-flight commands");
		}
		tracing::info!(?reason, "session closing");
		self.close(&pump, Some(poller), &poll_cancel).await;
		Ok(reason)
	}

	async fn close(&mut self, pump: &JoinHandle<()>, poller: Option<JoinHandle<()>>, poll_cancel: &CancellationToken) {
		self.transition(SessionState::Closed);
		self.outbox.close();
		pump.abort();
		poll_cancel.cancel();
		if let Some(poller) = poller {
			let _ = poller.await;
		}
		self.surface.close().await;
	}
}
