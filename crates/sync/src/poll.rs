//! Evaluation error polling.
//!
//! Runs beside the dispatcher. It only reads surface state and writes to the
//! outbox, so it never touches the synced document.

use std::sync::Arc;
use std::time::Duration;

use strudel_proto::Outbound;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::outbox::Outbox;
use crate::surface::Surface;

/// Change detector for the surface's evaluation error.
#[derive(Debug, Default)]
pub struct EvalErrorTracker {
	last: Option<String>,
}

impl EvalErrorTracker {
	/// Records `current` and returns the message to report, if any.
	///
	/// Only changes are reported, and a cleared error is remembered but
	/// not reported.
	pub fn observe(&mut self, current: Option<String>) -> Option<String> {
		if current == self.last {
			return None;
		}
		self.last.clone_from(&current);
		current.filter(|msg| !msg.is_empty())
	}
}

/// Polls `surface` every `period` until `cancel` fires.
///
/// Polls never overlap: the next tick waits for the previous read, and
/// ticks missed meanwhile are skipped.
pub async fn poll_eval_errors<S>(surface: Arc<S>, outbox: Outbox, period: Duration, cancel: CancellationToken)
where
	S: Surface + ?Sized,
{
	let mut ticker = tokio::time::interval(period);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
	let mut tracker = EvalErrorTracker::default();

	loop {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => break,
			_ = ticker.tick() => {}
		}

		let current = tokio::select! {
			biased;
			_ = cancel.cancelled() => break,
			res = surface.eval_error() => match res {
				Ok(current) => current,
				Err(e) => {
					tracing::trace!(error = %e, "eval error poll failed");
					continue;
				}
			},
		};

		if let Some(msg) = tracker.observe(current) {
			tracing::debug!(%msg, "evaluation error changed");
			outbox.send(Outbound::EvalError(msg));
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::test_helpers::FakeSurface;

	#[test]
	fn tracker_reports_changes_only() {
		let mut tracker = EvalErrorTracker::default();
		assert_eq!(tracker.observe(None), None);
		assert_eq!(tracker.observe(Some("a".into())), Some("a".into()));
		assert_eq!(tracker.observe(Some("a".into())), None);
		assert_eq!(tracker.observe(Some("b".into())), Some("b".into()));
		assert_eq!(tracker.observe(None), None);
		assert_eq!(tracker.observe(Some("b".into())), Some("b".into()));
		assert_eq!(tracker.observe(Some(String::new())), None);
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn poller_reports_each_new_error_once() {
		let (surface, _events) = FakeSurface::new("");
		let (outbox, mut rx) = Outbox::channel();
		let cancel = CancellationToken::new();
		let task = tokio::spawn(poll_eval_errors(
			Arc::clone(&surface),
			outbox,
			Duration::from_millis(300),
			cancel.clone(),
		));

		surface.set_eval_error(Some("x is not defined"));
		tokio::time::sleep(Duration::from_millis(1000)).await;
		surface.set_eval_error(None);
		tokio::time::sleep(Duration::from_millis(1000)).await;
		cancel.cancel();
		task.await.unwrap();

		assert_eq!(rx.recv().await, Some(Outbound::EvalError("x is not defined".into())));
		assert_eq!(rx.recv().await, None);
	}
}
