//! In-process surface double for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::diff::Patch;
use crate::error::SurfaceError;
use crate::surface::{Surface, SurfaceEvents};

/// Calls recorded by [`FakeSurface`] that carry no state of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceCall {
	/// `toggle()`.
	Toggle,
	/// `evaluate()`.
	Evaluate,
	/// `refresh()` while started, which re-evaluates.
	Refresh,
	/// `stop()`.
	Stop,
	/// `close()`.
	Close,
}

#[derive(Debug, Default)]
struct FakeState {
	document: String,
	anchor_missing: bool,
	observing: bool,
	started: bool,
	closed: bool,
	styles: Vec<String>,
	patches: Vec<Patch>,
	calls: Vec<SurfaceCall>,
	cursor: Option<usize>,
	eval_error: Option<String>,
	apply_delay: Option<Duration>,
	fail_next_apply: Option<SurfaceError>,
	document_reads: usize,
}

/// Fake REPL: holds a document, applies patches to it, and echoes every
/// mutation back as a change notification once observation is on, like the
/// real page's mutation observer.
pub struct FakeSurface {
	state: Mutex<FakeState>,
	changed: mpsc::UnboundedSender<()>,
	disconnected: CancellationToken,
}

impl FakeSurface {
	/// Creates a ready surface holding `document`.
	#[must_use]
	pub fn new(document: &str) -> (Arc<Self>, SurfaceEvents) {
		let (changed, disconnected, events) = SurfaceEvents::channel();
		let surface = Arc::new(Self {
			state: Mutex::new(FakeState {
				document: document.to_string(),
				..FakeState::default()
			}),
			changed,
			disconnected,
		});
		(surface, events)
	}

	/// Creates a surface whose anchor element never appears.
	#[must_use]
	pub fn never_ready() -> (Arc<Self>, SurfaceEvents) {
		let (surface, events) = Self::new("");
		surface.state.lock().anchor_missing = true;
		(surface, events)
	}

	/// Delays every patch application by `delay`.
	pub fn set_apply_delay(&self, delay: Duration) {
		self.state.lock().apply_delay = Some(delay);
	}

	/// Makes the next patch application fail with `err`.
	pub fn fail_next_apply(&self, err: SurfaceError) {
		self.state.lock().fail_next_apply = Some(err);
	}

	/// Simulates the user typing on the surface.
	pub fn user_edit(&self, document: &str) {
		let observing = {
			let mut state = self.state.lock();
			state.document = document.to_string();
			state.observing
		};
		if observing {
			let _ = self.changed.send(());
		}
	}

	/// Simulates the window closing.
	pub fn disconnect(&self) {
		self.disconnected.cancel();
	}

	/// Sets the evaluation error reported by `eval_error()`.
	pub fn set_eval_error(&self, msg: Option<&str>) {
		self.state.lock().eval_error = msg.map(str::to_string);
	}

	/// Current document.
	#[must_use]
	pub fn current_document(&self) -> String {
		self.state.lock().document.clone()
	}

	/// Applied patches, oldest first.
	#[must_use]
	pub fn patches(&self) -> Vec<Patch> {
		self.state.lock().patches.clone()
	}

	/// Injected stylesheets, in order.
	#[must_use]
	pub fn styles(&self) -> Vec<String> {
		self.state.lock().styles.clone()
	}

	/// Recorded control calls, in order.
	#[must_use]
	pub fn calls(&self) -> Vec<SurfaceCall> {
		self.state.lock().calls.clone()
	}

	/// Last cursor position set.
	#[must_use]
	pub fn cursor(&self) -> Option<usize> {
		self.state.lock().cursor
	}

	/// Whether the change observer was installed.
	#[must_use]
	pub fn is_observing(&self) -> bool {
		self.state.lock().observing
	}

	/// Whether `close()` was called.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}

	/// Number of `document()` reads so far.
	#[must_use]
	pub fn document_reads(&self) -> usize {
		self.state.lock().document_reads
	}

	fn check_open(&self) -> Result<(), SurfaceError> {
		if self.disconnected.is_cancelled() || self.state.lock().closed {
			return Err(SurfaceError::Disconnected);
		}
		Ok(())
	}
}

#[async_trait]
impl Surface for FakeSurface {
	async fn wait_for_anchor(&self) -> Result<(), SurfaceError> {
		if self.state.lock().anchor_missing {
			std::future::pending::<()>().await;
		}
		Ok(())
	}

	async fn add_style(&self, css: &str) -> Result<(), SurfaceError> {
		self.check_open()?;
		self.state.lock().styles.push(css.to_string());
		Ok(())
	}

	async fn observe_changes(&self) -> Result<(), SurfaceError> {
		self.check_open()?;
		self.state.lock().observing = true;
		Ok(())
	}

	async fn document(&self) -> Result<String, SurfaceError> {
		self.check_open()?;
		let mut state = self.state.lock();
		state.document_reads += 1;
		Ok(state.document.clone())
	}

	async fn apply_patch(&self, base: &str, patch: &Patch) -> Result<(), SurfaceError> {
		self.check_open()?;
		let delay = self.state.lock().apply_delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let observing = {
			let mut state = self.state.lock();
			if let Some(err) = state.fail_next_apply.take() {
				return Err(err);
			}
			if state.document != base {
				return Err(SurfaceError::StaleDocument);
			}
			state.document = patch.apply(base);
			state.patches.push(patch.clone());
			state.observing
		};
		if observing {
			let _ = self.changed.send(());
		}
		Ok(())
	}

	async fn set_cursor(&self, offset: usize) -> Result<(), SurfaceError> {
		self.check_open()?;
		self.state.lock().cursor = Some(offset);
		Ok(())
	}

	async fn toggle(&self) -> Result<(), SurfaceError> {
		self.check_open()?;
		let mut state = self.state.lock();
		state.started = !state.started;
		state.calls.push(SurfaceCall::Toggle);
		Ok(())
	}

	async fn evaluate(&self) -> Result<(), SurfaceError> {
		self.check_open()?;
		let mut state = self.state.lock();
		state.started = true;
		state.calls.push(SurfaceCall::Evaluate);
		Ok(())
	}

	async fn refresh(&self) -> Result<(), SurfaceError> {
		self.check_open()?;
		let mut state = self.state.lock();
		if state.started {
			state.calls.push(SurfaceCall::Refresh);
		}
		Ok(())
	}

	async fn stop(&self) -> Result<(), SurfaceError> {
		self.check_open()?;
		let mut state = self.state.lock();
		state.started = false;
		state.calls.push(SurfaceCall::Stop);
		Ok(())
	}

	async fn eval_error(&self) -> Result<Option<String>, SurfaceError> {
		self.check_open()?;
		Ok(self.state.lock().eval_error.clone())
	}

	async fn close(&self) {
		let mut state = self.state.lock();
		state.closed = true;
		state.calls.push(SurfaceCall::Close);
	}
}
