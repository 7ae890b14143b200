//! Sequential command dispatch.
//!
//! Commands are processed strictly in arrival order: a command starts only
//! after the previous one, including every surface round trip it awaits, has
//! fully completed. Patch computation relies on this, since a diff computed
//! while another patch is mid-flight would be taken against a document that
//! no longer exists.

use std::collections::VecDeque;

use async_trait::async_trait;
use strudel_proto::Inbound;

use crate::error::SurfaceError;

/// Unit of work for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	/// A message from the editor.
	Editor(Inbound),
	/// The surface reported a document mutation.
	SurfaceChanged,
	/// The editor closed its end of the stream.
	EditorClosed,
}

impl Command {
	/// Short name for log fields.
	#[must_use]
	pub const fn name(&self) -> &'static str {
		match self {
			Self::Editor(msg) => msg.kind().name(),
			Self::SurfaceChanged => "surface-changed",
			Self::EditorClosed => "editor-closed",
		}
	}
}

impl From<Inbound> for Command {
	fn from(msg: Inbound) -> Self {
		Self::Editor(msg)
	}
}

/// Continuation directive from one handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	/// Keep processing.
	Continue,
	/// Stop; remaining queued commands are discarded.
	Stop,
}

/// Processes one command at a time.
#[async_trait]
pub trait CommandHandler: Send {
	/// Handles `cmd` to completion.
	///
	/// Errors are logged by the dispatcher and never stop the drain.
	async fn handle(&mut self, cmd: Command) -> Result<Flow, SurfaceError>;
}

/// FIFO command queue with an explicit draining flag.
#[derive(Debug, Default)]
pub struct Dispatcher {
	queue: VecDeque<Command>,
	draining: bool,
}

impl Dispatcher {
	/// Creates an idle dispatcher.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends without draining.
	pub fn push(&mut self, cmd: Command) {
		self.queue.push_back(cmd);
	}

	/// Appends and, unless a drain is already running, drains the queue.
	pub async fn enqueue<H>(&mut self, cmd: Command, handler: &mut H) -> Flow
	where
		H: CommandHandler + ?Sized,
	{
		self.push(cmd);
		if self.draining {
			return Flow::Continue;
		}
		self.drain(handler).await
	}

	/// Processes queued commands until the queue is empty or a handler stops.
	///
	/// If the returned future is dropped mid-command, the command is abandoned
	/// and the flag stays set until the next explicit drain.
	pub async fn drain<H>(&mut self, handler: &mut H) -> Flow
	where
		H: CommandHandler + ?Sized,
	{
		self.draining = true;

		while let Some(cmd) = self.queue.pop_front() {
			let name = cmd.name();
			match handler.handle(cmd).await {
				Ok(Flow::Continue) => {}
				Ok(Flow::Stop) => {
					let discarded = self.queue.len();
					self.queue.clear();
					self.draining = false;
					tracing::debug!(command = name, discarded, "dispatcher stopped");
					return Flow::Stop;
				}
				Err(e) => {
					tracing::warn!(command = name, error = %e, "command failed");
				}
			}
		}

		self.draining = false;
		Flow::Continue
	}

	/// Number of queued commands.
	#[must_use]
	pub fn len(&self) -> usize {
		self.queue.len()
	}

	/// Returns true if nothing is queued.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.queue.is_empty()
	}

	/// Returns true while a drain is in progress.
	#[must_use]
	pub fn is_draining(&self) -> bool {
		self.draining
	}
}
