//! Outbound message path to the editor.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::SinkExt;
use strudel_proto::{MessageCodec, Outbound};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;

/// Cloneable sender for bridge → editor messages.
///
/// Once closed, every further send is dropped so nothing reaches the editor
/// after the session ends.
#[derive(Debug, Clone)]
pub struct Outbox {
	tx: mpsc::UnboundedSender<Outbound>,
	closed: Arc<AtomicBool>,
}

impl Outbox {
	/// Creates an outbox and the receiver consumed by [`write_outbound`].
	#[must_use]
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let outbox = Self {
			tx,
			closed: Arc::new(AtomicBool::new(false)),
		};
		(outbox, rx)
	}

	/// Queues `msg`. Returns false if the outbox is closed or the writer is gone.
	pub fn send(&self, msg: Outbound) -> bool {
		if self.closed.load(Ordering::Acquire) {
			tracing::trace!(kind = msg.kind().name(), "outbox closed, dropping message");
			return false;
		}
		self.tx.send(msg).is_ok()
	}

	/// Closes the outbox for every clone.
	pub fn close(&self) {
		self.closed.store(true, Ordering::Release);
	}

	/// Returns true once [`Outbox::close`] was called.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}
}

/// Writes queued messages to `writer`, one flushed line each, until every
/// [`Outbox`] clone is dropped.
///
/// # Errors
///
/// Returns the first write error; the editor end is gone at that point.
pub async fn write_outbound<W>(mut rx: mpsc::UnboundedReceiver<Outbound>, writer: W) -> io::Result<()>
where
	W: AsyncWrite + Unpin,
{
	let mut sink = FramedWrite::new(writer, MessageCodec::new());
	while let Some(msg) = rx.recv().await {
		tracing::trace!(kind = msg.kind().name(), "writing outbound message");
		sink.send(msg).await?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(flavor = "current_thread")]
	async fn closed_outbox_drops_messages() {
		let (outbox, mut rx) = Outbox::channel();
		assert!(outbox.send(Outbound::Ready));
		outbox.clone().close();
		assert!(outbox.is_closed());
		assert!(!outbox.send(Outbound::Content("late".into())));
		drop(outbox);

		assert_eq!(rx.recv().await, Some(Outbound::Ready));
		assert_eq!(rx.recv().await, None);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn writer_emits_one_line_per_message_and_ends_with_senders() {
		let (outbox, rx) = Outbox::channel();
		outbox.send(Outbound::Ready);
		outbox.send(Outbound::EvalError("boom".into()));
		drop(outbox);

		let mut buf = Vec::new();
		write_outbound(rx, &mut buf).await.unwrap();
		assert_eq!(String::from_utf8(buf).unwrap(), "STRUDEL_READY\nSTRUDEL_EVAL_ERROR:Ym9vbQ==\n");
	}
}
