//! Editor input pump.

use futures::StreamExt;
use strudel_proto::{Frame, MessageCodec};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;

use crate::dispatch::Command;

/// Reads editor lines from `reader` and forwards decoded commands.
///
/// Unknown lines are ignored and malformed ones are logged and dropped. End
/// of input, or a read error, is forwarded as [`Command::EditorClosed`].
/// Returns early if the receiving side is gone.
pub async fn pump_editor_input<R>(reader: R, tx: mpsc::UnboundedSender<Command>)
where
	R: AsyncRead + Unpin,
{
	let mut frames = FramedRead::new(reader, MessageCodec::new());

	while let Some(frame) = frames.next().await {
		let cmd = match frame {
			Ok(Frame::Message(msg)) => Command::Editor(msg),
			Ok(Frame::Ignored(line)) => {
				tracing::trace!(%line, "ignoring unrecognized editor line");
				continue;
			}
			Ok(Frame::Malformed(e)) => {
				tracing::warn!(error = %e, "dropping malformed editor message");
				continue;
			}
			Ok(Frame::Oversized) => {
				tracing::warn!("dropping oversized editor message");
				continue;
			}
			Err(e) => {
				tracing::warn!(error = %e, "editor input failed");
				break;
			}
		};
		if tx.send(cmd).is_err() {
			return;
		}
	}

	tracing::debug!("editor input closed");
	let _ = tx.send(Command::EditorClosed);
}
