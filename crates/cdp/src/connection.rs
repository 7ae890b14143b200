//! DevTools websocket client.
//!
//! One I/O task owns the socket. Requests reach it over a channel carrying
//! their reply slot; responses are matched back by id, and everything
//! without an id is forwarded as an [`Event`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::error::CdpError;

/// A protocol event pushed by the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
	/// Event method, e.g. `Runtime.bindingCalled`.
	pub method: String,
	/// Event parameters.
	pub params: Value,
	/// Flattened target session the event belongs to.
	pub session_id: Option<String>,
}

struct Request {
	id: u64,
	method: String,
	frame: String,
	reply: oneshot::Sender<Result<Value, CdpError>>,
}

#[derive(Serialize)]
struct OutgoingFrame<'a> {
	id: u64,
	method: &'a str,
	params: Value,
	#[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
	session_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct IncomingFrame {
	id: Option<u64>,
	result: Option<Value>,
	error: Option<RpcError>,
	method: Option<String>,
	#[serde(default)]
	params: Value,
	#[serde(rename = "sessionId")]
	session_id: Option<String>,
}

#[derive(Deserialize)]
struct RpcError {
	code: i64,
	message: String,
}

/// DevTools protocol client.
pub struct Connection {
	requests: mpsc::UnboundedSender<Request>,
	next_id: AtomicU64,
	closed: CancellationToken,
}

impl Connection {
	/// Connects to a browser's DevTools websocket.
	///
	/// # Errors
	///
	/// [`CdpError::WebSocket`] if the handshake fails.
	pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<Event>), CdpError> {
		let (ws, _) = tokio_tungstenite::connect_async(url)
			.await
			.map_err(|e| CdpError::WebSocket(e.to_string()))?;
		tracing::debug!(%url, "devtools connected");
		Ok(Self::from_stream(ws))
	}

	/// Wraps an established websocket and spawns its I/O task.
	pub fn from_stream<S>(ws: WebSocketStream<S>) -> (Self, mpsc::UnboundedReceiver<Event>)
	where
		S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
	{
		let (req_tx, req_rx) = mpsc::unbounded_channel();
		let (event_tx, event_rx) = mpsc::unbounded_channel();
		let closed = CancellationToken::new();
		tokio::spawn(run_io(ws, req_rx, event_tx, closed.clone()));

		let conn = Self {
			requests: req_tx,
			next_id: AtomicU64::new(1),
			closed,
		};
		(conn, event_rx)
	}

	/// Sends `method` and waits for its result.
	///
	/// `session_id` routes the call to an attached target.
	///
	/// # Errors
	///
	/// [`CdpError::Protocol`] if the browser rejects the call,
	/// [`CdpError::Disconnected`] if the connection closes first.
	pub async fn call(&self, method: &str, params: Value, session_id: Option<&str>) -> Result<Value, CdpError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let frame = serde_json::to_string(&OutgoingFrame {
			id,
			method,
			params,
			session_id,
		})?;

		let (reply, rx) = oneshot::channel();
		self.requests
			.send(Request {
				id,
				method: method.to_string(),
				frame,
				reply,
			})
			.map_err(|_| CdpError::Disconnected)?;
		rx.await.map_err(|_| CdpError::Disconnected)?
	}

	/// Token cancelled once the socket is closed.
	#[must_use]
	pub fn closed(&self) -> &CancellationToken {
		&self.closed
	}

	/// Returns true once the socket is closed.
	#[must_use]
	pub fn is_closed(&self) -> bool {
		self.closed.is_cancelled()
	}
}

type Pending = HashMap<u64, (String, oneshot::Sender<Result<Value, CdpError>>)>;

async fn run_io<S>(
	ws: WebSocketStream<S>,
	mut requests: mpsc::UnboundedReceiver<Request>,
	events: mpsc::UnboundedSender<Event>,
	closed: CancellationToken,
) where
	S: AsyncRead + AsyncWrite + Unpin,
{
	let (mut sink, mut stream) = ws.split();
	let mut pending = Pending::new();

	loop {
		tokio::select! {
			req = requests.recv() => {
				let Some(req) = req else {
					let _ = sink.close().await;
					break;
				};
				tracing::trace!(id = req.id, method = %req.method, "devtools request");
				if let Err(e) = sink.send(Message::text(req.frame)).await {
					tracing::debug!(error = %e, "devtools send failed");
					let _ = req.reply.send(Err(CdpError::Disconnected));
					break;
				}
				pending.insert(req.id, (req.method, req.reply));
			}
			msg = stream.next() => match msg {
				Some(Ok(Message::Text(text))) => dispatch_incoming(text.as_str(), &mut pending, &events),
				Some(Ok(Message::Close(_))) | None => break,
				Some(Ok(_)) => {}
				Some(Err(e)) => {
					tracing::debug!(error = %e, "devtools socket failed");
					break;
				}
			},
		}
	}

	closed.cancel();
	for (_, (_, reply)) in pending.drain() {
		let _ = reply.send(Err(CdpError::Disconnected));
	}
	tracing::debug!("devtools connection closed");
}

fn dispatch_incoming(text: &str, pending: &mut Pending, events: &mpsc::UnboundedSender<Event>) {
	let frame: IncomingFrame = match serde_json::from_str(text) {
		Ok(frame) => frame,
		Err(e) => {
			tracing::warn!(error = %e, "undecodable devtools frame");
			return;
		}
	};

	if let Some(id) = frame.id {
		let Some((method, reply)) = pending.remove(&id) else {
			tracing::trace!(id, "response for unknown request");
			return;
		};
		let result = match frame.error {
			Some(err) => Err(CdpError::Protocol {
				method,
				code: err.code,
				message: err.message,
			}),
			None => Ok(frame.result.unwrap_or(Value::Null)),
		};
		let _ = reply.send(result);
		return;
	}

	if let Some(method) = frame.method {
		let _ = events.send(Event {
			method,
			params: frame.params,
			session_id: frame.session_id,
		});
	}
}
