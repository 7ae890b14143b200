//! In-process DevTools peer over a duplex pipe.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::connection::{Connection, Event};

/// Raw browser end of a connection.
pub(crate) struct Peer {
	ws: WebSocketStream<DuplexStream>,
}

/// Connects a [`Connection`] to a fresh [`Peer`].
pub(crate) async fn connect() -> (Connection, mpsc::UnboundedReceiver<Event>, Peer) {
	let (client_io, server_io) = tokio::io::duplex(64 * 1024);
	let (client, server) = tokio::join!(
		tokio_tungstenite::client_async("ws://127.0.0.1/devtools/browser/test", client_io),
		tokio_tungstenite::accept_async(server_io),
	);
	let (client, _) = client.unwrap();
	let (conn, events) = Connection::from_stream(client);
	(conn, events, Peer { ws: server.unwrap() })
}

impl Peer {
	/// Next request frame.
	pub(crate) async fn request(&mut self) -> Value {
		loop {
			match self.ws.next().await {
				Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
				Some(Ok(_)) => {}
				other => panic!("peer stream ended: {other:?}"),
			}
		}
	}

	/// Sends a raw frame.
	pub(crate) async fn send(&mut self, frame: Value) {
		self.ws.send(Message::text(frame.to_string())).await.unwrap();
	}

	/// Closes the socket.
	pub(crate) async fn close(mut self) {
		let _ = self.ws.close(None).await;
	}

	/// Answers every request with `respond` and forwards frames pushed on
	/// the returned sender. Requests are logged to the returned list.
	pub(crate) fn serve<F>(mut self, mut respond: F) -> (mpsc::UnboundedSender<Value>, Arc<Mutex<Vec<Value>>>)
	where
		F: FnMut(&Value) -> Result<Value, String> + Send + 'static,
	{
		let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Value>();
		let log = Arc::new(Mutex::new(Vec::new()));
		let seen = Arc::clone(&log);

		tokio::spawn(async move {
			loop {
				tokio::select! {
					msg = self.ws.next() => {
						let Some(Ok(Message::Text(text))) = msg else { break };
						let req: Value = serde_json::from_str(text.as_str()).unwrap();
						let reply = match respond(&req) {
							Ok(result) => json!({ "id": req["id"], "result": result }),
							Err(message) => json!({ "id": req["id"], "error": { "code": -32000, "message": message } }),
						};
						seen.lock().push(req);
						if self.ws.send(Message::text(reply.to_string())).await.is_err() {
							break;
						}
					}
					frame = push_rx.recv() => match frame {
						Some(frame) => {
							if self.ws.send(Message::text(frame.to_string())).await.is_err() {
								break;
							}
						}
						None => {
							let _ = self.ws.close(None).await;
							break;
						}
					},
				}
			}
		});

		(push_tx, log)
	}
}
