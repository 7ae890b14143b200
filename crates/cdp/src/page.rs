//! The Strudel REPL page as a sync surface.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use strudel_sync::diff::utf16_offset;
use strudel_sync::{Patch, Surface, SurfaceError, SurfaceEvents};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connection::{Connection, Event};
use crate::error::CdpError;
use crate::launcher::Browser;
use crate::script;

const ANCHOR_POLL: Duration = Duration::from_millis(100);
const TARGET_POLL: Duration = Duration::from_millis(100);
const TARGET_ATTEMPTS: usize = 100;
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// The REPL page, attached through a flattened DevTools session.
pub struct StrudelPage {
	conn: Connection,
	target_id: String,
	session_id: String,
	browser: Option<Browser>,
	router: JoinHandle<()>,
}

impl StrudelPage {
	/// Attaches to the first page target of `conn`.
	///
	/// `browser` is shut down with the page when given.
	///
	/// # Errors
	///
	/// [`CdpError::NoPage`] if no page target shows up, or any protocol error
	/// raised while attaching.
	pub async fn attach(
		conn: Connection,
		events: mpsc::UnboundedReceiver<Event>,
		browser: Option<Browser>,
	) -> Result<(Self, SurfaceEvents), CdpError> {
		conn.call("Target.setDiscoverTargets", json!({ "discover": true }), None)
			.await?;
		let target_id = find_page_target(&conn).await?;

		let attached = conn
			.call(
				"Target.attachToTarget",
				json!({ "targetId": target_id, "flatten": true }),
				None,
			)
			.await?;
		let session_id = attached["sessionId"]
			.as_str()
			.ok_or_else(|| CdpError::UnexpectedResponse(format!("attachToTarget: {attached}")))?
			.to_string();
		conn.call("Runtime.enable", json!({}), Some(session_id.as_str())).await?;
		tracing::debug!(%target_id, %session_id, "attached to page");

		let (changed, disconnected, surface_events) = SurfaceEvents::channel();
		let router = tokio::spawn(route_events(
			events,
			target_id.clone(),
			session_id.clone(),
			changed,
			disconnected,
		));

		let page = Self {
			conn,
			target_id,
			session_id,
			browser,
			router,
		};
		Ok((page, surface_events))
	}

	/// Target id of the attached page.
	#[must_use]
	pub fn target_id(&self) -> &str {
		&self.target_id
	}

	async fn call_function(&self, function: &str, arg: &Value) -> Result<Value, CdpError> {
		let reply = self
			.conn
			.call(
				"Runtime.evaluate",
				json!({
					"expression": format!("({function})({arg})"),
					"awaitPromise": true,
					"returnByValue": true,
				}),
				Some(self.session_id.as_str()),
			)
			.await?;

		if let Some(details) = reply.get("exceptionDetails") {
			let msg = details["exception"]["description"]
				.as_str()
				.or_else(|| details["text"].as_str())
				.unwrap_or("unknown exception");
			return Err(CdpError::Exception(msg.to_string()));
		}
		Ok(reply["result"]["value"].clone())
	}

	async fn run_script(&self, function: &str, arg: &Value) -> Result<(), CdpError> {
		match self.call_function(function, arg).await?.as_str() {
			Some("ok") => Ok(()),
			Some("missing") => Err(CdpError::MissingEditor),
			Some("stale") => Err(CdpError::StaleDocument),
			_ => Err(CdpError::UnexpectedResponse("page script returned no status".into())),
		}
	}

	async fn read_document(&self) -> Result<String, CdpError> {
		match self.call_function(script::DOCUMENT, &Value::Null).await? {
			Value::String(doc) => Ok(doc),
			Value::Null => Err(CdpError::MissingEditor),
			other => Err(CdpError::UnexpectedResponse(format!("document: {other}"))),
		}
	}
}

impl Drop for StrudelPage {
	fn drop(&mut self) {
		self.router.abort();
	}
}

#[async_trait]
impl Surface for StrudelPage {
	async fn wait_for_anchor(&self) -> Result<(), SurfaceError> {
		let selector = json!(script::ANCHOR_SELECTOR);
		loop {
			match self.call_function(script::ANCHOR_READY, &selector).await {
				Ok(Value::Bool(true)) => return Ok(()),
				Ok(_) => {}
				Err(CdpError::Disconnected) => return Err(SurfaceError::Disconnected),
				// Navigation replaces the execution context while the page loads.
				Err(e) => tracing::trace!(error = %e, "anchor probe failed"),
			}
			tokio::time::sleep(ANCHOR_POLL).await;
		}
	}

	async fn add_style(&self, css: &str) -> Result<(), SurfaceError> {
		Ok(self.run_script(script::ADD_STYLE, &json!(css)).await?)
	}

	async fn observe_changes(&self) -> Result<(), SurfaceError> {
		self.conn
			.call(
				"Runtime.addBinding",
				json!({ "name": script::CHANGE_BINDING }),
				Some(self.session_id.as_str()),
			)
			.await?;
		let arg = json!({ "selector": script::ANCHOR_SELECTOR, "binding": script::CHANGE_BINDING });
		Ok(self.run_script(script::OBSERVE_CHANGES, &arg).await?)
	}

	async fn document(&self) -> Result<String, SurfaceError> {
		Ok(self.read_document().await?)
	}

	async fn apply_patch(&self, base: &str, patch: &Patch) -> Result<(), SurfaceError> {
		let range = patch.to_utf16(base);
		let expected: String = base.chars().skip(patch.from).take(patch.replaced_len()).collect();
		let arg = json!({
			"from": range.from,
			"to": range.to,
			"insert": patch.insert,
			"expected": expected,
			"expectedLength": range.base_len,
		});
		Ok(self.run_script(script::APPLY_PATCH, &arg).await?)
	}

	async fn set_cursor(&self, offset: usize) -> Result<(), SurfaceError> {
		let doc = self.read_document().await?;
		let pos = utf16_offset(&doc, offset);
		Ok(self.run_script(script::SET_CURSOR, &json!(pos)).await?)
	}

	async fn toggle(&self) -> Result<(), SurfaceError> {
		Ok(self.run_script(script::TOGGLE, &Value::Null).await?)
	}

	async fn evaluate(&self) -> Result<(), SurfaceError> {
		Ok(self.run_script(script::EVALUATE, &Value::Null).await?)
	}

	async fn refresh(&self) -> Result<(), SurfaceError> {
		Ok(self.run_script(script::REFRESH, &Value::Null).await?)
	}

	async fn stop(&self) -> Result<(), SurfaceError> {
		Ok(self.run_script(script::STOP, &Value::Null).await?)
	}

	async fn eval_error(&self) -> Result<Option<String>, SurfaceError> {
		match self.call_function(script::EVAL_ERROR, &Value::Null).await? {
			Value::String(msg) => Ok(Some(msg)),
			Value::Null => Ok(None),
			other => Err(CdpError::UnexpectedResponse(format!("eval error: {other}")).into()),
		}
	}

	async fn close(&self) {
		if !self.conn.is_closed() {
			let closing = self.conn.call("Browser.close", json!({}), None);
			match tokio::time::timeout(CLOSE_GRACE, closing).await {
				Ok(Ok(_)) | Ok(Err(CdpError::Disconnected)) => {}
				Ok(Err(e)) => tracing::debug!(error = %e, "Browser.close failed"),
				Err(_) => tracing::debug!("Browser.close timed out"),
			}
		}
		if let Some(browser) = &self.browser {
			browser.shutdown(CLOSE_GRACE).await;
		}
	}
}

async fn find_page_target(conn: &Connection) -> Result<String, CdpError> {
	for _ in 0..TARGET_ATTEMPTS {
		let reply = conn.call("Target.getTargets", json!({}), None).await?;
		let page = reply["targetInfos"]
			.as_array()
			.into_iter()
			.flatten()
			.find(|info| info["type"] == "page")
			.and_then(|info| info["targetId"].as_str());
		if let Some(id) = page {
			return Ok(id.to_string());
		}
		tokio::time::sleep(TARGET_POLL).await;
	}
	Err(CdpError::NoPage)
}

async fn route_events(
	mut events: mpsc::UnboundedReceiver<Event>,
	target_id: String,
	session_id: String,
	changed: mpsc::UnboundedSender<()>,
	disconnected: CancellationToken,
) {
	while let Some(event) = events.recv().await {
		match event.method.as_str() {
			"Runtime.bindingCalled"
				if event.session_id.as_deref() == Some(session_id.as_str())
					&& event.params["name"] == script::CHANGE_BINDING =>
			{
				let _ = changed.send(());
			}
			"Target.targetDestroyed" if event.params["targetId"] == target_id.as_str() => {
				tracing::info!("page closed");
				break;
			}
			"Target.detachedFromTarget" if event.params["sessionId"] == session_id.as_str() => {
				tracing::info!("detached from page");
				break;
			}
			"Inspector.detached" => {
				tracing::info!(reason = %event.params["reason"], "inspector detached");
				break;
			}
			method => tracing::trace!(method, "ignoring devtools event"),
		}
	}
	disconnected.cancel();
}
