use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use super::*;
use crate::diff::Patch;
use crate::test_helpers::{FakeSurface, SurfaceCall};

fn session(doc: &str, config: SessionConfig) -> (Session<FakeSurface>, Arc<FakeSurface>, mpsc::UnboundedReceiver<Outbound>) {
	let (surface, _events) = FakeSurface::new(doc);
	let (outbox, rx) = Outbox::channel();
	(Session::new(Arc::clone(&surface), outbox, config), surface, rx)
}

fn content(text: &str) -> Command {
	Command::Editor(Inbound::Content(text.to_string()))
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Outbound> {
	let mut out = Vec::new();
	while let Ok(msg) = rx.try_recv() {
		out.push(msg);
	}
	out
}

#[test]
fn cursor_is_clamped_to_document() {
	assert_eq!(clamp_cursor(1000, 10), 10);
	assert_eq!(clamp_cursor(-3, 10), 0);
	assert_eq!(clamp_cursor(4, 10), 4);
	assert_eq!(clamp_cursor(i64::MAX, 0), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn start_injects_styles_observes_and_announces_ready() {
	let config = SessionConfig {
		styles: StyleConfig {
			hide_top_bar: true,
			..StyleConfig::default()
		},
		..SessionConfig::default()
	};
	let (mut session, surface, mut rx) = session("", config.clone());

	assert_eq!(session.state(), SessionState::Launching);
	session.start().await.unwrap();

	assert_eq!(session.state(), SessionState::Active);
	assert_eq!(surface.styles(), config.styles.stylesheets());
	assert!(surface.is_observing());
	assert_eq!(drain(&mut rx), vec![Outbound::Ready]);
}

#[tokio::test(flavor = "current_thread")]
async fn headless_start_skips_observer() {
	let config = SessionConfig {
		headless: true,
		..SessionConfig::default()
	};
	let (mut session, surface, _rx) = session("", config);
	session.start().await.unwrap();
	assert!(!surface.is_observing());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn start_times_out_without_anchor() {
	let (surface, _events) = FakeSurface::never_ready();
	let (outbox, mut rx) = Outbox::channel();
	let mut session = Session::new(surface, outbox, SessionConfig::default());

	let err = session.start().await.unwrap_err();
	assert!(matches!(err, SessionError::StartupTimeout(t) if t == DEFAULT_STARTUP_TIMEOUT));
	assert_eq!(session.state(), SessionState::Launching);
	assert!(drain(&mut rx).is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn content_on_empty_surface_inserts_everything() {
	let (mut session, surface, _rx) = session("", SessionConfig::default());

	session.handle(content("hello")).await.unwrap();

	assert_eq!(
		surface.patches(),
		vec![Patch {
			from: 0,
			to: 0,
			insert: "hello".into(),
		}]
	);
	assert_eq!(session.snapshot(), "hello");
	assert_eq!(session.last_synced(), Some(&Fingerprint::of("hello")));
}

#[tokio::test(flavor = "current_thread")]
async fn content_patches_only_the_changed_range() {
	let (mut session, surface, _rx) = session("hello world", SessionConfig::default());

	session.handle(content("hello brave world")).await.unwrap();

	assert_eq!(
		surface.patches(),
		vec![Patch {
			from: 6,
			to: 6,
			insert: "brave ".into(),
		}]
	);
	assert_eq!(surface.current_document(), "hello brave world");
}

#[tokio::test(flavor = "current_thread")]
async fn duplicate_content_is_suppressed() {
	let (mut session, surface, _rx) = session("", SessionConfig::default());

	session.handle(content("a")).await.unwrap();
	let reads = surface.document_reads();
	session.handle(content("a")).await.unwrap();

	assert_eq!(surface.patches().len(), 1);
	assert_eq!(surface.document_reads(), reads);
}

#[tokio::test(flavor = "current_thread")]
async fn content_matching_surface_applies_nothing() {
	let (mut session, surface, _rx) = session("same", SessionConfig::default());
	session.handle(content("same")).await.unwrap();
	assert!(surface.patches().is_empty());
	assert_eq!(session.snapshot(), "same");
}

#[tokio::test(flavor = "current_thread")]
async fn stale_document_is_rediffed_once() {
	let (mut session, surface, _rx) = session("abc", SessionConfig::default());
	surface.fail_next_apply(SurfaceError::StaleDocument);

	session.handle(content("abcd")).await.unwrap();

	assert_eq!(surface.current_document(), "abcd");
	assert_eq!(surface.document_reads(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn apply_failure_is_reported() {
	let (mut session, surface, _rx) = session("abc", SessionConfig::default());
	surface.fail_next_apply(SurfaceError::MissingEditor);

	let err = session.handle(content("xyz")).await.unwrap_err();

	assert_eq!(err, SurfaceError::MissingEditor);
	assert_eq!(surface.current_document(), "abc");
	assert_eq!(session.snapshot(), "");
}

#[tokio::test(flavor = "current_thread")]
async fn surface_change_is_published_once() {
	let (mut session, surface, mut rx) = session("", SessionConfig::default());

	surface.user_edit("s(\"bd sd\")");
	session.handle(Command::SurfaceChanged).await.unwrap();
	session.handle(Command::SurfaceChanged).await.unwrap();

	assert_eq!(drain(&mut rx), vec![Outbound::Content("s(\"bd sd\")".into())]);
	assert_eq!(session.snapshot(), "s(\"bd sd\")");
}

#[tokio::test(flavor = "current_thread")]
async fn applied_content_is_not_echoed_back() {
	let (mut session, _surface, mut rx) = session("", SessionConfig::default());

	session.handle(content("note(\"c e g\")")).await.unwrap();
	session.handle(Command::SurfaceChanged).await.unwrap();

	assert!(drain(&mut rx).is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn published_content_is_not_reapplied() {
	let (mut session, surface, _rx) = session("", SessionConfig::default());

	surface.user_edit("hello");
	session.handle(Command::SurfaceChanged).await.unwrap();
	session.handle(content("hello")).await.unwrap();

	assert!(surface.patches().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn playback_commands_reach_the_surface() {
	let (mut session, surface, _rx) = session("", SessionConfig::default());

	for msg in [Inbound::Refresh, Inbound::Evaluate, Inbound::Refresh, Inbound::Toggle] {
		assert_eq!(session.handle(msg.into()).await.unwrap(), Flow::Continue);
	}
	assert_eq!(session.handle(Inbound::Stop.into()).await.unwrap(), Flow::Stop);
	assert_eq!(session.close_reason, Some(CloseReason::Stop));

	assert_eq!(
		surface.calls(),
		vec![
			SurfaceCall::Evaluate,
			SurfaceCall::Refresh,
			SurfaceCall::Toggle,
			SurfaceCall::Stop,
		]
	);
}

#[tokio::test(flavor = "current_thread")]
async fn cursor_is_clamped_before_reaching_surface() {
	let (mut session, surface, _rx) = session("0123456789", SessionConfig::default());

	session.handle(Inbound::Cursor(1000).into()).await.unwrap();
	assert_eq!(surface.cursor(), Some(10));

	session.handle(Inbound::Cursor(-1).into()).await.unwrap();
	assert_eq!(surface.cursor(), Some(0));
}

#[tokio::test(flavor = "current_thread")]
async fn quit_and_editor_eof_stop_with_their_reason() {
	let (mut session, _surface, _rx) = session("", SessionConfig::default());
	assert_eq!(session.handle(Inbound::Quit.into()).await.unwrap(), Flow::Stop);
	assert_eq!(session.close_reason, Some(CloseReason::Quit));

	assert_eq!(session.handle(Command::EditorClosed).await.unwrap(), Flow::Stop);
	assert_eq!(session.close_reason, Some(CloseReason::EditorClosed));
}

#[tokio::test(flavor = "current_thread")]
async fn stop_closes_even_if_playback_stop_fails() {
	let (mut session, surface, _rx) = session("", SessionConfig::default());
	surface.disconnect();

	assert_eq!(session.handle(Inbound::Stop.into()).await.unwrap(), Flow::Stop);
	assert_eq!(session.close_reason, Some(CloseReason::Stop));
}
