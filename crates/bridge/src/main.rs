//! Strudel bridge binary.
//!
//! Launches the REPL in a browser and keeps it in sync with the editor that
//! spawned this process: editor messages arrive on stdin, bridge messages
//! leave on stdout, logs go to stderr or `--log-file`.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use strudel_cdp::{Browser, Connection, StrudelPage};
use strudel_sync::outbox::write_outbound;
use strudel_sync::{CloseReason, Outbox, Session};
use tracing::info;

mod cli;
mod logging;

use cli::Args;

fn main() -> ExitCode {
	let args = match Args::try_parse() {
		Ok(args) => args,
		Err(e) => {
			let _ = e.print();
			return if e.use_stderr() {
				ExitCode::FAILURE
			} else {
				ExitCode::SUCCESS
			};
		}
	};

	if let Err(e) = logging::init(args.log_level.as_deref(), args.log_file.as_deref()) {
		eprintln!("strudel-bridge: {e:#}");
		return ExitCode::FAILURE;
	}

	let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
		Ok(runtime) => runtime,
		Err(e) => {
			tracing::error!(error = %e, "failed to start runtime");
			return ExitCode::FAILURE;
		}
	};

	let outcome = runtime.block_on(run(args));
	// Blocking stdin reads never finish on their own.
	runtime.shutdown_background();

	match outcome {
		Ok(reason) => {
			info!(?reason, "bridge exiting");
			ExitCode::SUCCESS
		}
		Err(e) => {
			tracing::error!(error = %format!("{e:#}"), "bridge failed");
			ExitCode::FAILURE
		}
	}
}

async fn run(args: Args) -> anyhow::Result<CloseReason> {
	info!(version = env!("CARGO_PKG_VERSION"), "starting strudel-bridge");

	let browser = Browser::launch(&args.launch_options())
		.await
		.context("failed to launch browser")?;
	let (conn, events) = Connection::connect(browser.devtools_url())
		.await
		.context("failed to connect to browser")?;
	let (page, surface_events) = StrudelPage::attach(conn, events, Some(browser))
		.await
		.context("failed to attach to the REPL page")?;

	let (outbox, outbound) = Outbox::channel();
	let writer = tokio::spawn(write_outbound(outbound, tokio::io::stdout()));

	let session = Session::new(Arc::new(page), outbox, args.session_config());
	let shutdown = session.shutdown_token();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!("interrupted");
			shutdown.cancel();
		}
	});

	let outcome = session.run(surface_events, tokio::io::stdin()).await;

	match writer.await {
		Ok(Ok(())) => {}
		Ok(Err(e)) => tracing::debug!(error = %e, "editor output closed"),
		Err(e) => tracing::warn!(error = %e, "output writer failed"),
	}

	Ok(outcome?)
}
