//! Command line interface.

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use strudel_cdp::LaunchOptions;
use strudel_cdp::launcher::DEFAULT_URL;
use strudel_sync::{SessionConfig, StyleConfig};

/// Profile directory name under the user cache dir.
const PROFILE_DIR: &str = "strudel-nvim";

/// Bridge command line arguments.
#[derive(Parser, Debug)]
#[command(name = "strudel-bridge", version)]
#[command(about = "Keeps an editor buffer and the Strudel REPL in sync over stdin/stdout")]
pub struct Args {
	/// Hide the REPL top bar
	#[arg(long, env = "STRUDEL_HIDE_TOP_BAR")]
	pub hide_top_bar: bool,

	/// Expand the menu panel to the whole window
	#[arg(long, env = "STRUDEL_MAXIMISE_MENU_PANEL")]
	pub maximise_menu_panel: bool,

	/// Hide the menu panel
	#[arg(long, env = "STRUDEL_HIDE_MENU_PANEL")]
	pub hide_menu_panel: bool,

	/// Hide the code editor
	#[arg(long, env = "STRUDEL_HIDE_CODE_EDITOR")]
	pub hide_code_editor: bool,

	/// Hide the error display
	#[arg(long, env = "STRUDEL_HIDE_ERROR_DISPLAY")]
	pub hide_error_display: bool,

	/// Extra stylesheet, base64 encoded
	#[arg(long = "custom-css-b64", value_name = "BASE64", env = "STRUDEL_CUSTOM_CSS_B64")]
	pub custom_css_b64: Option<String>,

	/// Run the browser headless; editor-side changes are not observed
	#[arg(long, env = "STRUDEL_HEADLESS")]
	pub headless: bool,

	/// Browser profile directory [default: <cache dir>/strudel-nvim]
	#[arg(long, value_name = "PATH", env = "STRUDEL_USER_DATA_DIR")]
	pub user_data_dir: Option<PathBuf>,

	/// Browser executable [default: first Chromium-family browser on PATH]
	#[arg(long, value_name = "PATH", env = "STRUDEL_BROWSER")]
	pub browser: Option<PathBuf>,

	/// REPL URL
	#[arg(long, value_name = "URL", default_value = DEFAULT_URL, env = "STRUDEL_URL")]
	pub url: String,

	/// How long to wait for the REPL editor to appear
	#[arg(long, value_name = "MS", default_value_t = 10_000, env = "STRUDEL_STARTUP_TIMEOUT_MS")]
	pub startup_timeout_ms: u64,

	/// Evaluation error poll period
	#[arg(long, value_name = "MS", default_value_t = 300, env = "STRUDEL_POLL_INTERVAL_MS")]
	pub poll_interval_ms: u64,

	/// Log filter, e.g. `debug` or `strudel_sync=trace,info`
	#[arg(long, value_name = "FILTER")]
	pub log_level: Option<String>,

	/// Append logs to this file instead of stderr
	#[arg(long, value_name = "PATH", env = "STRUDEL_BRIDGE_LOG_FILE")]
	pub log_file: Option<PathBuf>,
}

impl Args {
	/// Stylesheet selection. An undecodable custom stylesheet is logged and
	/// skipped.
	pub fn style_config(&self) -> StyleConfig {
		StyleConfig {
			hide_top_bar: self.hide_top_bar,
			maximise_menu_panel: self.maximise_menu_panel,
			hide_menu_panel: self.hide_menu_panel,
			hide_code_editor: self.hide_code_editor,
			hide_error_display: self.hide_error_display,
			custom_css: self.custom_css_b64.as_deref().and_then(decode_css),
		}
	}

	/// Session tunables.
	pub fn session_config(&self) -> SessionConfig {
		SessionConfig {
			startup_timeout: Duration::from_millis(self.startup_timeout_ms),
			poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
			headless: self.headless,
			styles: self.style_config(),
		}
	}

	/// Browser launch parameters.
	pub fn launch_options(&self) -> LaunchOptions {
		let user_data_dir = self.user_data_dir.clone().unwrap_or_else(|| {
			dirs::cache_dir()
				.unwrap_or_else(std::env::temp_dir)
				.join(PROFILE_DIR)
		});
		let mut opts = LaunchOptions::new(self.url.clone(), user_data_dir);
		opts.executable = self.browser.clone();
		opts.headless = self.headless;
		opts
	}
}

fn decode_css(b64: &str) -> Option<String> {
	let bytes = match STANDARD.decode(b64.trim()) {
		Ok(bytes) => bytes,
		Err(e) => {
			tracing::warn!(error = %e, "ignoring undecodable custom CSS");
			return None;
		}
	};
	match String::from_utf8(bytes) {
		Ok(css) => Some(css),
		Err(e) => {
			tracing::warn!(error = %e, "ignoring custom CSS that is not UTF-8");
			None
		}
	}
}
