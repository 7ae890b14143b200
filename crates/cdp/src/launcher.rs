//! Browser discovery and launch.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::error::CdpError;

/// REPL loaded when no URL is configured.
pub const DEFAULT_URL: &str = "https://strudel.cc/";

/// Executables searched on `PATH`, in order.
pub const BROWSER_CANDIDATES: &[&str] = &[
	"chromium",
	"chromium-browser",
	"google-chrome",
	"google-chrome-stable",
	"chrome",
	"brave-browser",
	"microsoft-edge",
];

/// How long the browser gets to announce its DevTools endpoint.
pub const DEFAULT_DEVTOOLS_TIMEOUT: Duration = Duration::from_secs(30);

const DEVTOOLS_PREFIX: &str = "DevTools listening on ";

/// Browser launch parameters.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	/// Explicit executable; `PATH` is searched when unset.
	pub executable: Option<PathBuf>,
	/// Page opened in app mode.
	pub url: String,
	/// Browser profile directory, created if missing.
	pub user_data_dir: PathBuf,
	/// Run without a window.
	pub headless: bool,
	/// Bound on waiting for the DevTools endpoint.
	pub devtools_timeout: Duration,
}

impl LaunchOptions {
	/// Options for `url` with a profile in `user_data_dir`.
	#[must_use]
	pub fn new(url: impl Into<String>, user_data_dir: impl Into<PathBuf>) -> Self {
		Self {
			executable: None,
			url: url.into(),
			user_data_dir: user_data_dir.into(),
			headless: false,
			devtools_timeout: DEFAULT_DEVTOOLS_TIMEOUT,
		}
	}

	/// Command-line arguments for the browser.
	#[must_use]
	pub fn browser_args(&self) -> Vec<String> {
		let mut args = vec![
			"--remote-debugging-port=0".to_string(),
			format!("--user-data-dir={}", self.user_data_dir.display()),
			format!("--app={}", self.url),
			"--autoplay-policy=no-user-gesture-required".to_string(),
			"--no-first-run".to_string(),
			"--no-default-browser-check".to_string(),
		];
		if self.headless {
			args.push("--headless=new".to_string());
		}
		args
	}
}

/// Resolves the browser executable.
///
/// # Errors
///
/// [`CdpError::BrowserUnusable`] if `explicit` cannot be executed,
/// [`CdpError::BrowserNotFound`] if no candidate is on `PATH`.
pub fn find_browser(explicit: Option<&Path>) -> Result<PathBuf, CdpError> {
	if let Some(path) = explicit {
		return which::which(path).map_err(|_| CdpError::BrowserUnusable {
			path: path.to_path_buf(),
		});
	}

	BROWSER_CANDIDATES
		.iter()
		.find_map(|name| which::which(name).ok())
		.ok_or_else(|| CdpError::BrowserNotFound {
			tried: BROWSER_CANDIDATES.join(", "),
		})
}

/// Extracts the websocket URL from a browser stderr line.
#[must_use]
pub fn parse_devtools_url(line: &str) -> Option<&str> {
	line.trim()
		.strip_prefix(DEVTOOLS_PREFIX)
		.map(str::trim)
		.filter(|url| url.starts_with("ws://") || url.starts_with("wss://"))
}

/// A running browser process.
///
/// The process is killed when this is dropped.
pub struct Browser {
	child: Mutex<Child>,
	devtools_url: String,
}

impl Browser {
	/// Starts the browser and waits for its DevTools endpoint.
	///
	/// # Errors
	///
	/// Fails if no executable is found, it cannot be spawned, or it does not
	/// announce an endpoint within [`LaunchOptions::devtools_timeout`].
	pub async fn launch(opts: &LaunchOptions) -> Result<Self, CdpError> {
		let executable = find_browser(opts.executable.as_deref())?;
		tokio::fs::create_dir_all(&opts.user_data_dir)
			.await
			.map_err(CdpError::Spawn)?;

		tracing::debug!(browser = %executable.display(), url = %opts.url, headless = opts.headless, "launching browser");
		let mut child = Command::new(&executable)
			.args(opts.browser_args())
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(CdpError::Spawn)?;

		let stderr = child.stderr.take().ok_or(CdpError::BrowserExited)?;
		let mut lines = BufReader::new(stderr).lines();

		let announced = tokio::time::timeout(opts.devtools_timeout, async {
			while let Some(line) = lines.next_line().await? {
				if let Some(url) = parse_devtools_url(&line) {
					return Ok(Some(url.to_string()));
				}
				tracing::trace!(%line, "browser stderr");
			}
			Ok::<_, std::io::Error>(None)
		})
		.await
		.map_err(|_| CdpError::DevToolsTimeout(opts.devtools_timeout))?
		.map_err(CdpError::Spawn)?;
		let devtools_url = announced.ok_or(CdpError::BrowserExited)?;

		// Keep draining so the browser never blocks on a full pipe.
		tokio::spawn(async move {
			while let Ok(Some(line)) = lines.next_line().await {
				tracing::trace!(%line, "browser stderr");
			}
		});

		tracing::info!(browser = %executable.display(), %devtools_url, "browser launched");
		Ok(Self {
			child: Mutex::new(child),
			devtools_url,
		})
	}

	/// DevTools websocket URL of the browser.
	#[must_use]
	pub fn devtools_url(&self) -> &str {
		&self.devtools_url
	}

	/// Waits up to `grace` for the process to exit, then kills it.
	pub async fn shutdown(&self, grace: Duration) {
		let mut child = self.child.lock().await;
		match tokio::time::timeout(grace, child.wait()).await {
			Ok(Ok(status)) => tracing::debug!(?status, "browser exited"),
			Ok(Err(e)) => tracing::warn!(error = %e, "failed to wait on browser"),
			Err(_) => {
				tracing::debug!("browser still running, killing it");
				if let Err(e) = child.kill().await {
					tracing::warn!(error = %e, "failed to kill browser");
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn devtools_url_is_found_in_stderr_line() {
		assert_eq!(
			parse_devtools_url("DevTools listening on ws://127.0.0.1:40123/devtools/browser/4f1c\n"),
			Some("ws://127.0.0.1:40123/devtools/browser/4f1c")
		);
		assert_eq!(parse_devtools_url("[1234:5678:ERROR:bus.cc(407)] Failed to connect"), None);
		assert_eq!(parse_devtools_url("DevTools listening on nothing"), None);
	}

	#[test]
	fn args_open_the_repl_in_app_mode_with_audio() {
		let opts = LaunchOptions::new(DEFAULT_URL, "/tmp/strudel-profile");
		let args = opts.browser_args();

		assert_eq!(
			args,
			vec![
				"--remote-debugging-port=0",
				"--user-data-dir=/tmp/strudel-profile",
				"--app=https://strudel.cc/",
				"--autoplay-policy=no-user-gesture-required",
				"--no-first-run",
				"--no-default-browser-check",
			]
		);
		assert!(!args.iter().any(|a| a.contains("mute-audio")));
	}

	#[test]
	fn headless_adds_new_headless_mode() {
		let mut opts = LaunchOptions::new(DEFAULT_URL, "/tmp/p");
		opts.headless = true;
		assert_eq!(opts.browser_args().last().map(String::as_str), Some("--headless=new"));
	}

	#[test]
	fn explicit_missing_browser_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("no-such-browser");
		assert!(matches!(
			find_browser(Some(&missing)),
			Err(CdpError::BrowserUnusable { path }) if path == missing
		));
	}
}
