//! Tracing setup. Logs never go to stdout, which carries the editor protocol.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Filter variable read when `--log-level` is not given.
pub const LOG_ENV: &str = "STRUDEL_BRIDGE_LOG";

const DEFAULT_FILTER: &str = "info";

/// Picks the filter: explicit flag, then [`LOG_ENV`], then `RUST_LOG`.
fn select_filter(flag: Option<&str>, bridge_env: Option<String>, rust_log: Option<String>) -> String {
	flag.map(str::to_string)
		.or(bridge_env)
		.or(rust_log)
		.filter(|f| !f.trim().is_empty())
		.unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails on an invalid filter or an unopenable log file.
pub fn init(level: Option<&str>, log_file: Option<&Path>) -> anyhow::Result<()> {
	let directive = select_filter(
		level,
		std::env::var(LOG_ENV).ok(),
		std::env::var(EnvFilter::DEFAULT_ENV).ok(),
	);
	let filter = EnvFilter::try_new(&directive).with_context(|| format!("invalid log filter `{directive}`"))?;

	let builder = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_ansi(false)
		.with_target(true);

	match log_file {
		Some(path) => {
			let file = OpenOptions::new()
				.create(true)
				.append(true)
				.open(path)
				.with_context(|| format!("cannot open log file {}", path.display()))?;
			builder.with_writer(Mutex::new(file)).init();
		}
		None => builder.with_writer(std::io::stderr).init(),
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn flag_wins_over_environment() {
		assert_eq!(
			select_filter(Some("debug"), Some("warn".into()), Some("trace".into())),
			"debug"
		);
	}

	#[test]
	fn bridge_variable_wins_over_rust_log() {
		assert_eq!(select_filter(None, Some("warn".into()), Some("trace".into())), "warn");
		assert_eq!(select_filter(None, None, Some("trace".into())), "trace");
	}

	#[test]
	fn defaults_to_info() {
		assert_eq!(select_filter(None, None, None), "info");
		assert_eq!(select_filter(Some(" "), None, None), "info");
	}
}
