//! Stylesheets injected into the REPL page once it is ready.

/// Hides the editor scrollbar.
pub const HIDE_EDITOR_SCROLLBAR: &str = r"
.cm-scroller {
    scrollbar-width: none;
}
";

/// Stops the evaluated-line background flash from fighting the editor theme.
pub const DISABLE_EVAL_BG_FLASH: &str = r#"
.cm-line:not(.cm-activeLine):has(> span) {
    background: var(--lineBackground) !important;
    width: fit-content;
}
.cm-line.cm-activeLine {
    background: linear-gradient(var(--lineHighlight), var(--lineHighlight)), var(--lineBackground) !important;
}
.cm-line > *, .cm-line span[style*="background-color"] {
    background-color: transparent !important;
    filter: none !important;
}
"#;

/// Hides the top bar.
pub const HIDE_TOP_BAR: &str = r"
header {
    display: none !important;
}
";

/// Expands the menu panel to cover the whole window.
pub const MAX_MENU_PANEL: &str = r"
nav:not(:has(> button:first-child)) {
    position: absolute;
    z-index: 99;
    height: 100%;
    width: 100vw;
    max-width: 100vw;
    background: linear-gradient(var(--lineHighlight), var(--lineHighlight)), var(--background);
}
";

/// Hides the menu panel.
pub const HIDE_MENU_PANEL: &str = r"
nav {
    display: none !important;
}
";

/// Hides the code editor, leaving only the visuals.
pub const HIDE_CODE_EDITOR: &str = r"
.cm-editor {
    display: none !important;
}
";

/// Hides the inline error strip.
pub const HIDE_ERROR_DISPLAY: &str = r"
header + div + div {
    display: none !important;
}
";

/// Visibility toggles and extra CSS requested at launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleConfig {
	/// Hide the top bar.
	pub hide_top_bar: bool,
	/// Expand the menu panel to the full window.
	pub maximise_menu_panel: bool,
	/// Hide the menu panel.
	pub hide_menu_panel: bool,
	/// Hide the code editor.
	pub hide_code_editor: bool,
	/// Hide the error display.
	pub hide_error_display: bool,
	/// User stylesheet, injected last.
	pub custom_css: Option<String>,
}

impl StyleConfig {
	/// Stylesheets to inject, in injection order.
	#[must_use]
	pub fn stylesheets(&self) -> Vec<&str> {
		let toggles = [
			(self.maximise_menu_panel, MAX_MENU_PANEL),
			(self.hide_top_bar, HIDE_TOP_BAR),
			(self.hide_menu_panel, HIDE_MENU_PANEL),
			(self.hide_code_editor, HIDE_CODE_EDITOR),
			(self.hide_error_display, HIDE_ERROR_DISPLAY),
		];

		let mut sheets = vec![HIDE_EDITOR_SCROLLBAR, DISABLE_EVAL_BG_FLASH];
		sheets.extend(toggles.into_iter().filter_map(|(on, css)| on.then_some(css)));
		if let Some(css) = self.custom_css.as_deref() {
			sheets.push(css);
		}
		sheets
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn defaults_only_inject_base_sheets() {
		assert_eq!(
			StyleConfig::default().stylesheets(),
			vec![HIDE_EDITOR_SCROLLBAR, DISABLE_EVAL_BG_FLASH]
		);
	}

	#[test]
	fn toggles_follow_base_sheets_and_custom_css_comes_last() {
		let config = StyleConfig {
			hide_top_bar: true,
			hide_error_display: true,
			custom_css: Some("body { color: red; }".into()),
			..StyleConfig::default()
		};
		assert_eq!(
			config.stylesheets(),
			vec![
				HIDE_EDITOR_SCROLLBAR,
				DISABLE_EVAL_BG_FLASH,
				HIDE_TOP_BAR,
				HIDE_ERROR_DISPLAY,
				"body { color: red; }",
			]
		);
	}
}
