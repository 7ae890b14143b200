//! Page-side functions, each called as `(<fn>)(<json arg>)`.
//!
//! Editor offsets here are UTF-16 code units, the unit CodeMirror uses.

/// CodeMirror content element; its presence means the REPL has rendered.
pub(crate) const ANCHOR_SELECTOR: &str = ".cm-content";

/// Name of the binding the mutation observer calls.
pub(crate) const CHANGE_BINDING: &str = "strudelBridgeContentChanged";

pub(crate) const ANCHOR_READY: &str = r"(selector) =>
	!!document.querySelector(selector) && !!window.strudelMirror";

pub(crate) const ADD_STYLE: &str = r"(css) => {
	const style = document.createElement('style');
	style.textContent = css;
	document.head.appendChild(style);
	return 'ok';
}";

pub(crate) const OBSERVE_CHANGES: &str = r"({ selector, binding }) => {
	const editor = document.querySelector(selector);
	if (!editor || typeof window[binding] !== 'function') return 'missing';
	const observer = new MutationObserver(() => window[binding](''));
	observer.observe(editor, { childList: true, characterData: true, subtree: true });
	return 'ok';
}";

pub(crate) const DOCUMENT: &str = r"() => {
	const mirror = window.strudelMirror;
	return mirror ? mirror.editor.state.doc.toString() : null;
}";

pub(crate) const APPLY_PATCH: &str = r"({ from, to, insert, expected, expectedLength }) => {
	const mirror = window.strudelMirror;
	if (!mirror) return 'missing';
	const view = mirror.editor;
	if (view.state.doc.length !== expectedLength || view.state.sliceDoc(from, to) !== expected) {
		return 'stale';
	}
	view.dispatch({ changes: { from, to, insert } });
	mirror.root.click();
	return 'ok';
}";

pub(crate) const SET_CURSOR: &str = r"(pos) => {
	const mirror = window.strudelMirror;
	if (!mirror) return 'missing';
	const len = mirror.editor.state.doc.length;
	mirror.setCursorLocation(Math.min(Math.max(pos, 0), len));
	mirror.editor.dispatch({ scrollIntoView: true });
	return 'ok';
}";

pub(crate) const TOGGLE: &str = r"() => {
	const mirror = window.strudelMirror;
	if (!mirror) return 'missing';
	mirror.toggle();
	return 'ok';
}";

pub(crate) const EVALUATE: &str = r"() => {
	const mirror = window.strudelMirror;
	if (!mirror) return 'missing';
	mirror.evaluate();
	return 'ok';
}";

pub(crate) const REFRESH: &str = r"() => {
	const mirror = window.strudelMirror;
	if (!mirror) return 'missing';
	if (mirror.repl.state.started) mirror.evaluate();
	return 'ok';
}";

pub(crate) const STOP: &str = r"() => {
	const mirror = window.strudelMirror;
	if (!mirror) return 'missing';
	mirror.stop();
	return 'ok';
}";

pub(crate) const EVAL_ERROR: &str = r"() => {
	const error = window.strudelMirror?.repl?.state?.evalError;
	return error && error.message ? String(error.message) : null;
}";
