//! Chromium DevTools Protocol surface for the Strudel REPL.
//!
//! * [`Browser`]: launches a Chromium-family browser in app mode and finds
//!   its DevTools endpoint.
//! * [`Connection`]: websocket JSON-RPC client for the DevTools protocol.
//! * [`StrudelPage`]: a [`strudel_sync::Surface`] driving the REPL page
//!   through `window.strudelMirror`.

#![warn(missing_docs)]

pub mod connection;
pub mod error;
pub mod launcher;
pub mod page;
mod script;

#[cfg(test)]
mod testing;

pub use connection::{Connection, Event};
pub use error::CdpError;
pub use launcher::{Browser, LaunchOptions, find_browser};
pub use page::StrudelPage;
