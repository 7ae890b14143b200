//! Bidirectional document synchronization between an editor and the Strudel REPL.
//!
//! The editor speaks the line protocol from [`strudel_proto`]; the REPL is
//! reached through a [`Surface`]. Everything that mutates the shared
//! document runs on one [`Dispatcher`] drain loop:
//!
//! * [`EchoCache`]: one shared fingerprint slot that breaks sync loops.
//! * [`compute_patch`]: single-hunk prefix/suffix diff so live editor state
//!   outside the edit survives.
//! * [`Dispatcher`]: FIFO command queue, one command in flight at a time.
//! * [`Session`]: `Launching → Ready → Active → Closed` lifecycle and
//!   command semantics.

#![warn(missing_docs)]

pub mod diff;
pub mod dispatch;
pub mod echo;
pub mod error;
pub mod ingress;
pub mod outbox;
pub mod poll;
pub mod session;
pub mod style;
pub mod surface;

#[doc(hidden)]
pub mod test_helpers;

pub use diff::{Patch, compute_patch};
pub use dispatch::{Command, CommandHandler, Dispatcher, Flow};
pub use echo::{Direction, EchoCache};
pub use error::{SessionError, SurfaceError};
pub use outbox::Outbox;
pub use session::{CloseReason, Session, SessionConfig, SessionState};
pub use style::StyleConfig;
pub use surface::{Surface, SurfaceEvents};
