//! Line protocol spoken between the editor and the Strudel bridge.
//!
//! Every message is one `\n`-terminated line. Control messages are bare
//! tokens (`STRUDEL_QUIT`), payload messages are a token prefix followed by
//! a transport-safe payload (`STRUDEL_CONTENT:<base64>`), so embedded
//! newlines in documents can never break framing.
//!
//! * [`Inbound`]: editor → bridge messages.
//! * [`Outbound`]: bridge → editor messages.
//! * [`Fingerprint`]: equality-only identity of a document version.
//! * [`MessageCodec`]: tokio-util codec framing both directions over a byte stream.

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod message;

pub use codec::{Frame, MessageCodec};
pub use error::DecodeError;
pub use fingerprint::Fingerprint;
pub use message::{Inbound, MessageKind, Outbound};
