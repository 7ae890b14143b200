//! Document fingerprints used for echo suppression.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Equality-only identity of one document version.
///
/// The fingerprint is the canonical transport encoding of the document
/// (padded standard base64 of its UTF-8 bytes), so two fingerprints are
/// equal exactly when the documents are byte-for-byte equal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
	/// Fingerprints `document`.
	#[must_use]
	pub fn of(document: &str) -> Self {
		Self(STANDARD.encode(document.as_bytes()))
	}

	/// Returns the encoded form, which doubles as the wire payload.
	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		const SHOWN: usize = 12;
		if self.0.len() > SHOWN {
			write!(f, "Fingerprint({}…, len={})", &self.0[..SHOWN], self.0.len())
		} else {
			write!(f, "Fingerprint({})", self.0)
		}
	}
}
