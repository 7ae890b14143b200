//! Echo suppression.
//!
//! A single fingerprint slot is shared by both directions. Whichever side
//! last set the document owns the slot, so the other side observing that same
//! content is recognized as an echo and dropped.

use strudel_proto::Fingerprint;

/// Direction of a content update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	/// Editor → surface.
	Inbound,
	/// Surface → editor.
	Outbound,
}

/// Last-synced fingerprint slot.
#[derive(Debug, Default)]
pub struct EchoCache {
	last_synced: Option<Fingerprint>,
}

impl EchoCache {
	/// Creates an empty cache; the first update in either direction applies.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns whether an update with `fingerprint` should be applied, and
	/// records it as the last-synced version if so.
	pub fn should_apply(&mut self, direction: Direction, fingerprint: &Fingerprint) -> bool {
		if self.last_synced.as_ref() == Some(fingerprint) {
			tracing::debug!(?direction, ?fingerprint, "suppressing duplicate content");
			return false;
		}
		self.last_synced = Some(fingerprint.clone());
		true
	}

	/// Returns the last-synced fingerprint.
	#[must_use]
	pub fn last_synced(&self) -> Option<&Fingerprint> {
		self.last_synced.as_ref()
	}
}
