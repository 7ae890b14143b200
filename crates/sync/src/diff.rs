//! Single-hunk minimal diff.
//!
//! Patches are the smallest contiguous replacement turning the old document
//! into the new one. Replacing only that range keeps cursor, selection and
//! inline animations outside of it intact on the surface.
//!
//! Two disjoint edits collapse into one hunk spanning both; that is an
//! accepted limitation for one-edit-per-update traffic.

/// Replacement of `from..to` (character offsets into the old document) with
/// `insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
	/// First replaced character.
	pub from: usize,
	/// One past the last replaced character.
	pub to: usize,
	/// Replacement text.
	pub insert: String,
}

/// UTF-16 view of a [`Patch`], the unit browser editors index by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf16Range {
	/// Start offset in UTF-16 code units.
	pub from: usize,
	/// End offset in UTF-16 code units.
	pub to: usize,
	/// Length of the whole base document in UTF-16 code units.
	pub base_len: usize,
}

/// Computes the single-hunk patch turning `old` into `new`.
///
/// Returns `None` when the documents are identical.
#[must_use]
pub fn compute_patch(old: &str, new: &str) -> Option<Patch> {
	let old: Vec<char> = old.chars().collect();
	let new: Vec<char> = new.chars().collect();

	let start = old.iter().zip(&new).take_while(|(a, b)| a == b).count();

	// Exclusive ends; the suffix scan never crosses `start` in either document.
	let mut end_old = old.len();
	let mut end_new = new.len();
	while end_old > start && end_new > start && old[end_old - 1] == new[end_new - 1] {
		end_old -= 1;
		end_new -= 1;
	}

	if start == end_old && start == end_new {
		return None;
	}

	Some(Patch {
		from: start,
		to: end_old,
		insert: new[start..end_new].iter().collect(),
	})
}

impl Patch {
	/// Applies the patch to `base`.
	///
	/// Offsets past the end of `base` are clamped.
	#[must_use]
	pub fn apply(&self, base: &str) -> String {
		let from = byte_offset(base, self.from);
		let to = byte_offset(base, self.to.max(self.from));
		let mut out = String::with_capacity(base.len() - (to - from) + self.insert.len());
		out.push_str(&base[..from]);
		out.push_str(&self.insert);
		out.push_str(&base[to..]);
		out
	}

	/// Number of replaced characters.
	#[must_use]
	pub fn replaced_len(&self) -> usize {
		self.to - self.from
	}

	/// Converts the range to UTF-16 code units against `base`.
	#[must_use]
	pub fn to_utf16(&self, base: &str) -> Utf16Range {
		Utf16Range {
			from: utf16_offset(base, self.from),
			to: utf16_offset(base, self.to),
			base_len: base.encode_utf16().count(),
		}
	}
}

/// Byte offset of character `chars` in `text`, clamped to its length.
fn byte_offset(text: &str, chars: usize) -> usize {
	text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}

/// UTF-16 offset of character `chars` in `text`, clamped to its length.
#[must_use]
pub fn utf16_offset(text: &str, chars: usize) -> usize {
	text.chars().take(chars).map(char::len_utf16).sum()
}
