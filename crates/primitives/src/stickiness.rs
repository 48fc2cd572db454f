use serde::{Deserialize, Serialize};

/// Decides which side a position attaches to when content is inserted
/// exactly at it.
///
/// A position sticking to the previous node stays in front of content
/// inserted at its offset. A position sticking to the next node (or to
/// none) is pushed behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stickiness {
	#[default]
	#[serde(rename = "toNone")]
	ToNone,
	#[serde(rename = "toPrevious")]
	ToPrevious,
	#[serde(rename = "toNext")]
	ToNext,
}

impl Stickiness {
	/// Returns whether an insertion at this exact offset pushes the position.
	#[inline]
	pub fn moves_with_insertion(self) -> bool {
		!matches!(self, Self::ToPrevious)
	}
}
