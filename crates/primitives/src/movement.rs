//! Caret stepping helpers inside a single text run.

use serde::{Deserialize, Serialize};

use crate::graphemes::{is_inside_combined_symbol, is_inside_emoji_sequence};

/// Characters that end a word when the caret moves by words.
pub const DEFAULT_WORD_BOUNDARIES: &str = " ,.?!:;\"-()";

/// Unit by which a selection focus is moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextUnit {
	/// A user-perceived character: never stops inside a combining cluster.
	#[default]
	Character,
	/// A single scalar value.
	CodePoint,
	/// Runs up to the next boundary character.
	Word,
}

/// Returns whether `c` ends a word.
#[inline]
pub fn is_word_boundary(c: char, boundaries: &str) -> bool {
	boundaries.contains(c)
}

/// Returns whether a caret may rest at char `offset` of `text` when moving
/// by `unit`.
///
/// Offsets at the very start or end of a run are always accepted.
pub fn is_valid_stop(text: &str, offset: usize, unit: TextUnit, treat_emoji_as_single_unit: bool) -> bool {
	match unit {
		TextUnit::CodePoint | TextUnit::Word => true,
		TextUnit::Character => {
			if is_inside_combined_symbol(text, offset) {
				return false;
			}
			!(treat_emoji_as_single_unit && is_inside_emoji_sequence(text, offset))
		}
	}
}

/// Returns whether `offset` in `text` sits right at a word boundary when
/// looking in the walk direction.
///
/// Forward walks test the character at `offset`; backward walks test the
/// character just before it.
pub fn is_at_word_boundary(text: &str, offset: usize, forward: bool, boundaries: &str) -> bool {
	let probe = if forward {
		text.chars().nth(offset)
	} else {
		offset.checked_sub(1).and_then(|i| text.chars().nth(i))
	};
	probe.is_some_and(|c| is_word_boundary(c, boundaries))
}

#[cfg(test)]
mod tests;
