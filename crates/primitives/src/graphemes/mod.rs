use unicode_segmentation::UnicodeSegmentation;

/// Returns whether `c` is a combining mark from one of the combining
/// diacritical blocks.
pub fn is_combining_mark(c: char) -> bool {
	matches!(
		c as u32,
		0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
	)
}

/// Returns whether char offset `offset` splits a base character from the
/// combining mark that follows it.
pub fn is_inside_combined_symbol(text: &str, offset: usize) -> bool {
	if offset == 0 {
		return false;
	}
	text.chars().nth(offset).is_some_and(is_combining_mark)
}

/// Returns whether char offset `offset` falls inside a multi-scalar emoji
/// cluster (ZWJ sequences, flags, skin tone modifiers, keycaps).
pub fn is_inside_emoji_sequence(text: &str, offset: usize) -> bool {
	if offset == 0 {
		return false;
	}
	let mut start = 0;
	for grapheme in text.graphemes(true) {
		let len = grapheme.chars().count();
		if offset > start && offset < start + len {
			return is_emoji_cluster(grapheme);
		}
		start += len;
		if start >= offset {
			break;
		}
	}
	false
}

fn is_emoji_cluster(grapheme: &str) -> bool {
	grapheme.chars().any(|c| {
		matches!(
			c as u32,
			0x200D | 0xFE0F | 0x20E3 | 0x1F1E6..=0x1F1FF | 0x1F300..=0x1FAFF | 0x2600..=0x27BF
		)
	})
}
