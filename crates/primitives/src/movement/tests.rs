use super::*;

#[test]
fn default_boundaries() {
	for c in [' ', ',', '.', '?', '!', ':', ';', '"', '-', '(', ')'] {
		assert!(is_word_boundary(c, DEFAULT_WORD_BOUNDARIES), "{c:?}");
	}
	assert!(!is_word_boundary('a', DEFAULT_WORD_BOUNDARIES));
	assert!(!is_word_boundary('_', DEFAULT_WORD_BOUNDARIES));
}

#[test]
fn character_unit_skips_combining_marks() {
	let text = "e\u{0301}";
	assert!(!is_valid_stop(text, 1, TextUnit::Character, false));
	assert!(is_valid_stop(text, 1, TextUnit::CodePoint, false));
	assert!(is_valid_stop(text, 2, TextUnit::Character, false));
}

#[test]
fn emoji_stops_depend_on_configuration() {
	let text = "\u{1F469}\u{200D}\u{1F4BB}";
	assert!(is_valid_stop(text, 1, TextUnit::Character, false));
	assert!(!is_valid_stop(text, 1, TextUnit::Character, true));
}

#[test]
fn word_boundary_lookup_by_direction() {
	let text = "foo bar";
	assert!(is_at_word_boundary(text, 3, true, DEFAULT_WORD_BOUNDARIES));
	assert!(!is_at_word_boundary(text, 3, false, DEFAULT_WORD_BOUNDARIES));
	assert!(is_at_word_boundary(text, 4, false, DEFAULT_WORD_BOUNDARIES));
	assert!(!is_at_word_boundary(text, 7, true, DEFAULT_WORD_BOUNDARIES));
}
