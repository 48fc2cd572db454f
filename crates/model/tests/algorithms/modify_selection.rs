use folio_model::{Direction, ModifySelectionOptions, TextUnit};
use pretty_assertions::assert_eq;

use crate::common::{data, model};

fn modify(markup: &str, direction: Direction, unit: TextUnit) -> String {
	let mut model = model(markup);
	model
		.modify_selection(None, ModifySelectionOptions {
			direction,
			unit,
			..ModifySelectionOptions::default()
		})
		.expect("selection is modified");
	data(&model)
}

#[test]
fn character_extends_the_selection() {
	assert_eq!(
		modify("<paragraph>f[]oo</paragraph>", Direction::Forward, TextUnit::Character),
		"<paragraph>f[o]o</paragraph>"
	);
	assert_eq!(
		modify("<paragraph>fo[]o</paragraph>", Direction::Backward, TextUnit::Character),
		"<paragraph>f[o]o</paragraph>"
	);
}

#[test]
fn word_stops_at_the_next_boundary() {
	assert_eq!(
		modify("<paragraph>f[]oo bar</paragraph>", Direction::Forward, TextUnit::Word),
		"<paragraph>f[oo] bar</paragraph>"
	);
	assert_eq!(
		modify("<paragraph>foo ba[]r</paragraph>", Direction::Backward, TextUnit::Word),
		"<paragraph>foo [ba]r</paragraph>"
	);
}

#[test]
fn combining_marks_stay_with_their_base() {
	assert_eq!(
		modify("<paragraph>[]e\u{301}x</paragraph>", Direction::Forward, TextUnit::Character),
		"<paragraph>[e\u{301}]x</paragraph>"
	);
	assert_eq!(
		modify("<paragraph>[]e\u{301}x</paragraph>", Direction::Forward, TextUnit::CodePoint),
		"<paragraph>[e]\u{301}x</paragraph>"
	);
}

#[test]
fn focus_enters_the_next_block() {
	assert_eq!(
		modify(
			"<paragraph>foo[]</paragraph><paragraph>bar</paragraph>",
			Direction::Forward,
			TextUnit::Character
		),
		"<paragraph>foo[</paragraph><paragraph>]bar</paragraph>"
	);
}

#[test]
fn objects_are_selected_whole() {
	assert_eq!(
		modify("<paragraph>foo[]</paragraph><image></image>", Direction::Forward, TextUnit::Character),
		"<paragraph>foo[</paragraph><image></image>]"
	);
	assert_eq!(
		modify("<image></image><paragraph>[]foo</paragraph>", Direction::Backward, TextUnit::Character),
		"[<image></image><paragraph>]foo</paragraph>"
	);
}

#[test]
fn limit_elements_are_not_left() {
	let markup = "<table><tableCell><paragraph>a[]</paragraph></tableCell></table>";
	assert_eq!(modify(markup, Direction::Forward, TextUnit::Character), markup);
}
