use folio_model::dev_utils::stringify;
use folio_model::{Attributes, DeleteContentOptions, Position, Range, Selection};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::{data, fragment, model};

fn insert_markup(markup: &str, content: &str) -> String {
	let mut model = model(markup);
	model
		.change(|writer| {
			let content = fragment(writer, content)?;
			writer.insert_content(content, None)
		})
		.expect("content is inserted");
	data(&model)
}

#[test]
fn text_joins_the_surrounding_text() {
	let mut model = model("<paragraph>fo[]o</paragraph>");
	let root = model.document().root("main").unwrap();
	let affected = model
		.change(|writer| {
			let text = writer.create_text("bar", Attributes::new());
			writer.insert_content(text, None)
		})
		.unwrap();

	assert_eq!(data(&model), "<paragraph>fobar[]o</paragraph>");
	assert_eq!(
		affected,
		Range::new(Position::new(root, [0, 2]), Position::new(root, [0, 5]))
	);
}

#[test]
fn pasted_paragraph_merges_into_the_caret_block() {
	assert_eq!(
		insert_markup("<paragraph>Foo[]</paragraph>", "<paragraph>Abc</paragraph>"),
		"<paragraph>FooAbc[]</paragraph>"
	);
	assert_eq!(
		insert_markup("<paragraph>fo[]o</paragraph>", "<paragraph>xyz</paragraph>"),
		"<paragraph>foxyz[]o</paragraph>"
	);
}

#[test]
fn several_blocks_split_the_caret_block() {
	assert_eq!(
		insert_markup(
			"<paragraph>fo[]o</paragraph>",
			"<paragraph>x</paragraph><heading1>y</heading1><paragraph>z</paragraph>"
		),
		"<paragraph>fox</paragraph><heading1>y</heading1><paragraph>z[]o</paragraph>"
	);
}

#[test]
fn block_object_splits_the_paragraph() {
	let mut model = model("<paragraph>x[]y</paragraph>");
	model
		.change(|writer| {
			let image = writer.create_element("image", Attributes::new());
			writer.insert_content(image, None)
		})
		.unwrap();
	assert_eq!(
		data(&model),
		"<paragraph>x</paragraph>[<image></image>]<paragraph>y</paragraph>"
	);
}

#[test]
fn selected_content_is_replaced() {
	assert_eq!(
		insert_markup("<paragraph>[foo]</paragraph>", "bar"),
		"<paragraph>bar[]</paragraph>"
	);
	assert_eq!(
		insert_markup("<paragraph>a[b</paragraph><paragraph>c]d</paragraph>", "x"),
		"<paragraph>ax[]d</paragraph>"
	);
}

#[test]
fn text_where_only_blocks_fit_is_wrapped_in_a_paragraph() {
	let mut model = model("<image></image>");
	let root = model.document().root("main").unwrap();
	let mut selection = Selection::collapsed(Position::new(root, [1]));
	let affected = model
		.change(|writer| {
			let text = writer.create_text("foo", Attributes::new());
			writer.insert_content(text, Some(&mut selection))
		})
		.unwrap();

	let tree = model.document().tree();
	assert_eq!(
		stringify(tree, root, selection.ranges()),
		"<image></image><paragraph>foo[]</paragraph>"
	);
	assert_eq!(affected, Range::new(Position::new(root, [1]), Position::new(root, [2])));
}

#[test]
fn disallowed_elements_are_unwrapped() {
	assert_eq!(
		insert_markup("<paragraph>fo[]o</paragraph>", "<tableCell><paragraph>x</paragraph></tableCell>"),
		"<paragraph>fox[]o</paragraph>"
	);
}

#[test]
fn disallowed_attributes_are_dropped() {
	assert_eq!(
		insert_markup("<paragraph>fo[]o</paragraph>", "<$text underline=\"true\">x</$text>"),
		"<paragraph>fox[]o</paragraph>"
	);
}

#[test]
fn merged_block_keeps_the_caret_block_type() {
	assert_eq!(
		insert_markup("<heading1>fo[]o</heading1>", "<paragraph align=\"left\">x</paragraph>"),
		"<heading1>fox[]o</heading1>"
	);
}

#[test]
fn attributed_text_keeps_its_attributes() {
	assert_eq!(
		insert_markup("<paragraph>fo[]o</paragraph>", "<$text bold=\"true\">x</$text>"),
		"<paragraph>fo<$text bold=\"true\">x</$text>[]o</paragraph>"
	);
}

#[test]
fn fragment_markers_become_document_markers() {
	let mut model = model("<paragraph>fo[]o</paragraph>");
	let root = model.document().root("main").unwrap();
	model
		.change(|writer| {
			let content = fragment(writer, "xyz")?;
			let marked = Range::new(Position::new(content, [1]), Position::new(content, [2]));
			writer.add_fragment_marker("comment", marked)?;
			writer.insert_content(content, None)
		})
		.unwrap();

	assert_eq!(data(&model), "<paragraph>foxyz[]o</paragraph>");
	let marker = model.document().markers().get("comment").expect("marker is restored");
	assert!(marker.managed_using_operations());
	assert_eq!(
		marker.range(),
		&Range::new(Position::new(root, [0, 3]), Position::new(root, [0, 4]))
	);
}

/// Inserts `content` at `at`, deletes the returned affected range and
/// returns the content before and after that round trip.
fn insert_then_delete_affected(markup: &str, at: &[usize], content: &str) -> (String, String) {
	let mut model = model(markup);
	let root = model.document().root("main").unwrap();
	let before = stringify(model.document().tree(), root, &[]);
	let mut selection = Selection::collapsed(Position::new(root, at.iter().copied()));
	let affected = model
		.change(|writer| {
			let content = fragment(writer, content)?;
			writer.insert_content(content, Some(&mut selection))
		})
		.expect("content is inserted");

	let mut inserted = Selection::from_range(affected, false);
	model
		.delete_content(Some(&mut inserted), DeleteContentOptions {
			do_not_autoparagraph: true,
			do_not_reset_entire_content: true,
			..DeleteContentOptions::default()
		})
		.expect("affected range is deleted");
	(before, stringify(model.document().tree(), root, &[]))
}

#[test]
fn deleting_the_affected_range_restores_the_document() {
	let cases: [(&str, &[usize], &str); 6] = [
		("<paragraph>foo</paragraph>", &[0, 2], "bar"),
		("<paragraph>foo</paragraph>", &[0, 2], "<$text bold=\"true\">x</$text>"),
		("<paragraph>Foo</paragraph>", &[0, 3], "<paragraph>Abc</paragraph>"),
		("<paragraph>foo</paragraph>", &[0, 2], "<paragraph>xyz</paragraph>"),
		(
			"<paragraph>foo</paragraph>",
			&[0, 2],
			"<paragraph>x</paragraph><heading1>y</heading1><paragraph>z</paragraph>",
		),
		("<image></image>", &[1], "foo"),
	];
	for (markup, at, content) in cases {
		let (before, after) = insert_then_delete_affected(markup, at, content);
		assert_eq!(after, before, "inserting {content} into {markup}");
	}
}

proptest! {
	#[test]
	fn affected_range_covers_exactly_the_insertion(
		offset in 0usize..=6,
		text in "[a-z]{1,4}",
		wrapped in any::<bool>(),
	) {
		let content = if wrapped { format!("<paragraph>{text}</paragraph>") } else { text };
		let (before, after) = insert_then_delete_affected("<paragraph>abcdef</paragraph>", &[0, offset], &content);
		prop_assert_eq!(after, before);
	}
}
