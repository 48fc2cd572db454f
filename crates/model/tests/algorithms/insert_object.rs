use folio_model::dev_utils::stringify;
use folio_model::{
	Attributes, InsertObjectOptions, InsertionPlace, ModelError, ObjectSelection, Position, Selection,
};
use pretty_assertions::assert_eq;

use crate::common::{data, model};

fn insert_object(markup: &str, name: &str, options: InsertObjectOptions) -> String {
	let mut model = model(markup);
	model
		.change(|writer| {
			let object = writer.create_element(name, Attributes::new());
			writer.insert_object(object, None, options)
		})
		.expect("object is inserted");
	data(&model)
}

#[test]
fn block_object_splits_the_paragraph() {
	assert_eq!(
		insert_object("<paragraph>fo[]o</paragraph>", "image", InsertObjectOptions::default()),
		"<paragraph>fo</paragraph>[<image></image>]<paragraph>o</paragraph>"
	);
}

#[test]
fn selection_goes_to_the_following_block() {
	let after = InsertObjectOptions {
		set_selection: Some(ObjectSelection::After),
		..InsertObjectOptions::default()
	};
	assert_eq!(
		insert_object("<paragraph>fo[]o</paragraph>", "image", after),
		"<paragraph>fo</paragraph><image></image><paragraph>[]o</paragraph>"
	);
}

#[test]
fn paragraph_is_added_after_a_trailing_object() {
	let after = InsertObjectOptions {
		set_selection: Some(ObjectSelection::After),
		..InsertObjectOptions::default()
	};
	assert_eq!(
		insert_object("<paragraph align=\"left\">foo[]</paragraph>", "image", after),
		"<paragraph align=\"left\">foo</paragraph><image align=\"left\"></image><paragraph align=\"left\">[]</paragraph>"
	);
}

#[test]
fn optimal_position_keeps_the_block_whole() {
	let options = InsertObjectOptions {
		find_optimal_position: Some(InsertionPlace::Auto),
		set_selection: Some(ObjectSelection::On),
	};
	assert_eq!(
		insert_object("<paragraph>fo[]o</paragraph>", "image", options),
		"[<image></image>]<paragraph>foo</paragraph>"
	);
}

#[test]
fn inline_object_is_wrapped_where_it_cannot_stand() {
	let mut model = model("<image></image>");
	let root = model.document().root("main").unwrap();
	let mut selection = Selection::collapsed(Position::new(root, [1]));
	model
		.change(|writer| {
			let object = writer.create_element("imageInline", Attributes::new());
			writer.insert_object(object, Some(&mut selection), InsertObjectOptions {
				set_selection: Some(ObjectSelection::On),
				..InsertObjectOptions::default()
			})
		})
		.unwrap();

	assert_eq!(
		stringify(model.document().tree(), root, selection.ranges()),
		"<image></image><paragraph>[<imageInline></imageInline>]</paragraph>"
	);
}

#[test]
fn non_objects_are_rejected() {
	let mut model = model("<paragraph>fo[]o</paragraph>");
	let result = model.change(|writer| {
		let paragraph = writer.create_element("paragraph", Attributes::new());
		writer.insert_object(paragraph, None, InsertObjectOptions::default())
	});
	assert!(matches!(result, Err(ModelError::NotAnObject(name)) if name == "paragraph"));
	assert_eq!(data(&model), "<paragraph>fo[]o</paragraph>");
}
