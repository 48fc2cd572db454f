use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::dev_utils::{get_data, set_data};
use crate::error::ModelError;
use crate::node::Attributes;
use crate::position::Position;
use crate::schema::ItemDefinition;
use crate::selection::store_attribute_key;
use crate::writer::MarkerOptions;

fn model() -> (Model, NodeId) {
	let mut model = Model::new();
	let schema = model.schema_mut();
	schema.register("paragraph", ItemDefinition::new().inherit_all_from("$block")).unwrap();
	schema.register("image", ItemDefinition::new().inherit_all_from("$blockObject")).unwrap();
	let root = model.create_root("$root", "main").unwrap();
	(model, root)
}

#[test]
fn nested_changes_share_a_batch() {
	let (mut model, root) = model();
	model
		.change(|writer| {
			writer.insert_element("paragraph", Attributes::new(), Position::new(root, [0]))?;
			writer.change(|inner| inner.insert_element("paragraph", Attributes::new(), Position::new(root, [1])))?;
			Ok(())
		})
		.unwrap();
	assert_eq!(model.last_batch().unwrap().operations().len(), 2);
}

#[test]
fn enqueued_changes_run_after_the_current_block() {
	let (mut model, root) = model();
	let log = Rc::new(RefCell::new(Vec::new()));

	let outer = Rc::clone(&log);
	model
		.change(|writer| {
			let queued = Rc::clone(&outer);
			writer.enqueue_change(BatchKind::Default, move |writer| {
				queued.borrow_mut().push("queued");
				writer
					.insert_element("paragraph", Attributes::new(), Position::new(root, [0]))
					.map(drop)
			})?;
			outer.borrow_mut().push("outer");
			Ok(())
		})
		.unwrap();

	assert_eq!(*log.borrow(), ["outer", "queued"]);
	assert_eq!(model.document().tree().child_count(root), 1);
}

#[test]
fn failed_change_keeps_applied_operations_and_drops_the_queue() {
	let (mut model, root) = model();
	let ran = Rc::new(RefCell::new(false));
	let flag = Rc::clone(&ran);
	let result = model.change(|writer| {
		writer.insert_element("paragraph", Attributes::new(), Position::new(root, [0]))?;
		writer.enqueue_change(BatchKind::Default, move |_| {
			*flag.borrow_mut() = true;
			Ok(())
		})?;
		writer.merge(Position::new(root, [0]))
	});

	assert!(matches!(result, Err(ModelError::MergeNoElementBefore)));
	assert_eq!(model.document().tree().child_count(root), 1);
	assert!(!*ran.borrow());
}

#[test]
fn post_fixer_reruns_until_stable() {
	let (mut model, root) = model();
	let calls = Rc::new(RefCell::new(0));
	let counter = Rc::clone(&calls);
	model.register_post_fixer(move |writer| {
		*counter.borrow_mut() += 1;
		let root = writer.document().root("main").ok_or(ModelError::RootNotFound("main".into()))?;
		if !writer.tree().is_empty(root) {
			return Ok(false);
		}
		writer.insert_element("paragraph", Attributes::new(), Position::new(root, [0]))?;
		Ok(true)
	});

	set_data(&mut model, "main", "<paragraph>x</paragraph>").unwrap();
	*calls.borrow_mut() = 0;
	model.change(|writer| writer.remove(Range::in_element(writer.tree(), root))).unwrap();

	assert_eq!(get_data(&model, "main").unwrap(), "<paragraph>[]</paragraph>");
	assert_eq!(*calls.borrow(), 2);
}

#[test]
fn stored_selection_attributes_are_cleared_once_content_arrives() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph>[]</paragraph>").unwrap();
	model
		.change(|writer| writer.set_selection_attribute("bold", json!(true)))
		.unwrap();
	let paragraph = model.document().tree().child(root, 0).unwrap();
	assert!(model.document().tree().has_attr(paragraph, &store_attribute_key("bold")));

	model
		.change(|writer| writer.insert_text("a", Attributes::new(), Position::new(root, [0, 0])).map(drop))
		.unwrap();
	assert!(!model.document().tree().has_attr(paragraph, &store_attribute_key("bold")));
}

#[test]
fn has_content() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph></paragraph><paragraph>  </paragraph><image></image>").unwrap();
	let tree = model.document().tree();
	let empty = tree.child(root, 0).unwrap();
	let spaces = tree.child(root, 1).unwrap();
	let image_range = Range::on_node(tree, tree.child(root, 2).unwrap()).unwrap();

	assert!(!model.has_content(ContentTarget::Element(empty), HasContentOptions::default()));
	assert!(model.has_content(ContentTarget::Element(spaces), HasContentOptions::default()));
	let ignore_whitespaces = HasContentOptions {
		ignore_whitespaces: true,
		..HasContentOptions::default()
	};
	assert!(!model.has_content(ContentTarget::Element(spaces), ignore_whitespaces));
	assert!(model.has_content(ContentTarget::Range(image_range), HasContentOptions::default()));

	let inside_empty = Range::new(Position::new(root, [0, 0]), Position::new(root, [1, 0]));
	assert!(!model.has_content(ContentTarget::Range(inside_empty.clone()), HasContentOptions::default()));
	model
		.change(|writer| {
			writer.add_marker("comment", MarkerOptions {
				range: Some(inside_empty.clone()),
				using_operation: Some(true),
				affects_data: Some(true),
			})
		})
		.unwrap();
	assert!(model.has_content(ContentTarget::Range(inside_empty.clone()), HasContentOptions::default()));
	let ignore_markers = HasContentOptions {
		ignore_markers: true,
		..HasContentOptions::default()
	};
	assert!(!model.has_content(ContentTarget::Range(inside_empty), ignore_markers));
}
