use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::dev_utils::{get_data, set_data};
use crate::schema::ItemDefinition;
use crate::selection::store_attribute_key;

fn model() -> (Model, NodeId) {
	let mut model = Model::new();
	let schema = model.schema_mut();
	schema.register("paragraph", ItemDefinition::new().inherit_all_from("$block")).unwrap();
	schema.extend("$text", ItemDefinition::new().allow_attributes(&["bold"])).unwrap();
	let root = model.create_root("$root", "main").unwrap();
	(model, root)
}

fn marker_options(range: Range, using_operation: bool) -> MarkerOptions {
	MarkerOptions {
		range: Some(range),
		using_operation: Some(using_operation),
		affects_data: None,
	}
}

#[test]
fn split_and_merge_carry_the_selection() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph>foo[]</paragraph>").unwrap();

	model
		.change(|writer| writer.split(Position::new(root, [0, 1]), None).map(drop))
		.unwrap();
	assert_eq!(get_data(&model, "main").unwrap(), "<paragraph>f</paragraph><paragraph>oo[]</paragraph>");

	model.change(|writer| writer.merge(Position::new(root, [1]))).unwrap();
	assert_eq!(get_data(&model, "main").unwrap(), "<paragraph>foo[]</paragraph>");
}

#[test]
fn every_change_bumps_the_version() {
	let (mut model, root) = model();
	let before = model.document().version();
	model
		.change(|writer| {
			let paragraph = writer.insert_element("paragraph", Attributes::new(), Position::new(root, [0]))?;
			writer.append_text("ab", Attributes::new(), paragraph)?;
			writer.set_attribute("bold", json!(true), Range::new(Position::new(root, [0, 0]), Position::new(root, [0, 1])))
		})
		.unwrap();
	assert_eq!(model.document().version(), before + 3);
	assert_eq!(get_data(&model, "main").unwrap(), "<paragraph><$text bold=\"true\">a</$text>b</paragraph>");
}

#[test]
fn add_marker_requires_explicit_management() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph>foobar</paragraph>").unwrap();
	let range = Range::new(Position::new(root, [0, 1]), Position::new(root, [0, 3]));

	let missing = model.change(|writer| {
		writer.add_marker("comment", MarkerOptions {
			range: Some(range.clone()),
			..MarkerOptions::default()
		})
	});
	assert!(matches!(missing, Err(ModelError::MarkerWrongOptions(_))));

	model
		.change(|writer| writer.add_marker("comment", marker_options(range.clone(), true)))
		.unwrap();
	let duplicate = model.change(|writer| writer.add_marker("comment", marker_options(range.clone(), true)));
	assert!(matches!(duplicate, Err(ModelError::MarkerExists(_))));
}

#[test]
fn managed_marker_follows_content() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph>foobar</paragraph>").unwrap();
	let range = Range::new(Position::new(root, [0, 1]), Position::new(root, [0, 3]));
	model
		.change(|writer| writer.add_marker("comment", marker_options(range, true)))
		.unwrap();

	model
		.change(|writer| writer.insert_text("xx", Attributes::new(), Position::new(root, [0, 0])).map(drop))
		.unwrap();

	let marker = model.document().markers().get("comment").unwrap();
	assert!(marker.managed_using_operations());
	assert_eq!(
		marker.range(),
		&Range::new(Position::new(root, [0, 3]), Position::new(root, [0, 5]))
	);
}

#[test]
fn update_marker_switches_management() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph>foobar</paragraph>").unwrap();
	let range = Range::new(Position::new(root, [0, 0]), Position::new(root, [0, 2]));
	model
		.change(|writer| writer.add_marker("search", marker_options(range, false)))
		.unwrap();
	let version = model.document().version();

	model
		.change(|writer| {
			writer.update_marker("search", Some(MarkerOptions {
				using_operation: Some(true),
				..MarkerOptions::default()
			}))
		})
		.unwrap();
	assert!(model.document().markers().get("search").unwrap().managed_using_operations());
	assert_eq!(model.document().version(), version + 1);

	let empty = model.change(|writer| writer.update_marker("search", Some(MarkerOptions::default())));
	assert!(matches!(empty, Err(ModelError::MarkerWrongOptions(_))));
	let unknown = model.change(|writer| writer.update_marker("nope", None));
	assert!(matches!(unknown, Err(ModelError::MarkerNotFound(_))));
}

#[test]
fn remove_marker() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph>foobar</paragraph>").unwrap();
	let range = Range::new(Position::new(root, [0, 0]), Position::new(root, [0, 2]));
	model
		.change(|writer| {
			writer.add_marker("a", marker_options(range.clone(), true))?;
			writer.add_marker("b", marker_options(range.clone(), false))
		})
		.unwrap();

	model
		.change(|writer| {
			writer.remove_marker("a")?;
			writer.remove_marker("b")
		})
		.unwrap();
	assert!(model.document().markers().is_empty());
	assert!(matches!(
		model.change(|writer| writer.remove_marker("a")),
		Err(ModelError::MarkerNotFound(_))
	));
}

#[test]
fn roots_are_added_and_detached() {
	let (mut model, _) = model();
	let extra = model.change(|writer| writer.add_root("extra", "$root")).unwrap();
	assert!(model.document().is_attached(extra));
	assert!(matches!(
		model.change(|writer| writer.add_root("extra", "$root")),
		Err(ModelError::RootExists(_))
	));

	set_data(&mut model, "extra", "<paragraph>gone</paragraph>").unwrap();
	model.change(|writer| writer.detach_root("extra")).unwrap();
	assert!(!model.document().is_attached(extra));
	assert!(model.document().tree().is_empty(extra));
	assert!(matches!(
		model.change(|writer| writer.detach_root("nope")),
		Err(ModelError::RootNotFound(_))
	));
}

#[test]
fn selection_attribute_is_stored_in_empty_block() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph>[]</paragraph>").unwrap();
	model
		.change(|writer| writer.set_selection_attribute("bold", json!(true)))
		.unwrap();

	let paragraph = model.document().tree().child(root, 0).unwrap();
	let stored = store_attribute_key("bold");
	assert_eq!(model.document().tree().attrs(paragraph).get(&stored), Some(&json!(true)));
	assert!(model.document().selection().has_attribute("bold"));

	model.change(|writer| writer.remove_selection_attribute("bold")).unwrap();
	assert!(!model.document().tree().has_attr(paragraph, &stored));
	assert!(!model.document().selection().has_attribute("bold"));
}

#[test]
fn gravity_override_round_trip() {
	let (mut model, _) = model();
	set_data(&mut model, "main", "<paragraph><$text bold=\"true\">foo</$text>[]</paragraph>").unwrap();
	assert!(model.document().selection().has_attribute("bold"));

	let token = model.change(|writer| writer.override_selection_gravity()).unwrap();
	assert!(model.document().selection().is_gravity_overridden());
	assert!(!model.document().selection().has_attribute("bold"));

	model
		.change(|writer| writer.restore_selection_gravity(token))
		.unwrap();
	assert!(!model.document().selection().is_gravity_overridden());
	assert!(model.document().selection().has_attribute("bold"));
	assert!(matches!(
		model.change(|writer| writer.restore_selection_gravity(token)),
		Err(ModelError::UnknownGravityToken)
	));
}

#[test]
fn gravity_stays_overridden_until_every_token_is_restored() {
	let (mut model, _) = model();
	set_data(&mut model, "main", "<paragraph>foo[]</paragraph>").unwrap();

	let first = model.change(|writer| writer.override_selection_gravity()).unwrap();
	let second = model.change(|writer| writer.override_selection_gravity()).unwrap();
	assert_ne!(first, second);

	model.change(|writer| writer.restore_selection_gravity(first)).unwrap();
	assert!(model.document().selection().is_gravity_overridden());

	model.change(|writer| writer.restore_selection_gravity(second)).unwrap();
	assert!(!model.document().selection().is_gravity_overridden());
}

#[test]
fn split_records_markers_crossing_the_split_point() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph>foobar</paragraph>").unwrap();
	let range = Range::new(Position::new(root, [0, 1]), Position::new(root, [0, 5]));
	model
		.change(|writer| writer.add_marker("comment", marker_options(range, true)))
		.unwrap();

	model
		.change(|writer| writer.split(Position::new(root, [0, 3]), None).map(drop))
		.unwrap();

	let operations = model.last_batch().unwrap().operations();
	assert!(matches!(operations.first(), Some(Operation::Marker(m)) if m.name == "comment"));
	assert!(operations.iter().any(|op| matches!(op, Operation::Split(_))));
	assert_eq!(
		model.document().markers().get("comment").unwrap().range(),
		&Range::new(Position::new(root, [0, 1]), Position::new(root, [1, 2]))
	);
}

#[test]
fn split_outside_markers_adds_no_marker_operation() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph>foobar</paragraph>").unwrap();
	let range = Range::new(Position::new(root, [0, 0]), Position::new(root, [0, 2]));
	model
		.change(|writer| writer.add_marker("comment", marker_options(range, true)))
		.unwrap();

	model
		.change(|writer| writer.split(Position::new(root, [0, 4]), None).map(drop))
		.unwrap();

	let operations = model.last_batch().unwrap().operations();
	assert!(!operations.iter().any(|op| matches!(op, Operation::Marker(_))));
}

#[test]
fn explicit_attribute_removal_outlives_document_changes() {
	let (mut model, root) = model();
	set_data(&mut model, "main", "<paragraph><$text bold=\"true\">foo</$text>[]bar</paragraph>").unwrap();
	assert!(model.document().selection().has_attribute("bold"));

	model.change(|writer| writer.remove_selection_attribute("bold")).unwrap();
	assert!(!model.document().selection().has_attribute("bold"));

	model
		.change(|writer| writer.insert_text("x", Attributes::new(), Position::new(root, [0, 6])).map(drop))
		.unwrap();
	assert!(!model.document().selection().has_attribute("bold"));
	assert!(model.document().selection().attrs().is_empty());

	model
		.change(|writer| writer.set_selection(Selectable::Position(Position::new(root, [0, 3])), false))
		.unwrap();
	assert_eq!(model.document().selection().attribute("bold"), Some(&json!(true)));
}
