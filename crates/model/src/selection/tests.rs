use pretty_assertions::assert_eq;

use super::*;
use crate::dev_utils::{get_data, set_data};
use crate::model::Model;
use crate::schema::ItemDefinition;

fn setup(markup: &str) -> (Model, NodeId) {
	let mut model = Model::new();
	let schema = model.schema_mut();
	schema.register("paragraph", ItemDefinition::new().inherit_all_from("$block")).unwrap();
	schema.register("image", ItemDefinition::new().inherit_all_from("$blockObject")).unwrap();
	schema
		.register("blockQuote", ItemDefinition::new().inherit_all_from("$container"))
		.unwrap();
	let root = model.create_root("$root", "main").unwrap();
	set_data(&mut model, "main", markup).unwrap();
	(model, root)
}

fn range(root: NodeId, start: &[usize], end: &[usize]) -> Range {
	Range::new(
		Position::new(root, start.iter().copied()),
		Position::new(root, end.iter().copied()),
	)
}

#[test]
fn focus_before_anchor_makes_selection_backward() {
	let root = NodeId(0, 0);
	let mut selection = Selection::collapsed(Position::new(root, [0, 2]));
	selection.set_focus(Position::new(root, [0, 0])).unwrap();
	assert!(selection.is_backward());
	assert_eq!(selection.anchor(), Some(Position::new(root, [0, 2])));
	assert_eq!(selection.focus(), Some(Position::new(root, [0, 0])));

	selection.set_focus(Position::new(root, [0, 3])).unwrap();
	assert!(!selection.is_backward());
	assert_eq!(selection.first_position(), Some(Position::new(root, [0, 2])));

	let mut empty = Selection::new();
	assert!(matches!(
		empty.set_focus(Position::new(root, [0])),
		Err(ModelError::SelectionNoAnchor)
	));
}

#[test]
fn intersecting_ranges_are_rejected() {
	let root = NodeId(0, 0);
	let mut selection = Selection::new();
	let result = selection.set_ranges(vec![range(root, &[0, 0], &[0, 3]), range(root, &[0, 2], &[0, 5])], false);
	assert!(matches!(result, Err(ModelError::SelectionRangeIntersects)));
	assert_eq!(selection.range_count(), 0);
}

#[test]
fn first_and_last_range_follow_document_order() {
	let root = NodeId(0, 0);
	let late = range(root, &[2, 0], &[2, 1]);
	let early = range(root, &[0, 0], &[0, 1]);
	let selection = Selection::from_selectable(
		&Tree::new(),
		Selectable::Ranges(vec![late.clone(), early.clone()]),
		false,
	)
	.unwrap();
	assert_eq!(selection.first_range(), Some(&early));
	assert_eq!(selection.last_range(), Some(&late));
	// Anchor and focus come from the last added range.
	assert_eq!(selection.anchor(), Some(late.start.clone()));
}

#[test]
fn selected_element_and_entire_content() {
	let (model, root) = setup("<paragraph>foo</paragraph><image></image>");
	let tree = model.document().tree();
	let image = tree.child(root, 1).unwrap();
	let on_image = Selection::from_selectable(tree, Selectable::On(image), false).unwrap();
	assert_eq!(on_image.selected_element(tree), Some(image));

	let paragraph = tree.child(root, 0).unwrap();
	let in_paragraph = Selection::from_selectable(tree, Selectable::In(paragraph), false).unwrap();
	assert_eq!(in_paragraph.selected_element(tree), None);
	assert!(in_paragraph.contains_entire_content(tree, paragraph));
	assert!(!in_paragraph.contains_entire_content(tree, root));
}

#[test]
fn selected_blocks_skip_a_block_only_touched_at_its_start() {
	let (model, root) = setup("<paragraph>ab</paragraph><paragraph>c</paragraph><paragraph>d</paragraph>");
	let tree = model.document().tree();
	let schema = model.schema();
	let blocks = |start: &[usize], end: &[usize]| {
		Selection::from_range(range(root, start, end), false).selected_blocks(tree, schema)
	};
	let p = |index| tree.child(root, index).unwrap();

	assert_eq!(blocks(&[0, 1], &[2, 0]), [p(0), p(1)]);
	assert_eq!(blocks(&[0, 2], &[1, 1]), [p(0), p(1)]);
	assert_eq!(blocks(&[1, 0], &[1, 0]), [p(1)]);
}

#[test]
fn selected_blocks_are_top_most() {
	let (model, root) = setup("<blockQuote><paragraph>a</paragraph><paragraph>b</paragraph></blockQuote>");
	let tree = model.document().tree();
	let quote = tree.child(root, 0).unwrap();
	let selection = Selection::from_range(range(root, &[0, 0, 0], &[0, 1, 1]), false);
	let blocks = selection.selected_blocks(tree, model.schema());
	assert_eq!(blocks, [tree.child(quote, 0).unwrap(), tree.child(quote, 1).unwrap()]);
}

#[test]
fn document_selection_defaults_to_the_nearest_selectable_place() {
	let (model, _) = setup("<paragraph>foo</paragraph><image></image>");
	assert!(!model.document().selection().has_own_range());
	assert_eq!(get_data(&model, "main").unwrap(), "<paragraph>[]foo</paragraph><image></image>");

	let (model, _) = setup("<image></image><paragraph>foo</paragraph>");
	assert_eq!(get_data(&model, "main").unwrap(), "[<image></image>]<paragraph>foo</paragraph>");
}

#[test]
fn document_selection_is_repaired_when_its_content_is_removed() {
	let (mut model, root) = setup("<paragraph>a</paragraph><paragraph>b[]c</paragraph>");
	model
		.change(|writer| {
			let second = writer.tree().child(root, 1).ok_or(ModelError::NodeNotFound)?;
			writer.remove(second)
		})
		.unwrap();
	let selection = model.document().selection();
	assert_ne!(selection.anchor().map(|p| p.root), Some(model.document().graveyard()));
	assert_eq!(get_data(&model, "main").unwrap(), "<paragraph>a[]</paragraph>");
}

#[test]
fn only_the_removed_range_is_repaired() {
	let (mut model, root) = setup("<paragraph>ab</paragraph><paragraph>cd</paragraph><paragraph>ef</paragraph>");
	let untouched = range(root, &[0, 0], &[0, 2]);
	model
		.change(|writer| {
			writer.set_selection(
				Selectable::Ranges(vec![untouched.clone(), range(root, &[2, 0], &[2, 2])]),
				false,
			)?;
			let third = writer.tree().child(root, 2).ok_or(ModelError::NodeNotFound)?;
			writer.remove(third)
		})
		.unwrap();

	let ranges: Vec<Range> = model.document().selection().ranges().cloned().collect();
	assert_eq!(ranges, vec![untouched, range(root, &[1, 2], &[1, 2])]);
}
