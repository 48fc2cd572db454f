use proptest::prelude::*;
use serde_json::json;

use super::*;
use crate::error::ModelError;
use crate::node::{Attributes, Tree};

struct Roots {
	main: NodeId,
	graveyard: NodeId,
}

impl RootNames for Roots {
	fn root_name(&self, root: NodeId) -> Option<&str> {
		if root == self.main {
			Some("main")
		} else if root == self.graveyard {
			Some("$graveyard")
		} else {
			None
		}
	}

	fn root_by_name(&self, name: &str) -> Option<NodeId> {
		match name {
			"main" => Some(self.main),
			"$graveyard" => Some(self.graveyard),
			_ => None,
		}
	}
}

fn setup(text: &str) -> (Tree, Roots) {
	let mut tree = Tree::new();
	let main = tree.create_element("$root", Attributes::new());
	let graveyard = tree.create_element("$graveyard", Attributes::new());
	let p = tree.create_element("paragraph", Attributes::new());
	let t = tree.create_text(text, Attributes::new());
	tree.append(p, &[t]).unwrap();
	tree.append(main, &[p]).unwrap();
	(tree, Roots { main, graveyard })
}

const PARAGRAPHS: [&str; 3] = ["abcdefgh", "ijklmn", "xyz"];

/// Three paragraphs: two the operations act on and an untouched third.
fn setup_paragraphs() -> (Tree, Roots) {
	let mut tree = Tree::new();
	let main = tree.create_element("$root", Attributes::new());
	let graveyard = tree.create_element("$graveyard", Attributes::new());
	for text in PARAGRAPHS {
		let p = tree.create_element("paragraph", Attributes::new());
		let t = tree.create_text(text, Attributes::new());
		tree.append(p, &[t]).unwrap();
		tree.append(main, &[p]).unwrap();
	}
	(tree, Roots { main, graveyard })
}

#[derive(Debug, Clone)]
enum Case {
	Move { start: usize, count: usize, target: usize },
	Split { at: usize },
	Merge,
	Rename,
	Attribute { start: usize, end: usize },
}

fn cases() -> impl Strategy<Value = Case> {
	let first = PARAGRAPHS[0].len();
	let second = PARAGRAPHS[1].len();
	prop_oneof![
		(0..first, 1..=first, 0..=second).prop_map(move |(start, count, target)| Case::Move {
			start,
			count: count.min(first - start),
			target,
		}),
		(0..=first).prop_map(|at| Case::Split { at }),
		Just(Case::Merge),
		Just(Case::Rename),
		(0..first, 1..=first).prop_map(move |(start, len)| Case::Attribute {
			start,
			end: (start + len).min(first),
		}),
	]
}

impl Case {
	fn operation(&self, roots: &Roots) -> Operation {
		let main = roots.main;
		match *self {
			Self::Move { start, count, target } => Operation::Move(MoveOperation {
				source_position: Position::new(main, [0, start]),
				how_many: count,
				target_position: Position::new(main, [1, target]),
				base_version: Some(0),
			}),
			Self::Split { at } => {
				let split_position = Position::new(main, [0, at]);
				Operation::Split(SplitOperation {
					insertion_position: SplitOperation::insertion_position_for(&split_position),
					split_position,
					how_many: PARAGRAPHS[0].len() - at,
					graveyard_position: None,
					base_version: Some(0),
				})
			}
			Self::Merge => Operation::Merge(MergeOperation {
				source_position: Position::new(main, [1, 0]),
				how_many: PARAGRAPHS[1].len(),
				target_position: Position::new(main, [0, PARAGRAPHS[0].len()]),
				graveyard_position: Position::new(roots.graveyard, [0]),
				base_version: Some(0),
			}),
			Self::Rename => Operation::Rename(RenameOperation {
				position: Position::new(main, [0]),
				old_name: "paragraph".into(),
				new_name: "heading".into(),
				base_version: Some(0),
			}),
			Self::Attribute { start, end } => Operation::Attribute(AttributeOperation {
				range: Range::new(Position::new(main, [0, start]), Position::new(main, [0, end])),
				key: "bold".into(),
				old_value: None,
				new_value: Some(json!(true)),
				base_version: Some(0),
			}),
		}
	}

	/// Offsets where the operation and its reverse disagree on which side
	/// a position belongs to.
	fn is_edge(&self, paragraph: usize, offset: usize) -> bool {
		match *self {
			Self::Move { start, target, .. } => (paragraph, offset) == (0, start) || (paragraph, offset) == (1, target),
			Self::Split { at } => paragraph == 0 && (offset == at || offset == PARAGRAPHS[0].len()),
			Self::Merge => {
				(paragraph, offset) == (0, PARAGRAPHS[0].len())
					|| (paragraph == 1 && (offset == 0 || offset == PARAGRAPHS[1].len()))
			}
			Self::Rename | Self::Attribute { .. } => false,
		}
	}
}

fn apply(tree: &mut Tree, op: &Operation) {
	let mut op = op.clone();
	op.execute_on_tree(tree).unwrap();
}

#[test]
fn insert_is_undone_by_its_reverse() {
	let (mut tree, roots) = setup("foo");
	let before = tree.snapshot(roots.main).unwrap();
	let insert = Operation::Insert(InsertOperation::new(
		Position::new(roots.main, [0, 1]),
		vec![NodeSnapshot::Text {
			data: "xyz".into(),
			attributes: Attributes::new(),
		}],
		Some(0),
	));
	apply(&mut tree, &insert);
	assert_eq!(tree.text_content(roots.main), "fxyzoo");

	let reverse = insert.reversed(roots.graveyard);
	assert_eq!(reverse.kind(roots.graveyard), OperationKind::Remove);
	assert_eq!(reverse.base_version(), Some(1));
	apply(&mut tree, &reverse);
	assert_eq!(tree.snapshot(roots.main).unwrap(), before);
	assert_eq!(tree.text_content(roots.graveyard), "xyz");
}

#[test]
fn split_and_merge_are_inverse() {
	let (mut tree, roots) = setup("foobar");
	let before = tree.snapshot(roots.main).unwrap();
	let split_position = Position::new(roots.main, [0, 3]);
	let split = Operation::Split(SplitOperation {
		insertion_position: SplitOperation::insertion_position_for(&split_position),
		split_position,
		how_many: 3,
		graveyard_position: None,
		base_version: Some(0),
	});
	apply(&mut tree, &split);
	assert_eq!(tree.child_count(roots.main), 2);
	let second = tree.child(roots.main, 1).unwrap();
	assert_eq!(tree.text_content(second), "bar");

	let merge = split.reversed(roots.graveyard);
	assert_eq!(merge.kind(roots.graveyard), OperationKind::Merge);
	apply(&mut tree, &merge);
	assert_eq!(tree.snapshot(roots.main).unwrap(), before);
	assert_eq!(tree.child_count(roots.graveyard), 1);

	// Splitting again reuses the merged element from the graveyard.
	let resplit = merge.reversed(roots.graveyard);
	apply(&mut tree, &resplit);
	assert_eq!(tree.child_count(roots.graveyard), 0);
	assert_eq!(tree.child(roots.main, 1), Some(second));
}

#[test]
fn attribute_operation_checks_old_value() {
	let (mut tree, roots) = setup("foo");
	let range = Range::new(Position::new(roots.main, [0, 0]), Position::new(roots.main, [0, 3]));
	let mut op = Operation::Attribute(AttributeOperation {
		range: range.clone(),
		key: "bold".into(),
		old_value: Some(json!(true)),
		new_value: None,
		base_version: Some(0),
	});
	assert!(matches!(
		op.execute_on_tree(&mut tree),
		Err(ModelError::WrongOldAttributeValue { .. })
	));

	let set = Operation::Attribute(AttributeOperation {
		range,
		key: "bold".into(),
		old_value: None,
		new_value: Some(json!(true)),
		base_version: Some(0),
	});
	assert_eq!(set.kind(roots.graveyard), OperationKind::AddAttribute);
	apply(&mut tree, &set);
	let text = tree.child(tree.child(roots.main, 0).unwrap(), 0).unwrap();
	assert_eq!(tree.attr(text, "bold"), Some(&json!(true)));

	let unset = set.reversed(roots.graveyard);
	assert_eq!(unset.kind(roots.graveyard), OperationKind::RemoveAttribute);
	apply(&mut tree, &unset);
	assert!(tree.attrs(text).is_empty());
}

#[test]
fn rename_requires_matching_old_name() {
	let (mut tree, roots) = setup("foo");
	let mut wrong = Operation::Rename(RenameOperation {
		position: Position::new(roots.main, [0]),
		old_name: "heading".into(),
		new_name: "quote".into(),
		base_version: Some(0),
	});
	assert!(wrong.execute_on_tree(&mut tree).is_err());

	let rename = Operation::Rename(RenameOperation {
		position: Position::new(roots.main, [0]),
		old_name: "paragraph".into(),
		new_name: "heading".into(),
		base_version: Some(0),
	});
	apply(&mut tree, &rename);
	let p = tree.child(roots.main, 0).unwrap();
	assert_eq!(tree.name(p), Some("heading"));
	apply(&mut tree, &rename.reversed(roots.graveyard));
	assert_eq!(tree.name(p), Some("paragraph"));
}

#[test]
fn move_into_itself_is_rejected() {
	let (mut tree, roots) = setup("foo");
	let mut op = Operation::Move(MoveOperation {
		source_position: Position::new(roots.main, [0]),
		how_many: 1,
		target_position: Position::new(roots.main, [0, 1]),
		base_version: Some(0),
	});
	assert!(op.execute_on_tree(&mut tree).is_err());
}

#[test]
fn move_out_of_graveyard_is_a_reinsert() {
	let (_, roots) = setup("foo");
	let op = Operation::Move(MoveOperation {
		source_position: Position::new(roots.graveyard, [0]),
		how_many: 1,
		target_position: Position::new(roots.main, [1]),
		base_version: Some(3),
	});
	assert_eq!(op.kind(roots.graveyard), OperationKind::Reinsert);
	assert_eq!(op.reversed(roots.graveyard).kind(roots.graveyard), OperationKind::Remove);
}

#[test]
fn json_keeps_class_name_and_root_names() {
	let (_, roots) = setup("foo");
	let split_position = Position::new(roots.main, [0, 1]);
	let op = Operation::Split(SplitOperation {
		insertion_position: SplitOperation::insertion_position_for(&split_position),
		split_position,
		how_many: 2,
		graveyard_position: None,
		base_version: Some(7),
	});
	let value = op.to_json(&roots).unwrap();
	assert_eq!(value["__className"], json!("SplitOperation"));
	assert_eq!(value["baseVersion"], json!(7));
	assert_eq!(value["splitPosition"]["root"], json!("main"));
	assert_eq!(value["insertionPosition"]["stickiness"], json!("toPrevious"));
	assert_eq!(Operation::from_json(value, &roots).unwrap(), op);
}

#[test]
fn json_rejects_detached_positions() {
	let (mut tree, roots) = setup("foo");
	let detached = tree.create_element("paragraph", Attributes::new());
	let op = Operation::Insert(InsertOperation::new(Position::new(detached, [0]), Vec::new(), None));
	assert!(matches!(op.to_json(&roots), Err(ModelError::DetachedPositionSerialization)));
}

proptest! {
	#[test]
	fn insert_then_reverse_restores_tree(
		text in "[a-z]{1,12}",
		inserted in "[a-z]{1,6}",
		at in 0usize..12,
	) {
		let (mut tree, roots) = setup(&text);
		let at = at.min(text.len());
		let before = tree.snapshot(roots.main).unwrap();
		let insert = Operation::Insert(InsertOperation::new(
			Position::new(roots.main, [0, at]),
			vec![NodeSnapshot::Text { data: inserted.clone(), attributes: Attributes::new() }],
			Some(0),
		));
		apply(&mut tree, &insert);
		prop_assert_eq!(tree.text_content(roots.main).len(), text.len() + inserted.len());
		apply(&mut tree, &insert.reversed(roots.graveyard));
		prop_assert_eq!(tree.snapshot(roots.main).unwrap(), before);
	}

	#[test]
	fn position_survives_insert_and_reverse(
		len in 1usize..12,
		at in 0usize..12,
		count in 1usize..5,
		probe in 0usize..12,
	) {
		let root = NodeId(0, 0);
		let graveyard = NodeId(1, 0);
		let at = at.min(len);
		let probe = probe.min(len);
		let insert = Operation::Insert(InsertOperation::new(
			Position::new(root, [0, at]),
			vec![NodeSnapshot::Text { data: "x".repeat(count), attributes: Attributes::new() }],
			Some(0),
		));
		let position = Position::new(root, [0, probe]);
		let moved = position.transformed_by_operation(&insert);
		let back = moved.transformed_by_operation(&insert.reversed(graveyard));
		prop_assert_eq!(back, position);
	}

	#[test]
	fn every_operation_is_undone_by_its_reverse(case in cases()) {
		let (mut tree, roots) = setup_paragraphs();
		let before = tree.snapshot(roots.main).unwrap();
		let operation = case.operation(&roots);
		apply(&mut tree, &operation);
		apply(&mut tree, &operation.reversed(roots.graveyard));
		prop_assert_eq!(tree.snapshot(roots.main).unwrap(), before);
	}

	#[test]
	fn positions_return_after_operation_and_reverse(
		case in cases(),
		paragraph in 0usize..3,
		offset in 0usize..9,
	) {
		let offset = offset.min(PARAGRAPHS[paragraph].len());
		prop_assume!(!case.is_edge(paragraph, offset));
		let (_, roots) = setup_paragraphs();
		let operation = case.operation(&roots);
		let position = Position::new(roots.main, [paragraph, offset]);
		let moved = position.transformed_by_operation(&operation);
		let back = moved.transformed_by_operation(&operation.reversed(roots.graveyard));
		prop_assert_eq!(back, position);
	}
}
