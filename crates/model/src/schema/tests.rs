use folio_primitives::SearchDirection;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::node::Attributes;

fn schema() -> Schema {
	let mut schema = Schema::with_base_items();
	schema.register("paragraph", ItemDefinition::new().inherit_all_from("$block")).unwrap();
	schema.register("image", ItemDefinition::new().inherit_all_from("$blockObject")).unwrap();
	schema
		.register("blockQuote", ItemDefinition::new().inherit_all_from("$container"))
		.unwrap();
	schema.extend("$text", ItemDefinition::new().allow_attributes(&["bold"])).unwrap();
	schema
}

#[test]
fn registration_errors() {
	let mut schema = schema();
	assert!(matches!(
		schema.register("paragraph", ItemDefinition::new()),
		Err(ModelError::ItemAlreadyRegistered(_))
	));
	assert!(matches!(
		schema.extend("nope", ItemDefinition::new()),
		Err(ModelError::ItemNotRegistered(_))
	));
}

#[test]
fn inherit_all_from_is_order_independent() {
	let mut early = Schema::new();
	early.register("paragraph", ItemDefinition::new().inherit_all_from("$block")).unwrap();
	early.register("$root", ItemDefinition::new()).unwrap();
	early
		.register("$block", ItemDefinition::new().allow_in(&["$root"]).block(true))
		.unwrap();

	let mut late = Schema::new();
	late.register("$root", ItemDefinition::new()).unwrap();
	late.register("$block", ItemDefinition::new().allow_in(&["$root"]).block(true))
		.unwrap();
	late.register("paragraph", ItemDefinition::new().inherit_all_from("$block")).unwrap();

	for schema in [&early, &late] {
		assert!(schema.check_child(&SchemaContext::from_names(["$root"]), "paragraph"));
		assert!(schema.is_block("paragraph"));
	}
}

#[test]
fn allow_children_mirrors_allow_in() {
	let mut a = Schema::new();
	a.register("root", ItemDefinition::new().allow_children(&["child"])).unwrap();
	a.register("child", ItemDefinition::new()).unwrap();
	let mut b = Schema::new();
	b.register("root", ItemDefinition::new()).unwrap();
	b.register("child", ItemDefinition::new().allow_in(&["root"])).unwrap();
	assert_eq!(a.definitions(), b.definitions());
	assert!(a.definition("root").unwrap().allow_children.contains("child"));
}

#[test]
fn disallow_beats_allow_but_not_own_allow() {
	let mut schema = Schema::with_base_items();
	schema
		.register(
			"codeBlock",
			ItemDefinition::new().inherit_all_from("$block").disallow_children(&["$text"]),
		)
		.unwrap();
	schema.extend("$text", ItemDefinition::new().allow_in(&["codeBlock"])).unwrap();
	assert!(!schema.check_child(&SchemaContext::from_names(["$root", "codeBlock"]), "$text"));

	schema
		.register("caption", ItemDefinition::new().allow_where(&["$block"]).disallow_in(&["$root"]))
		.unwrap();
	schema
		.register("figure", ItemDefinition::new().allow_where(&["$block"]).allow_in(&["$root"]))
		.unwrap();
	assert!(!schema.check_child(&SchemaContext::from_names(["$root"]), "caption"));
	assert!(schema.check_child(&SchemaContext::from_names(["$root"]), "figure"));
	assert!(schema.check_child(&SchemaContext::from_names(["$root", "$container"]), "caption"));
}

#[test]
fn object_implies_limit_at_query_time() {
	let schema = schema();
	let image = schema.definition("image").unwrap();
	assert!(image.flags.contains(ItemFlags::OBJECT));
	assert!(!image.flags.contains(ItemFlags::LIMIT));
	assert!(schema.is_limit("image"));
	assert!(schema.is_selectable("image"));
	assert!(schema.is_content("image"));
	assert!(schema.is_block("image"));
}

#[test]
fn context_chain_must_be_valid() {
	let schema = schema();
	assert!(schema.check_child(&SchemaContext::from_names(["$root", "paragraph"]), "$text"));
	assert!(schema.check_child(&SchemaContext::from_names(["$root", "blockQuote", "paragraph"]), "$text"));
	assert!(!schema.check_child(&SchemaContext::from_names(["$root", "image", "paragraph"]), "$text"));
	assert!(!schema.check_child(&SchemaContext::from_names(["$root"]), "$text"));
	assert!(schema.check_child(&SchemaContext::from_names(["$root"]), "$marker"));
	assert!(schema.check_child(&SchemaContext::from_names(["$documentFragment"]), "$text"));
}

#[test]
fn attributes_and_hooks() {
	let mut schema = schema();
	let text_ctx = SchemaContext::from_names(["$root", "paragraph", "$text"]);
	assert!(schema.check_attribute(&text_ctx, "bold"));
	assert!(!schema.check_attribute(&text_ctx, "italic"));
	assert!(schema.check_child(&SchemaContext::from_names(["$root", "paragraph"]), "$inlineObject"));
	schema.add_attribute_check(Some("bold"), |ctx, _| ctx.ends_with(&["paragraph", "$text"]).then_some(false));
	assert!(!schema.check_attribute(&text_ctx, "bold"));
	schema.add_child_check(None, |ctx, child| (child == "image" && ctx.ends_with(&["$root"])).then_some(false));
	assert!(!schema.check_child(&SchemaContext::from_names(["$root"]), "image"));
}

#[test]
fn attribute_properties_merge() {
	let mut schema = schema();
	schema.set_attribute_properties("bold", AttributeProperties {
		is_formatting: Some(true),
		..Default::default()
	});
	schema.set_attribute_properties("bold", AttributeProperties {
		copy_on_enter: Some(true),
		..Default::default()
	});
	let props = schema.attribute_properties("bold");
	assert_eq!(props.is_formatting, Some(true));
	assert_eq!(props.copy_on_enter, Some(true));
}

fn document() -> (Tree, NodeId) {
	let mut tree = Tree::new();
	let root = tree.create_element("$root", Attributes::new());
	let p = tree.create_element("paragraph", Attributes::new());
	let t = tree.create_text("ab", Attributes::new());
	tree.append(p, &[t]).unwrap();
	let img = tree.create_element("image", Attributes::new());
	let p2 = tree.create_element("paragraph", Attributes::new());
	tree.append(root, &[img, p, p2]).unwrap();
	(tree, root)
}

#[test]
fn nearest_selection_range_prefers_text_or_objects() {
	let schema = schema();
	let (tree, root) = document();
	// Before the image: forward finds the image as a selectable object.
	let at_start = Position::new(root, [0]);
	let forward = schema
		.nearest_selection_range(&tree, &at_start, SearchDirection::Forward)
		.unwrap();
	assert_eq!(forward, Range::new(Position::new(root, [0]), Position::new(root, [1])));
	// Between the image and the paragraph: backward sees the image end first.
	let between = Position::new(root, [1]);
	let both = schema.nearest_selection_range(&tree, &between, SearchDirection::Both).unwrap();
	assert_eq!(both, Range::new(Position::new(root, [0]), Position::new(root, [1])));
	let forward = schema
		.nearest_selection_range(&tree, &between, SearchDirection::Forward)
		.unwrap();
	assert_eq!(forward, Range::collapsed(Position::new(root, [1, 0])));
	// Inside the paragraph text is allowed directly.
	let inside = Position::new(root, [1, 1]);
	assert_eq!(
		schema.nearest_selection_range(&tree, &inside, SearchDirection::Both),
		Some(Range::collapsed(inside))
	);
}

#[test]
fn merge_and_allowed_parent() {
	let schema = schema();
	let (tree, root) = document();
	assert!(schema.check_merge_at(&tree, &Position::new(root, [2])).unwrap());
	assert!(!schema.check_merge_at(&tree, &Position::new(root, [1])).unwrap());
	assert!(matches!(
		schema.check_merge_at(&tree, &Position::new(root, [0])),
		Err(ModelError::MergeNoElementBefore)
	));
	let inside = Position::new(root, [1, 1]);
	assert_eq!(schema.find_allowed_parent(&tree, &inside, "paragraph"), Some(root));
	assert_eq!(schema.find_allowed_parent(&tree, &inside, "$text"), tree.child(root, 1));
	assert_eq!(schema.limit_element(&tree, &[Range::collapsed(inside)]), Some(root));
}

#[test]
fn valid_ranges_skip_disallowed_items() {
	let schema = schema();
	let (tree, root) = document();
	let ranges = schema
		.valid_ranges(&tree, &[Range::in_element(&tree, root)], "bold")
		.unwrap();
	assert_eq!(ranges, vec![Range::new(Position::new(root, [1, 0]), Position::new(root, [1, 2]))]);
}

proptest! {
	#[test]
	fn compiling_twice_is_idempotent(order in Just(vec![0usize, 1, 2]).prop_shuffle()) {
		let fragments = [
			("paragraph", ItemDefinition::new().inherit_all_from("$block")),
			("$block", ItemDefinition::new().allow_in(&["$root"]).block(true)),
			("$root", ItemDefinition::new().limit(true)),
		];
		let mut schema = Schema::new();
		for i in &order {
			let (name, def) = fragments[*i].clone();
			schema.register(name, def).unwrap();
		}
		let first = schema.definitions().clone();
		let mut again = schema.clone();
		again.invalidate();
		prop_assert_eq!(&first, again.definitions());
		prop_assert!(schema.check_child(&SchemaContext::from_names(["$root"]), "paragraph"));
	}
}
