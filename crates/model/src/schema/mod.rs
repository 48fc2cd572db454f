//! Declarative registry of allowed structures and attributes.

mod compile;
mod context;

use std::cell::OnceCell;
use std::rc::Rc;

use folio_primitives::{Direction, SearchDirection};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

pub use compile::{CompiledItem, ItemDefinition, ItemFlags};
pub use context::{ContextItem, SchemaContext};

use crate::error::{ModelError, Result};
use crate::node::{NodeId, Tree};
use crate::position::Position;
use crate::range::Range;
use crate::selection::Selection;
use crate::walker::{Item, StepKind, TreeWalker, WalkerOptions};
use crate::writer::Writer;

/// Name of the root that parks removed content.
pub const GRAVEYARD: &str = "$graveyard";

/// Child check hook: `Some` short-circuits the declarative answer.
pub type ChildCheck = Rc<dyn Fn(&SchemaContext, &str) -> Option<bool>>;
/// Attribute check hook: `Some` short-circuits the declarative answer.
pub type AttributeCheck = Rc<dyn Fn(&SchemaContext, &str) -> Option<bool>>;

/// Properties attached to an attribute key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttributeProperties {
	pub is_formatting: Option<bool>,
	pub copy_on_enter: Option<bool>,
	pub copy_on_replace: Option<bool>,
	pub copy_from_object: Option<bool>,
}

impl AttributeProperties {
	fn merge(&mut self, other: &AttributeProperties) {
		for (slot, value) in [
			(&mut self.is_formatting, other.is_formatting),
			(&mut self.copy_on_enter, other.copy_on_enter),
			(&mut self.copy_on_replace, other.copy_on_replace),
			(&mut self.copy_from_object, other.copy_from_object),
		] {
			if value.is_some() {
				*slot = value;
			}
		}
	}
}

/// Where `find_optimal_insertion_range` should put content relative to a
/// selected block object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertionPlace {
	#[default]
	Auto,
	Before,
	After,
}

/// Registry of schema items with lazily compiled definitions.
#[derive(Clone, Default)]
pub struct Schema {
	sources: IndexMap<String, Vec<ItemDefinition>>,
	compiled: OnceCell<IndexMap<String, CompiledItem>>,
	child_checks: Vec<(Option<String>, ChildCheck)>,
	attribute_checks: Vec<(Option<String>, AttributeCheck)>,
	attribute_properties: IndexMap<String, AttributeProperties>,
}

impl std::fmt::Debug for Schema {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Schema")
			.field("items", &self.sources.keys().collect::<Vec<_>>())
			.field("child_checks", &self.child_checks.len())
			.field("attribute_checks", &self.attribute_checks.len())
			.finish()
	}
}

impl Schema {
	/// Creates an empty schema.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a schema with the generic base items every document uses.
	pub fn with_base_items() -> Self {
		let mut schema = Self::new();
		let base = [
			("$root", ItemDefinition::new().limit(true)),
			("$container", ItemDefinition::new().allow_in(&["$root", "$container"])),
			("$block", ItemDefinition::new().allow_in(&["$root", "$container"]).block(true)),
			(
				"$blockObject",
				ItemDefinition::new().allow_where(&["$block"]).block(true).object(true),
			),
			(
				"$inlineObject",
				ItemDefinition::new()
					.allow_where(&["$text"])
					.allow_attributes_of(&["$text"])
					.inline(true)
					.object(true),
			),
			("$text", ItemDefinition::new().allow_in(&["$block"]).inline(true).content(true)),
			(
				"$clipboardHolder",
				ItemDefinition::new()
					.allow_content_of(&["$root"])
					.allow_children(&["$text"])
					.limit(true),
			),
			(
				"$documentFragment",
				ItemDefinition::new()
					.allow_content_of(&["$root"])
					.allow_children(&["$text"])
					.limit(true),
			),
			("$marker", ItemDefinition::new()),
		];
		for (name, definition) in base {
			schema.sources.insert(name.to_string(), vec![definition]);
		}
		schema.add_child_check(Some("$marker"), |_, _| Some(true));
		schema
	}

	fn invalidate(&mut self) {
		self.compiled = OnceCell::new();
	}

	/// Registers a new item.
	pub fn register(&mut self, name: &str, definition: ItemDefinition) -> Result<()> {
		if self.sources.contains_key(name) {
			return Err(ModelError::ItemAlreadyRegistered(name.to_string()));
		}
		self.sources.insert(name.to_string(), vec![definition]);
		self.invalidate();
		Ok(())
	}

	/// Appends a rule fragment to a registered item.
	pub fn extend(&mut self, name: &str, definition: ItemDefinition) -> Result<()> {
		let fragments = self
			.sources
			.get_mut(name)
			.ok_or_else(|| ModelError::ItemNotRegistered(name.to_string()))?;
		fragments.push(definition);
		self.invalidate();
		Ok(())
	}

	pub fn is_registered(&self, name: &str) -> bool {
		self.sources.contains_key(name)
	}

	/// Compiled definitions of all items.
	pub fn definitions(&self) -> &IndexMap<String, CompiledItem> {
		self.compiled.get_or_init(|| compile::compile(&self.sources))
	}

	pub fn definition(&self, name: &str) -> Option<&CompiledItem> {
		self.definitions().get(name)
	}

	/// Registers a child check, generic when `item` is `None`.
	pub fn add_child_check(
		&mut self,
		item: Option<&str>,
		check: impl Fn(&SchemaContext, &str) -> Option<bool> + 'static,
	) {
		self.child_checks.push((item.map(str::to_string), Rc::new(check)));
	}

	/// Registers an attribute check keyed by attribute name, generic when
	/// `attribute` is `None`.
	pub fn add_attribute_check(
		&mut self,
		attribute: Option<&str>,
		check: impl Fn(&SchemaContext, &str) -> Option<bool> + 'static,
	) {
		self.attribute_checks.push((attribute.map(str::to_string), Rc::new(check)));
	}

	fn flags(&self, name: &str) -> ItemFlags {
		self.definition(name).map(|d| d.flags).unwrap_or_default()
	}

	pub fn is_block(&self, name: &str) -> bool {
		self.flags(name).contains(ItemFlags::BLOCK)
	}

	pub fn is_inline(&self, name: &str) -> bool {
		self.flags(name).contains(ItemFlags::INLINE)
	}

	pub fn is_limit(&self, name: &str) -> bool {
		self.flags(name).intersects(ItemFlags::LIMIT | ItemFlags::OBJECT)
	}

	pub fn is_object(&self, name: &str) -> bool {
		self.flags(name).contains(ItemFlags::OBJECT)
	}

	pub fn is_selectable(&self, name: &str) -> bool {
		self.flags(name).intersects(ItemFlags::SELECTABLE | ItemFlags::OBJECT)
	}

	pub fn is_content(&self, name: &str) -> bool {
		self.flags(name).intersects(ItemFlags::CONTENT | ItemFlags::OBJECT)
	}

	/// Node-level shorthands resolving the item name first.
	pub fn node_is_limit(&self, tree: &Tree, node: NodeId) -> bool {
		tree.item_name(node).is_some_and(|n| self.is_limit(n))
	}

	pub fn node_is_object(&self, tree: &Tree, node: NodeId) -> bool {
		tree.item_name(node).is_some_and(|n| self.is_object(n))
	}

	pub fn node_is_block(&self, tree: &Tree, node: NodeId) -> bool {
		tree.item_name(node).is_some_and(|n| self.is_block(n))
	}

	pub fn node_is_inline(&self, tree: &Tree, node: NodeId) -> bool {
		tree.item_name(node).is_some_and(|n| self.is_inline(n))
	}

	pub fn node_is_selectable(&self, tree: &Tree, node: NodeId) -> bool {
		tree.item_name(node).is_some_and(|n| self.is_selectable(n))
	}

	pub fn node_is_content(&self, tree: &Tree, node: NodeId) -> bool {
		tree.item_name(node).is_some_and(|n| self.is_content(n))
	}

	/// Returns whether `child` may be the next item of `context`, and every
	/// item of `context` is itself validly nested in the items before it.
	pub fn check_child(&self, context: &SchemaContext, child: &str) -> bool {
		for (_, check) in self.child_checks.iter().filter(|(k, _)| k.is_none()) {
			if let Some(answer) = check(context, child) {
				return answer;
			}
		}
		for (_, check) in self.child_checks.iter().filter(|(k, _)| k.as_deref() == Some(child)) {
			if let Some(answer) = check(context, child) {
				return answer;
			}
		}
		let Some(definition) = self.definition(child) else {
			return false;
		};
		if context.is_empty() {
			return false;
		}
		self.check_context_match(definition, context, context.len() - 1)
	}

	fn check_context_match(&self, definition: &CompiledItem, context: &SchemaContext, index: usize) -> bool {
		let Some(item) = context.get(index) else {
			return false;
		};
		if !definition.allow_in.contains(&item.name) {
			return false;
		}
		if index == 0 {
			return true;
		}
		match self.definition(&item.name) {
			Some(parent) => self.check_context_match(parent, context, index - 1),
			None => false,
		}
	}

	/// `check_child` with the context taken from a position.
	pub fn check_child_at(&self, tree: &Tree, position: &Position, child: &str) -> bool {
		self.check_child(&SchemaContext::from_position(tree, position), child)
	}

	/// `check_child` with an element as the context.
	pub fn check_child_in(&self, tree: &Tree, parent: NodeId, child: &str) -> bool {
		self.check_child(&SchemaContext::from_node(tree, parent), child)
	}

	/// Returns whether the last item of `context` may carry `attribute`.
	pub fn check_attribute(&self, context: &SchemaContext, attribute: &str) -> bool {
		for (key, check) in &self.attribute_checks {
			if key.is_none()
				&& let Some(answer) = check(context, attribute)
			{
				return answer;
			}
		}
		for (key, check) in &self.attribute_checks {
			if key.as_deref() == Some(attribute)
				&& let Some(answer) = check(context, attribute)
			{
				return answer;
			}
		}
		context
			.last()
			.and_then(|item| self.definition(&item.name))
			.is_some_and(|d| d.allow_attributes.contains(attribute))
	}

	/// `check_attribute` on a node.
	pub fn check_attribute_on(&self, tree: &Tree, node: NodeId, attribute: &str) -> bool {
		self.check_attribute(&SchemaContext::from_node(tree, node), attribute)
	}

	/// Returns whether `element_to_merge` may be merged into `base`.
	pub fn check_merge(&self, tree: &Tree, base: NodeId, element_to_merge: NodeId) -> bool {
		if self.node_is_limit(tree, base) || self.node_is_limit(tree, element_to_merge) {
			return false;
		}
		tree.children(element_to_merge).iter().all(|&child| {
			tree.item_name(child)
				.is_some_and(|name| self.check_child_in(tree, base, name))
		})
	}

	/// `check_merge` for the elements around `position`.
	pub fn check_merge_at(&self, tree: &Tree, position: &Position) -> Result<bool> {
		let before = position
			.node_before(tree)
			.filter(|&n| tree.is_element(n))
			.ok_or(ModelError::MergeNoElementBefore)?;
		let after = position
			.node_after(tree)
			.filter(|&n| tree.is_element(n))
			.ok_or(ModelError::MergeNoElementAfter)?;
		Ok(self.check_merge(tree, before, after))
	}

	/// Nearest ancestor of `position` under which `child` is allowed,
	/// stopping at the first limit element.
	pub fn find_allowed_parent(&self, tree: &Tree, position: &Position, child: &str) -> Option<NodeId> {
		let mut parent = position.parent(tree).ok();
		while let Some(current) = parent {
			if self.check_child_in(tree, current, child) {
				return Some(current);
			}
			if self.node_is_limit(tree, current) {
				return None;
			}
			parent = tree.parent(current);
		}
		None
	}

	/// Innermost limit element containing all ranges of `selection`.
	pub fn limit_element(&self, tree: &Tree, ranges: &[Range]) -> Option<NodeId> {
		let mut element: Option<NodeId> = None;
		for range in ranges {
			let ancestor = range.common_ancestor(tree)?;
			element = Some(match element {
				None => ancestor,
				Some(current) => common_ancestor_including_self(tree, current, ancestor)?,
			});
		}
		let mut element = element?;
		while !self.node_is_limit(tree, element) {
			match tree.parent(element) {
				Some(parent) => element = parent,
				None => break,
			}
		}
		Some(element)
	}

	/// Whether `attribute` may be applied through `selection`.
	pub fn check_attribute_in_selection(&self, tree: &Tree, selection: &Selection, attribute: &str) -> bool {
		if selection.is_collapsed() {
			let Some(first) = selection.first_position() else {
				return false;
			};
			let context = SchemaContext::from_position(tree, &first).push("$text", selection.attrs().clone());
			return self.check_attribute(&context, attribute);
		}
		selection.ranges().iter().any(|range| {
			range
				.walker(tree, WalkerOptions::default())
				.any(|value| self.check_attribute_on(tree, value.item.node(), attribute))
		})
	}

	/// Splits `ranges` into the flat sub-ranges whose items may carry `attribute`.
	pub fn valid_ranges(&self, tree: &Tree, ranges: &[Range], attribute: &str) -> Result<Vec<Range>> {
		let mut out = Vec::new();
		for range in ranges {
			for flat in range.minimal_flat_ranges(tree)? {
				self.valid_ranges_for_range(tree, &flat, attribute, &mut out);
			}
		}
		Ok(out)
	}

	fn valid_ranges_for_range(&self, tree: &Tree, range: &Range, attribute: &str, out: &mut Vec<Range>) {
		let mut start = range.start.clone();
		let mut end = range.start.clone();
		for value in range.items(tree, true) {
			if let Item::Element(element) = value.item {
				self.valid_ranges_for_range(tree, &Range::in_element(tree, element), attribute, out);
			}
			if !self.check_attribute_on(tree, value.item.node(), attribute) {
				if start != end {
					out.push(Range::new(start.clone(), end.clone()));
				}
				start = value.next_position.clone();
			}
			end = value.next_position;
		}
		if start != end {
			out.push(Range::new(start, end));
		}
	}

	/// Nearest range where a selection may be placed, searching from
	/// `position` within its innermost limit element.
	pub fn nearest_selection_range(
		&self,
		tree: &Tree,
		position: &Position,
		direction: SearchDirection,
	) -> Option<Range> {
		if tree.name(position.root) == Some(GRAVEYARD) {
			return None;
		}
		if self.check_child_at(tree, position, "$text") {
			return Some(Range::collapsed(position.clone()));
		}
		let ancestors = position.ancestors(tree);
		let limit = ancestors
			.iter()
			.rev()
			.find(|&&a| self.node_is_limit(tree, a))
			.copied()
			.unwrap_or(position.root);
		let boundaries = Range::in_element(tree, limit);
		let walker = |direction: Direction| {
			TreeWalker::new(tree, WalkerOptions {
				direction,
				boundaries: Some(boundaries.clone()),
				start_position: Some(position.clone()),
				..WalkerOptions::default()
			})
		};
		let mut backward = direction.includes_backward().then(|| walker(Direction::Backward));
		let mut forward = direction.includes_forward().then(|| walker(Direction::Forward));
		loop {
			let mut progressed = false;
			for (walker, wanted) in [
				(backward.as_mut(), StepKind::ElementEnd),
				(forward.as_mut(), StepKind::ElementStart),
			] {
				let Some(value) = walker.and_then(|w| w.next()) else {
					continue;
				};
				progressed = true;
				if value.kind == wanted
					&& let Item::Element(element) = value.item
					&& self.node_is_selectable(tree, element)
				{
					return Range::on_node(tree, element).ok();
				}
				if self.check_child_at(tree, &value.next_position, "$text") {
					return Some(Range::collapsed(value.next_position));
				}
			}
			if !progressed {
				return None;
			}
		}
	}

	/// Range at which content should be inserted relative to `selection`.
	pub fn find_optimal_insertion_range(
		&self,
		tree: &Tree,
		selection: &Selection,
		place: InsertionPlace,
	) -> Result<Range> {
		if let Some(selected) = selection.selected_element(tree)
			&& self.node_is_object(tree, selected)
			&& !self.node_is_inline(tree, selected)
		{
			return match place {
				InsertionPlace::Before => Ok(Range::collapsed(Position::before(tree, selected)?)),
				InsertionPlace::After => Ok(Range::collapsed(Position::after(tree, selected)?)),
				InsertionPlace::Auto => Range::on_node(tree, selected),
			};
		}
		let focus = selection.focus().ok_or(ModelError::SelectionNoAnchor)?;
		let Some(first_block) = selection.selected_blocks(tree, self).into_iter().next() else {
			return Ok(Range::collapsed(focus));
		};
		if tree.is_empty(first_block) {
			return Ok(Range::collapsed(Position::at(tree, first_block, 0)));
		}
		let after = Position::after(tree, first_block)?;
		if focus.is_touching(&after, tree) {
			return Ok(Range::collapsed(after));
		}
		Ok(Range::collapsed(Position::before(tree, first_block)?))
	}

	/// Sets properties of an attribute key, merging with earlier calls.
	pub fn set_attribute_properties(&mut self, attribute: &str, properties: AttributeProperties) {
		self.attribute_properties
			.entry(attribute.to_string())
			.or_default()
			.merge(&properties);
	}

	pub fn attribute_properties(&self, attribute: &str) -> AttributeProperties {
		self.attribute_properties.get(attribute).cloned().unwrap_or_default()
	}

	/// Attributes of `node` whose properties satisfy `predicate`.
	pub fn attributes_with_property(
		&self,
		tree: &Tree,
		node: NodeId,
		predicate: impl Fn(&AttributeProperties) -> bool,
	) -> Vec<(String, Value)> {
		tree.attrs(node)
			.iter()
			.filter(|(key, _)| predicate(&self.attribute_properties(key)))
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect()
	}

	/// Removes attributes the schema does not allow from `nodes` and, for
	/// elements, from everything inside them. Nodes no longer in the tree
	/// are skipped.
	pub fn remove_disallowed_attributes(&self, nodes: &[NodeId], writer: &mut Writer<'_>) -> Result<()> {
		for &node in nodes {
			let tree = writer.tree();
			if !tree.contains(node) {
				continue;
			}
			if tree.is_text(node) {
				self.remove_disallowed_attributes_of(node, writer)?;
				continue;
			}
			// Positions survive attribute changes; text nodes may not.
			let positions: Vec<Position> = Range::in_element(tree, node)
				.walker(tree, WalkerOptions::default())
				.map(|value| value.next_position)
				.collect();
			for position in positions {
				let tree = writer.tree();
				let item = match position.node_before(tree) {
					Some(item) => item,
					None => position.parent(tree)?,
				};
				self.remove_disallowed_attributes_of(item, writer)?;
			}
		}
		Ok(())
	}

	fn remove_disallowed_attributes_of(&self, node: NodeId, writer: &mut Writer<'_>) -> Result<()> {
		let tree = writer.tree();
		if tree.is_fragment(node) {
			return Ok(());
		}
		let disallowed: Vec<String> = tree
			.attrs(node)
			.keys()
			.filter(|key| !self.check_attribute_on(tree, node, key))
			.cloned()
			.collect();
		for key in disallowed {
			writer.remove_attribute(&key, node)?;
		}
		Ok(())
	}

	/// Sets those of `attributes` that `node` may carry.
	pub fn set_allowed_attributes(
		&self,
		node: NodeId,
		attributes: impl IntoIterator<Item = (String, Value)>,
		writer: &mut Writer<'_>,
	) -> Result<()> {
		for (key, value) in attributes {
			if self.check_attribute_on(writer.tree(), node, &key) {
				writer.set_attribute(&key, value, node)?;
			}
		}
		Ok(())
	}
}

fn common_ancestor_including_self(tree: &Tree, a: NodeId, b: NodeId) -> Option<NodeId> {
	let left = tree.ancestors(a, true);
	let right = tree.ancestors(b, true);
	left.iter().zip(right.iter()).take_while(|(x, y)| x == y).last().map(|(x, _)| *x)
}

#[cfg(test)]
mod tests;
