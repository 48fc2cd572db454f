//! The document-owned selection: live ranges, derived attributes, markers.

use folio_primitives::SearchDirection;
use folio_primitives::graphemes::is_inside_combined_symbol;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::{trace, warn};

use super::Selection;
use crate::emitter::{Emitter, Priority, SubscriptionId};
use crate::error::{ModelError, Result};
use crate::live::{LiveChange, LiveRange};
use crate::markers::MarkerCollection;
use crate::node::{Attributes, NodeId, Tree};
use crate::operation::Operation;
use crate::position::Position;
use crate::range::Range;
use crate::schema::{Schema, SchemaContext};
use crate::walker::{Item, StepKind};

/// Prefix of element attributes storing selection attributes in empty elements.
pub const STORE_ATTRIBUTE_PREFIX: &str = "selection:";

/// Key under which `key` is stored on an empty element.
pub fn store_attribute_key(key: &str) -> String {
	format!("{STORE_ATTRIBUTE_PREFIX}{key}")
}

/// Selection change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
	/// `direct` is true when the ranges were set explicitly, false when
	/// they followed a document change.
	RangeChanged { direct: bool },
	AttributesChanged { keys: Vec<String>, direct: bool },
	/// The set of markers containing the selection changed.
	MarkersChanged { old: Vec<String> },
}

/// Handle returned by [`DocumentSelection::override_gravity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GravityToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributePriority {
	/// Derived from surrounding text; replaced on every change.
	Inherited,
	/// Set or removed through the writer; kept until the ranges are set.
	Explicit,
}

/// One selection attribute entry. A `None` value is an explicit removal
/// that keeps inherited values out.
#[derive(Debug, Clone, PartialEq)]
struct SelectionAttribute {
	value: Option<Value>,
	priority: AttributePriority,
}

/// Selection owned by a document, kept valid across operations.
///
/// With no own ranges it reports the document's default range.
#[derive(Debug, Default)]
pub struct DocumentSelection {
	ranges: Vec<LiveRange>,
	backward: bool,
	default_range: Option<Range>,
	attrs: IndexMap<String, SelectionAttribute>,
	gravity_overrides: FxHashSet<GravityToken>,
	next_token: u64,
	markers: Vec<String>,
	events: Emitter<SelectionEvent>,
}

impl DocumentSelection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Current ranges, or the default range if none were set.
	pub fn ranges(&self) -> impl Iterator<Item = &Range> + '_ {
		let default = if self.ranges.is_empty() {
			self.default_range.as_ref()
		} else {
			None
		};
		self.ranges.iter().map(LiveRange::range).chain(default)
	}

	pub fn range_count(&self) -> usize {
		self.ranges().count()
	}

	/// Whether ranges were set explicitly.
	pub fn has_own_range(&self) -> bool {
		!self.ranges.is_empty()
	}

	pub fn is_backward(&self) -> bool {
		!self.ranges.is_empty() && self.backward && !self.is_collapsed()
	}

	pub fn is_collapsed(&self) -> bool {
		let mut ranges = self.ranges();
		matches!((ranges.next(), ranges.next()), (Some(r), None) if r.is_collapsed())
	}

	/// Detached copy of the current state, attributes included.
	pub fn to_selection(&self) -> Selection {
		Selection {
			ranges: self.ranges().cloned().collect(),
			backward: self.is_backward(),
			attrs: self.attrs(),
		}
	}

	pub fn anchor(&self) -> Option<Position> {
		self.to_selection().anchor()
	}

	pub fn focus(&self) -> Option<Position> {
		self.to_selection().focus()
	}

	pub fn first_range(&self) -> Option<Range> {
		self.to_selection().first_range().cloned()
	}

	pub fn last_range(&self) -> Option<Range> {
		self.to_selection().last_range().cloned()
	}

	pub fn first_position(&self) -> Option<Position> {
		self.to_selection().first_position()
	}

	pub fn last_position(&self) -> Option<Position> {
		self.to_selection().last_position()
	}

	pub fn selected_element(&self, tree: &Tree) -> Option<NodeId> {
		self.to_selection().selected_element(tree)
	}

	pub fn selected_blocks(&self, tree: &Tree, schema: &Schema) -> Vec<NodeId> {
		self.to_selection().selected_blocks(tree, schema)
	}

	pub fn contains_entire_content(&self, tree: &Tree, element: NodeId) -> bool {
		self.to_selection().contains_entire_content(tree, element)
	}

	pub fn attrs(&self) -> Attributes {
		self.attrs
			.iter()
			.filter_map(|(k, a)| Some((k.clone(), a.value.clone()?)))
			.collect()
	}

	pub fn attribute(&self, key: &str) -> Option<&Value> {
		self.attrs.get(key).and_then(|a| a.value.as_ref())
	}

	pub fn has_attribute(&self, key: &str) -> bool {
		self.attribute(key).is_some()
	}

	/// Names of markers containing the selection.
	pub fn markers(&self) -> &[String] {
		&self.markers
	}

	pub fn is_gravity_overridden(&self) -> bool {
		!self.gravity_overrides.is_empty()
	}

	/// Attributes stored on the empty parent of a collapsed selection.
	pub fn stored_attributes(&self, tree: &Tree) -> Attributes {
		let mut stored = Attributes::new();
		let Some(position) = self.first_position() else {
			return stored;
		};
		let Ok(parent) = position.parent(tree) else {
			return stored;
		};
		if !self.is_collapsed() || !tree.is_empty(parent) {
			return stored;
		}
		for (key, value) in tree.attrs(parent) {
			if let Some(key) = key.strip_prefix(STORE_ATTRIBUTE_PREFIX) {
				stored.insert(key.to_string(), value.clone());
			}
		}
		stored
	}

	pub fn subscribe(&mut self, priority: Priority, handler: impl FnMut(&SelectionEvent) + 'static) -> SubscriptionId {
		self.events.subscribe(priority, handler)
	}

	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		self.events.unsubscribe(id)
	}

	/// Replaces the ranges and recomputes attributes from scratch.
	pub(crate) fn set_to(
		&mut self,
		tree: &Tree,
		schema: &Schema,
		markers: &MarkerCollection,
		selection: Selection,
	) -> Result<()> {
		for range in &selection.ranges {
			validate_range(tree, range)?;
		}
		self.ranges = selection.ranges.into_iter().map(LiveRange::new).collect();
		self.backward = selection.backward;
		trace!(ranges = self.ranges.len(), backward = self.backward, "selection set");
		self.events.emit(&SelectionEvent::RangeChanged { direct: true });
		self.update_attributes(tree, schema, true);
		self.update_markers(markers);
		Ok(())
	}

	/// Moves the focus, keeping the anchor.
	pub(crate) fn set_focus(
		&mut self,
		tree: &Tree,
		schema: &Schema,
		markers: &MarkerCollection,
		focus: Position,
	) -> Result<()> {
		let mut selection = self.to_selection();
		selection.set_focus(focus)?;
		self.set_to(tree, schema, markers, selection)
	}

	/// Sets an attribute explicitly. Returns whether it changed.
	pub(crate) fn set_attribute(&mut self, key: &str, value: Value) -> bool {
		let changed = self.set_attribute_with(key, value, AttributePriority::Explicit);
		if changed {
			self.events.emit(&SelectionEvent::AttributesChanged {
				keys: vec![key.to_string()],
				direct: true,
			});
		}
		changed
	}

	/// Removes an attribute explicitly; it stays removed until the ranges
	/// are set again.
	pub(crate) fn remove_attribute(&mut self, key: &str) -> bool {
		let changed = self.remove_attribute_with(key, AttributePriority::Explicit);
		if changed {
			self.events.emit(&SelectionEvent::AttributesChanged {
				keys: vec![key.to_string()],
				direct: true,
			});
		}
		changed
	}

	fn set_attribute_with(&mut self, key: &str, value: Value, priority: AttributePriority) -> bool {
		self.store_attribute(key, Some(value), priority)
	}

	fn remove_attribute_with(&mut self, key: &str, priority: AttributePriority) -> bool {
		self.store_attribute(key, None, priority)
	}

	/// Writes one entry unless an explicit entry shields it from an
	/// inherited one. Returns whether the visible value changed.
	fn store_attribute(&mut self, key: &str, value: Option<Value>, priority: AttributePriority) -> bool {
		if let Some(current) = self.attrs.get_mut(key) {
			if priority == AttributePriority::Inherited && current.priority == AttributePriority::Explicit {
				return false;
			}
			let changed = current.value != value;
			*current = SelectionAttribute { value, priority };
			return changed;
		}
		let changed = value.is_some();
		if changed || priority == AttributePriority::Explicit {
			self.attrs.insert(key.to_string(), SelectionAttribute { value, priority });
		}
		changed
	}

	/// Makes the caret ignore attributes of the text before it.
	pub(crate) fn override_gravity(&mut self, tree: &Tree, schema: &Schema) -> GravityToken {
		let token = GravityToken(self.next_token);
		self.next_token += 1;
		self.gravity_overrides.insert(token);
		if self.gravity_overrides.len() == 1 {
			self.update_attributes(tree, schema, true);
		}
		token
	}

	/// Releases one override; gravity is restored when none remain.
	pub(crate) fn restore_gravity(&mut self, tree: &Tree, schema: &Schema, token: GravityToken) -> Result<()> {
		if !self.gravity_overrides.remove(&token) {
			return Err(ModelError::UnknownGravityToken);
		}
		if self.gravity_overrides.is_empty() {
			self.update_attributes(tree, schema, true);
		}
		Ok(())
	}

	/// Recomputes the range used while the selection has no own ranges.
	pub(crate) fn refresh_default_range(&mut self, tree: &Tree, schema: &Schema, root: Option<NodeId>) {
		self.default_range = root.map(|root| {
			let start = Position::at(tree, root, 0);
			schema
				.nearest_selection_range(tree, &start, SearchDirection::Both)
				.unwrap_or_else(|| Range::collapsed(start))
		});
	}

	/// Follows an applied operation: transforms the ranges, repairs those
	/// that ended up in the graveyard and re-derives attributes.
	pub(crate) fn after_operation(
		&mut self,
		tree: &Tree,
		schema: &Schema,
		markers: &MarkerCollection,
		operation: &Operation,
		graveyard: NodeId,
	) -> Result<()> {
		if !operation.is_document_operation() {
			return Ok(());
		}
		let mut range_changed = false;
		let mut lost = Vec::new();
		for (index, live) in self.ranges.iter_mut().enumerate() {
			if let Some(LiveChange::Range { deletion_position, .. }) = live.transform(operation, graveyard) {
				range_changed = true;
				if live.range().root() == graveyard {
					lost.push((index, deletion_position));
				}
			}
		}
		for (index, deletion_position) in lost.into_iter().rev() {
			self.ranges.remove(index);
			let replacement = deletion_position
				.and_then(|p| schema.nearest_selection_range(tree, &p, SearchDirection::Both))
				.filter(|r| !self.ranges.iter().any(|other| other.range().is_intersecting(r)));
			match replacement {
				Some(range) => {
					trace!(?range, "selection range restored from graveyard");
					self.ranges.insert(index, LiveRange::new(range));
				}
				None => warn!("selection range removed to graveyard has no valid replacement"),
			}
		}

		if matches!(operation, Operation::Marker(_) | Operation::NoOp { .. }) {
			self.update_markers(markers);
			return Ok(());
		}
		if range_changed {
			self.events.emit(&SelectionEvent::RangeChanged { direct: false });
		}
		if !matches!(operation, Operation::Rename(_)) {
			let ranges: Vec<Range> = self.ranges().cloned().collect();
			for range in &ranges {
				validate_range(tree, range)?;
			}
		}
		self.update_attributes(tree, schema, false);
		self.update_markers(markers);
		Ok(())
	}

	/// Re-derives attributes from the surroundings. `clear_all` also drops
	/// explicitly set attributes.
	pub(crate) fn update_attributes(&mut self, tree: &Tree, schema: &Schema, clear_all: bool) {
		let old = self.attrs();
		if clear_all {
			self.attrs.clear();
		} else {
			self.attrs.retain(|_, a| a.priority == AttributePriority::Explicit);
		}
		let surrounding = self.surrounding_attributes(tree, schema);
		for (key, value) in surrounding {
			self.set_attribute_with(&key, value, AttributePriority::Inherited);
		}

		let new = self.attrs();
		let mut keys: IndexSet<String> = IndexSet::new();
		for (key, value) in &old {
			if new.get(key) != Some(value) {
				keys.insert(key.clone());
			}
		}
		for (key, value) in &new {
			if old.get(key) != Some(value) {
				keys.insert(key.clone());
			}
		}
		if !keys.is_empty() {
			trace!(?keys, "selection attributes changed");
			self.events.emit(&SelectionEvent::AttributesChanged {
				keys: keys.into_iter().collect(),
				direct: false,
			});
		}
	}

	fn surrounding_attributes(&self, tree: &Tree, schema: &Schema) -> Attributes {
		let Some(position) = self.first_position() else {
			return Attributes::new();
		};
		if tree.name(position.root) == Some(crate::schema::GRAVEYARD) {
			return Attributes::new();
		}
		if !self.is_collapsed() {
			let Some(range) = self.first_range() else {
				return Attributes::new();
			};
			for value in range.items(tree, false) {
				match (&value.item, value.kind) {
					(Item::Element(element), _) if schema.node_is_object(tree, *element) => {
						return text_attributes(tree, schema, *element).unwrap_or_default();
					}
					(Item::Text(text), StepKind::Text) => return text.attrs(tree).clone(),
					_ => {}
				}
			}
			return Attributes::new();
		}

		let Ok(parent) = position.parent(tree) else {
			return Attributes::new();
		};
		let text_node = position.text_node(tree);
		let before = text_node.or_else(|| position.node_before(tree));
		let after = text_node.or_else(|| position.node_after(tree));
		let gravity = self.is_gravity_overridden();
		let siblings = tree.children(parent);
		let index_of = |node: NodeId| siblings.iter().position(|&n| n == node);

		let mut attrs = None;
		if !gravity {
			attrs = before.and_then(|n| text_attributes(tree, schema, n));
		}
		if attrs.is_none() {
			attrs = after.and_then(|n| text_attributes(tree, schema, n));
		}
		if attrs.is_none()
			&& !gravity
			&& let Some(index) = before.and_then(index_of)
		{
			attrs = siblings[..index]
				.iter()
				.rev()
				.find_map(|&n| text_attributes(tree, schema, n));
		}
		if attrs.is_none()
			&& let Some(index) = after.and_then(index_of)
		{
			attrs = siblings[index + 1..]
				.iter()
				.find_map(|&n| text_attributes(tree, schema, n));
		}
		attrs.unwrap_or_else(|| self.stored_attributes(tree))
	}

	/// Recomputes which markers contain the selection.
	pub(crate) fn update_markers(&mut self, markers: &MarkerCollection) {
		let ranges: Vec<&Range> = self.ranges().collect();
		let names: Vec<String> = markers
			.iter()
			.filter(|marker| {
				ranges
					.iter()
					.any(|range| marker.range().contains_range(range, !range.is_collapsed()))
			})
			.map(|marker| marker.name().to_string())
			.collect();
		if names != self.markers {
			let old = std::mem::replace(&mut self.markers, names);
			self.events.emit(&SelectionEvent::MarkersChanged { old });
		}
	}
}

/// Attributes a caret next to `node` takes over. Inline non-objects yield
/// an empty set and stop the search; blocks yield `None`.
fn text_attributes(tree: &Tree, schema: &Schema, node: NodeId) -> Option<Attributes> {
	if tree.is_text(node) {
		return Some(tree.attrs(node).clone());
	}
	let name = tree.name(node)?;
	if !schema.is_inline(name) {
		return None;
	}
	if !schema.is_object(name) {
		return Some(Attributes::new());
	}
	let text_context = SchemaContext::from_names(["$text"]);
	Some(
		tree.attrs(node)
			.iter()
			.filter(|(key, _)| schema.attribute_properties(key).copy_from_object != Some(false))
			.filter(|(key, _)| schema.check_attribute(&text_context, key))
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect(),
	)
}

/// Fails if a boundary does not exist or splits a combined character.
fn validate_range(tree: &Tree, range: &Range) -> Result<()> {
	for boundary in [&range.start, &range.end] {
		let parent = boundary.parent(tree).map_err(|_| ModelError::InvalidSelectionBoundary)?;
		if boundary.offset() > tree.max_offset(parent) || tree.is_text(parent) {
			return Err(ModelError::InvalidSelectionBoundary);
		}
		if let Some(text) = boundary.text_node(tree)
			&& let (Some(data), Some(start)) = (tree.text(text), tree.start_offset(text))
			&& is_inside_combined_symbol(data, boundary.offset() - start)
		{
			return Err(ModelError::InvalidSelectionBoundary);
		}
	}
	Ok(())
}
