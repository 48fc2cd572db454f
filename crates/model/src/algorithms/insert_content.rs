use folio_primitives::{SearchDirection, Stickiness};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use super::DeleteContentOptions;
use crate::error::{ModelError, Result};
use crate::live::LivePositionId;
use crate::node::{Attributes, NodeId, Tree};
use crate::position::Position;
use crate::range::Range;
use crate::schema::{Schema, SchemaContext};
use crate::selection::{Selectable, Selection};
use crate::writer::{MarkerOptions, Writer};

/// Element standing in for a fragment marker boundary during insertion.
const MARKER_PLACEHOLDER: &str = "$marker";

impl Writer<'_> {
	/// Inserts a node, or the children of a fragment, at the selection.
	///
	/// Content is split, auto-wrapped in paragraphs and merged with its
	/// surroundings as the schema allows; nodes with no valid place are
	/// unwrapped or dropped. The selection is moved to the end of the
	/// insertion. Returns the range that, removed, restores the previous
	/// content.
	pub fn insert_content(&mut self, content: NodeId, mut selection: Option<&mut Selection>) -> Result<Range> {
		self.check()?;
		if !self.selection_or_document(selection.as_deref()).is_collapsed() {
			self.delete_content(selection.as_deref_mut(), DeleteContentOptions {
				do_not_autoparagraph: true,
				..DeleteContentOptions::default()
			})?;
		}
		let anchor = self
			.selection_or_document(selection.as_deref())
			.anchor()
			.ok_or(ModelError::SelectionNoAnchor)?;
		let schema = self.schema_rc();
		let mut insertion = Insertion::new(self, anchor)?;

		let is_fragment = self.tree().is_fragment(content);
		let placeholders = if is_fragment {
			self.place_marker_placeholders(content)?
		} else {
			Vec::new()
		};
		let nodes = if is_fragment {
			Nodes::ChildrenOf(content)
		} else {
			Nodes::Single(content)
		};
		insertion.handle_nodes(self, &schema, nodes)?;

		let mut new_range = insertion.selection_range(self.tree(), &schema)?;
		if !placeholders.is_empty() {
			let live = new_range.clone().map(|range| self.create_live_range(range));
			self.restore_markers(&insertion, placeholders)?;
			if let Some(id) = live {
				new_range = Some(self.document_mut().detach_live_range(id)?);
			}
		}
		match new_range {
			Some(range) => self.set_target_selection(selection.as_deref_mut(), Selectable::Range(range))?,
			None => debug!("no selection range after content insertion"),
		}

		let affected = match insertion.affected_range(self)? {
			Some(range) => range,
			None => {
				let anchor = self
					.selection_or_document(selection.as_deref())
					.anchor()
					.ok_or(ModelError::SelectionNoAnchor)?;
				Range::collapsed(anchor)
			}
		};
		insertion.destroy(self)?;
		Ok(affected)
	}

	/// Puts placeholder elements at fragment marker boundaries, except at the
	/// fragment edges which follow the affected range instead.
	fn place_marker_placeholders(&mut self, fragment: NodeId) -> Result<Vec<MarkerPlaceholder>> {
		let Some(markers) = self.tree().fragment_markers(fragment).cloned() else {
			return Ok(Vec::new());
		};
		let mut boundaries = Vec::with_capacity(markers.len() * 2);
		for (name, range) in markers {
			let collapsed = range.is_collapsed();
			boundaries.push((range.start, name.clone(), collapsed));
			boundaries.push((range.end, name, collapsed));
		}
		// Last boundary first, so placeholders do not shift the others.
		boundaries.sort_by(|(a, ..), (b, ..)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

		let mut placeholders = Vec::with_capacity(boundaries.len());
		for (position, name, collapsed) in boundaries {
			let tree = self.tree();
			let in_fragment = position.path.len() == 1;
			let at_start = in_fragment && position.is_at_start();
			let at_end = in_fragment && position.offset() == tree.max_offset(fragment);
			let mut placeholder = MarkerPlaceholder {
				name,
				element: None,
				collapsed_at: None,
			};
			if !at_start && !at_end {
				let element = self.create_element(MARKER_PLACEHOLDER, Attributes::new());
				self.insert(element, position)?;
				placeholder.element = Some(element);
			} else if collapsed {
				placeholder.collapsed_at = Some(if at_start { Edge::Start } else { Edge::End });
			}
			placeholders.push(placeholder);
		}
		Ok(placeholders)
	}

	/// Reads marker boundaries back from the placeholders, removes them and
	/// creates the markers.
	fn restore_markers(&mut self, insertion: &Insertion, placeholders: Vec<MarkerPlaceholder>) -> Result<()> {
		let mut boundaries: IndexMap<String, Vec<Position>> = IndexMap::new();
		for placeholder in placeholders.into_iter().rev() {
			let found = boundaries.entry(placeholder.name).or_default();
			let is_start = found.is_empty();
			if let Some(element) = placeholder.element {
				if self.tree().parent(element).is_some() {
					found.push(Position::before(self.tree(), element)?);
					self.remove(element)?;
				}
				continue;
			}
			match (insertion.affected_range(self)?, placeholder.collapsed_at) {
				(None, Some(_)) => found.push(insertion.position.clone()),
				(None, None) => {}
				(Some(range), Some(Edge::Start)) => found.push(range.start),
				(Some(range), Some(Edge::End)) => found.push(range.end),
				(Some(range), None) => found.push(if is_start { range.start } else { range.end }),
			}
		}
		for (name, positions) in boundaries {
			let [start, end] = positions.as_slice() else {
				continue;
			};
			if start.root != end.root || !self.is_document_root(start.root) || self.document().markers().has(&name) {
				continue;
			}
			trace!(marker = %name, "marker restored after insertion");
			self.add_marker(&name, MarkerOptions {
				range: Some(Range::new(start.clone(), end.clone())),
				using_operation: Some(true),
				affects_data: Some(true),
			})?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
	Start,
	End,
}

struct MarkerPlaceholder {
	name: String,
	element: Option<NodeId>,
	/// Set for a collapsed marker at a fragment edge.
	collapsed_at: Option<Edge>,
}

#[derive(Debug, Clone, Copy)]
enum Nodes {
	Single(NodeId),
	ChildrenOf(NodeId),
}

/// A node placed by the insertion. Text ids are only meaningful until the
/// text is flushed into the document, where it may be merged away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placed {
	Element(NodeId),
	Text(NodeId),
}

impl Placed {
	fn of(tree: &Tree, node: NodeId) -> Self {
		if tree.is_element(node) {
			Self::Element(node)
		} else {
			Self::Text(node)
		}
	}

	fn element(self) -> Option<NodeId> {
		match self {
			Self::Element(id) => Some(id),
			Self::Text(_) => None,
		}
	}

	fn id(self) -> NodeId {
		match self {
			Self::Element(id) | Self::Text(id) => id,
		}
	}
}

/// State of one `insert_content` call.
struct Insertion {
	position: Position,
	/// Elements the inserted content may be merged with: the original
	/// parent and the halves split off while finding a place.
	can_merge_with: FxHashSet<NodeId>,
	/// Scratch fragment collecting accepted nodes until they are flushed.
	fragment: NodeId,
	fragment_position: Position,
	first_node: Option<Placed>,
	first_flushed: bool,
	last_node: Option<Placed>,
	last_auto_paragraph: Option<NodeId>,
	filter_attributes_of: Vec<NodeId>,
	affected_start: Option<LivePositionId>,
	affected_end: Option<LivePositionId>,
	node_to_select: Option<NodeId>,
	paragraph: String,
}

impl Insertion {
	fn new(writer: &mut Writer<'_>, position: Position) -> Result<Self> {
		let parent = position.parent(writer.tree())?;
		let fragment = writer.create_document_fragment();
		Ok(Self {
			position,
			can_merge_with: [parent].into_iter().collect(),
			fragment,
			fragment_position: Position::new(fragment, [0]),
			first_node: None,
			first_flushed: false,
			last_node: None,
			last_auto_paragraph: None,
			filter_attributes_of: Vec::new(),
			affected_start: None,
			affected_end: None,
			node_to_select: None,
			paragraph: writer.config().paragraph_element.clone(),
		})
	}

	fn handle_nodes(&mut self, writer: &mut Writer<'_>, schema: &Schema, nodes: Nodes) -> Result<()> {
		match nodes {
			Nodes::Single(node) => self.handle_node(writer, schema, node)?,
			Nodes::ChildrenOf(parent) => {
				let mut index = 0;
				while let Some(child) = writer.tree().child(parent, index) {
					let count = writer.tree().child_count(parent);
					self.handle_node(writer, schema, child)?;
					// A rejected child stays in its source.
					if writer.tree().child_count(parent) >= count {
						index += 1;
					}
				}
			}
		}
		self.insert_partial_fragment(writer, schema)?;
		if let Some(paragraph) = self.last_auto_paragraph {
			self.update_last_node_from_auto_paragraph(writer, paragraph)?;
		}
		self.merge_on_right(writer, schema)?;
		let nodes = std::mem::take(&mut self.filter_attributes_of);
		schema.remove_disallowed_attributes(&nodes, writer)
	}

	fn handle_node(&mut self, writer: &mut Writer<'_>, schema: &Schema, node: NodeId) -> Result<()> {
		if schema.node_is_object(writer.tree(), node) {
			return self.handle_object(writer, schema, node);
		}
		let allowed = self.check_and_autoparagraph(writer, schema, node)?
			|| self.check_and_split_to_allowed_position(writer, schema, node)?;
		if !allowed {
			return self.handle_disallowed_node(writer, schema, node);
		}
		let placed = Placed::of(writer.tree(), node);
		self.append_to_fragment(writer, schema, node)?;
		if self.first_node.is_none() {
			self.first_node = Some(placed);
		}
		self.last_node = Some(placed);
		Ok(())
	}

	fn handle_object(&mut self, writer: &mut Writer<'_>, schema: &Schema, node: NodeId) -> Result<()> {
		if self.check_and_split_to_allowed_position(writer, schema, node)? {
			self.append_to_fragment(writer, schema, node)
		} else {
			self.try_autoparagraphing(writer, schema, node)
		}
	}

	/// Unwraps a rejected element; anything else gets one chance in a
	/// paragraph.
	fn handle_disallowed_node(&mut self, writer: &mut Writer<'_>, schema: &Schema, node: NodeId) -> Result<()> {
		if writer.tree().is_element(node) {
			trace!(node = node.index(), "unwrapping disallowed element");
			self.handle_nodes(writer, schema, Nodes::ChildrenOf(node))
		} else {
			self.try_autoparagraphing(writer, schema, node)
		}
	}

	fn append_to_fragment(&mut self, writer: &mut Writer<'_>, schema: &Schema, node: NodeId) -> Result<()> {
		let tree = writer.tree();
		let name = tree.item_name(node).unwrap_or_default();
		if !schema.check_child_at(tree, &self.position, name) {
			return Err(ModelError::InsertForbidden(format!("'{name}' is not allowed at the insertion position")));
		}
		let size = tree.size(node);
		let is_object = schema.node_is_object(tree, node);
		let text_allowed = schema.check_child_at(tree, &self.position, "$text");
		writer.insert(node, self.fragment_position.clone())?;
		self.fragment_position = self.fragment_position.shifted_by(size as isize);
		// A collapsed selection cannot be put after an object that text
		// cannot follow, so the object gets selected.
		self.node_to_select = (is_object && !text_allowed).then_some(node);
		self.filter_attributes_of.push(node);
		Ok(())
	}

	/// Flushes the scratch fragment into the document. The very first node
	/// goes in its own operation and is merged on the left right away.
	fn insert_partial_fragment(&mut self, writer: &mut Writer<'_>, schema: &Schema) -> Result<()> {
		if writer.tree().is_empty(self.fragment) {
			return Ok(());
		}
		let live = writer.create_live_position(self.position.clone().with_stickiness(Stickiness::ToNext));
		self.set_affected_boundaries(writer, self.position.clone())?;

		if !self.first_flushed
			&& let Some(first) = self.first_node
			&& writer.tree().child(self.fragment, 0) == Some(first.id())
		{
			self.first_flushed = true;
			writer.insert(first.id(), self.position.clone())?;
			self.merge_on_left(writer, schema)?;
			self.position = writer.live_position_value(live)?;
		}
		if !writer.tree().is_empty(self.fragment) {
			writer.insert(self.fragment, self.position.clone())?;
		}
		self.fragment_position = Position::new(self.fragment, [0]);
		self.position = writer.release_live_position(live)?;
		Ok(())
	}

	fn update_last_node_from_auto_paragraph(&mut self, writer: &mut Writer<'_>, paragraph: NodeId) -> Result<()> {
		let tree = writer.tree();
		let after_last = match self.last_node.and_then(Placed::element) {
			Some(element) => Position::after(tree, element)?,
			// Flushed text sits right before the insertion position.
			None => self.position.clone(),
		};
		let after_paragraph = Position::after(tree, paragraph)?;
		if !after_paragraph.is_after(&after_last) {
			return Ok(());
		}
		self.last_node = Some(Placed::Element(paragraph));
		if self.position.parent(tree)? != paragraph || !self.position.is_at_end(tree) {
			return Err(ModelError::InvalidInsertionPosition);
		}
		self.position = after_paragraph;
		self.set_affected_boundaries(writer, self.position.clone())
	}

	/// Widens the affected range to include `position`.
	fn set_affected_boundaries(&mut self, writer: &mut Writer<'_>, position: Position) -> Result<()> {
		if self.affected_start.is_none() {
			self.affected_start =
				Some(writer.create_live_position(position.clone().with_stickiness(Stickiness::ToPrevious)));
		}
		let extend = match self.affected_end {
			None => true,
			Some(id) => writer.live_position_value(id)?.is_before(&position),
		};
		if extend {
			if let Some(id) = self.affected_end.take() {
				writer.release_live_position(id)?;
			}
			self.affected_end = Some(writer.create_live_position(position.with_stickiness(Stickiness::ToNext)));
		}
		Ok(())
	}

	fn replace_boundary(
		writer: &mut Writer<'_>,
		slot: &mut Option<LivePositionId>,
		position: Position,
		stickiness: Stickiness,
	) -> Result<()> {
		if let Some(id) = slot.take() {
			writer.release_live_position(id)?;
		}
		*slot = Some(writer.create_live_position(position.with_stickiness(stickiness)));
		Ok(())
	}

	fn boundary_is(&self, writer: &Writer<'_>, slot: Option<LivePositionId>, position: &Position) -> Result<bool> {
		Ok(match slot {
			Some(id) => writer.live_position_value(id)? == *position,
			None => false,
		})
	}

	fn merge_on_left(&mut self, writer: &mut Writer<'_>, schema: &Schema) -> Result<()> {
		let Some(node) = self.first_node.and_then(Placed::element) else {
			return Ok(());
		};
		let Some(previous) = self.mergeable_sibling(writer.tree(), node, -1) else {
			return Ok(());
		};
		if !schema.check_merge(writer.tree(), previous, node) {
			return Ok(());
		}
		let tree = writer.tree();
		let merge_position = Position::before(tree, node)?.with_stickiness(Stickiness::ToNext);
		let merge_live = writer.create_live_position(merge_position.clone());
		let live = writer.create_live_position(self.position.clone().with_stickiness(Stickiness::ToNext));

		if self.boundary_is(writer, self.affected_start, &merge_position)? {
			let end_of_previous = Position::at_end(writer.tree(), previous);
			Self::replace_boundary(writer, &mut self.affected_start, end_of_previous, Stickiness::ToPrevious)?;
		}
		let single = self.first_node == self.last_node;
		if single {
			self.first_node = Some(Placed::Element(previous));
			self.last_node = Some(Placed::Element(previous));
		}
		trace!(node = node.index(), "merging inserted content on the left");
		writer.merge(merge_position)?;

		let merge_position = writer.release_live_position(merge_live)?;
		if single && self.boundary_is(writer, self.affected_end, &merge_position)? {
			let end_of_previous = Position::at_end(writer.tree(), previous);
			Self::replace_boundary(writer, &mut self.affected_end, end_of_previous, Stickiness::ToNext)?;
		}
		self.position = writer.release_live_position(live)?;
		self.filter_attributes_of.push(self.position.parent(writer.tree())?);
		Ok(())
	}

	fn merge_on_right(&mut self, writer: &mut Writer<'_>, schema: &Schema) -> Result<()> {
		let Some(node) = self.last_node.and_then(Placed::element) else {
			return Ok(());
		};
		let Some(next) = self.mergeable_sibling(writer.tree(), node, 1) else {
			return Ok(());
		};
		if !schema.check_merge(writer.tree(), node, next) {
			return Ok(());
		}
		let tree = writer.tree();
		let merge_position = Position::after(tree, node)?.with_stickiness(Stickiness::ToNext);
		if self.position != merge_position {
			return Err(ModelError::InvalidInsertionPosition);
		}
		let merge_live = writer.create_live_position(merge_position.clone());
		// Sticking to the previous side keeps the caret before the merged
		// content.
		self.position = Position::at_end(writer.tree(), node);
		let live = writer.create_live_position(self.position.clone().with_stickiness(Stickiness::ToPrevious));

		if self.boundary_is(writer, self.affected_end, &merge_position)? {
			let end_of_node = Position::at_end(writer.tree(), node);
			Self::replace_boundary(writer, &mut self.affected_end, end_of_node, Stickiness::ToNext)?;
		}
		let single = self.first_node == self.last_node;
		trace!(node = node.index(), "merging inserted content on the right");
		writer.merge(merge_position)?;

		let merge_position = writer.release_live_position(merge_live)?;
		if single && self.boundary_is(writer, self.affected_start, &merge_position.shifted_by(-1))? {
			let start_of_node = Position::at(writer.tree(), node, 0);
			Self::replace_boundary(writer, &mut self.affected_start, start_of_node, Stickiness::ToPrevious)?;
		}
		self.position = writer.release_live_position(live)?;
		self.filter_attributes_of.push(self.position.parent(writer.tree())?);
		Ok(())
	}

	/// Sibling of `node` in `direction` that the content may merge with.
	fn mergeable_sibling(&self, tree: &Tree, node: NodeId, direction: isize) -> Option<NodeId> {
		let parent = tree.parent(node)?;
		let index = tree.index_in_parent(node)?.checked_add_signed(direction)?;
		tree.child(parent, index)
			.filter(|&sibling| tree.is_element(sibling) && self.can_merge_with.contains(&sibling))
	}

	fn try_autoparagraphing(&mut self, writer: &mut Writer<'_>, schema: &Schema, node: NodeId) -> Result<()> {
		let tree = writer.tree();
		let name = tree.item_name(node).unwrap_or_default();
		let parent = self.position.parent(tree)?;
		let paragraph_accepts = schema.check_child(&SchemaContext::from_names([self.paragraph.as_str()]), name);
		if self.allowed_in(tree, schema, parent, &self.paragraph).is_none() || !paragraph_accepts {
			trace!(item = name, "dropping content with no valid place");
			return Ok(());
		}
		let paragraph = writer.create_element(&self.paragraph, Attributes::new());
		writer.tree_mut().insert_nodes(paragraph, 0, &[node])?;
		self.handle_node(writer, schema, paragraph)
	}

	fn check_and_autoparagraph(&mut self, writer: &mut Writer<'_>, schema: &Schema, node: NodeId) -> Result<bool> {
		let tree = writer.tree();
		let name = tree.item_name(node).unwrap_or_default();
		let parent = self.position.parent(tree)?;
		if schema.check_child_in(tree, parent, name) {
			return Ok(true);
		}
		if !schema.check_child_in(tree, parent, &self.paragraph)
			|| !schema.check_child(&SchemaContext::from_names([self.paragraph.as_str()]), name)
		{
			return Ok(false);
		}
		self.insert_partial_fragment(writer, schema)?;
		let paragraph = writer.create_element(&self.paragraph, Attributes::new());
		writer.insert(paragraph, self.position.clone())?;
		self.set_affected_boundaries(writer, self.position.clone())?;
		self.last_auto_paragraph = Some(paragraph);
		self.position = Position::at(writer.tree(), paragraph, 0);
		Ok(true)
	}

	/// Moves the insertion position up to an ancestor accepting `node`,
	/// splitting the elements in between.
	fn check_and_split_to_allowed_position(
		&mut self,
		writer: &mut Writer<'_>,
		schema: &Schema,
		node: NodeId,
	) -> Result<bool> {
		let tree = writer.tree();
		let name = tree.item_name(node).unwrap_or_default().to_string();
		let parent = self.position.parent(tree)?;
		let Some(allowed_in) = self.allowed_in(tree, schema, parent, &name) else {
			return Ok(false);
		};
		if allowed_in != parent {
			self.insert_partial_fragment(writer, schema)?;
		}
		loop {
			let tree = writer.tree();
			let parent = self.position.parent(tree)?;
			if parent == allowed_in {
				return Ok(true);
			}
			if self.position.is_at_start() {
				self.position = Position::before(tree, parent)?;
				// An empty block directly inside the target goes away; one
				// kept inside a deeper limit element stays.
				if tree.is_empty(parent) && tree.parent(parent) == Some(allowed_in) {
					writer.remove(parent)?;
				}
			} else if self.position.is_at_end(tree) {
				self.position = Position::after(tree, parent)?;
			} else {
				let after_parent = Position::after(tree, parent)?;
				self.set_affected_boundaries(writer, self.position.clone())?;
				writer.split(self.position.clone(), None)?;
				self.position = after_parent;
				if let Some(split_off) = self.position.node_after(writer.tree()) {
					self.can_merge_with.insert(split_off);
				}
			}
		}
	}

	/// First element from `context` upwards accepting `name` directly or
	/// wrapped in a paragraph, stopping at limit elements.
	fn allowed_in(&self, tree: &Tree, schema: &Schema, context: NodeId, name: &str) -> Option<NodeId> {
		let mut context = context;
		loop {
			if schema.check_child_in(tree, context, name) {
				return Some(context);
			}
			if schema.check_child_in(tree, context, &self.paragraph)
				&& schema.check_child(&SchemaContext::from_names([self.paragraph.as_str()]), name)
			{
				return Some(context);
			}
			if schema.node_is_limit(tree, context) {
				return None;
			}
			context = tree.parent(context)?;
		}
	}

	fn selection_range(&self, tree: &Tree, schema: &Schema) -> Result<Option<Range>> {
		if let Some(node) = self.node_to_select {
			return Range::on_node(tree, node).map(Some);
		}
		Ok(schema.nearest_selection_range(tree, &self.position, SearchDirection::Both))
	}

	fn affected_range(&self, writer: &Writer<'_>) -> Result<Option<Range>> {
		let (Some(start), Some(end)) = (self.affected_start, self.affected_end) else {
			return Ok(None);
		};
		Ok(Some(Range::new(
			writer.live_position_value(start)?,
			writer.live_position_value(end)?,
		)))
	}

	fn destroy(self, writer: &mut Writer<'_>) -> Result<()> {
		for id in [self.affected_start, self.affected_end].into_iter().flatten() {
			writer.release_live_position(id)?;
		}
		Ok(())
	}
}
