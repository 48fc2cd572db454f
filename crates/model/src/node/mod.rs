//! Node arena holding every element, text run and document fragment.
//!
//! Offsets count characters of text and one unit per element, so a parent's
//! child list is addressed by offsets rather than indices.

mod mutate;
mod snapshot;

use indexmap::IndexMap;
use serde_json::Value;
use slab::Slab;

pub use snapshot::NodeSnapshot;

use crate::error::{ModelError, Result};
use crate::range::Range;

/// Ordered attribute map with unique keys.
pub type Attributes = IndexMap<String, Value>;

/// Handle to a node in a [`Tree`]: an arena slot plus the generation the
/// slot had when the node was created. A handle to a freed node stays
/// invalid after its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize, pub(crate) u32);

impl NodeId {
	/// Returns the raw arena slot.
	pub fn index(self) -> usize {
		self.0
	}
}

/// Discriminant of [`NodeData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Element,
	Text,
	Fragment,
}

/// Payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
	Element {
		name: String,
		attrs: Attributes,
		children: Vec<NodeId>,
	},
	Text {
		data: String,
		attrs: Attributes,
	},
	/// A detached container of nodes with its own markers.
	Fragment {
		children: Vec<NodeId>,
		markers: IndexMap<String, Range>,
	},
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
	generation: u32,
	parent: Option<NodeId>,
	data: NodeData,
}

/// Arena of nodes. Roots, detached elements and fragments all live here.
#[derive(Debug, Default, Clone)]
pub struct Tree {
	nodes: Slab<Node>,
	generation: u32,
}

static EMPTY_ATTRS: std::sync::LazyLock<Attributes> = std::sync::LazyLock::new(Attributes::new);

impl Tree {
	pub fn new() -> Self {
		Self::default()
	}

	fn alloc(&mut self, data: NodeData) -> NodeId {
		self.generation = self.generation.wrapping_add(1);
		let generation = self.generation;
		NodeId(self.nodes.insert(Node { generation, parent: None, data }), generation)
	}

	/// Creates a detached element.
	pub fn create_element(&mut self, name: impl Into<String>, attrs: Attributes) -> NodeId {
		self.alloc(NodeData::Element {
			name: name.into(),
			attrs,
			children: Vec::new(),
		})
	}

	/// Creates a detached text node.
	pub fn create_text(&mut self, data: impl Into<String>, attrs: Attributes) -> NodeId {
		self.alloc(NodeData::Text {
			data: data.into(),
			attrs,
		})
	}

	/// Creates an empty document fragment.
	pub fn create_fragment(&mut self) -> NodeId {
		self.alloc(NodeData::Fragment {
			children: Vec::new(),
			markers: IndexMap::new(),
		})
	}

	fn slot(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(id.0).filter(|n| n.generation == id.1)
	}

	fn slot_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.nodes.get_mut(id.0).filter(|n| n.generation == id.1)
	}

	pub(crate) fn node(&self, id: NodeId) -> Result<&Node> {
		self.slot(id).ok_or(ModelError::NodeNotFound)
	}

	pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
		self.slot_mut(id).ok_or(ModelError::NodeNotFound)
	}

	/// Returns whether `id` refers to a live node.
	pub fn contains(&self, id: NodeId) -> bool {
		self.slot(id).is_some()
	}

	/// Returns the node payload.
	pub fn data(&self, id: NodeId) -> Result<&NodeData> {
		Ok(&self.node(id)?.data)
	}

	pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
		self.slot(id).map(|n| match n.data {
			NodeData::Element { .. } => NodeKind::Element,
			NodeData::Text { .. } => NodeKind::Text,
			NodeData::Fragment { .. } => NodeKind::Fragment,
		})
	}

	pub fn is_element(&self, id: NodeId) -> bool {
		self.kind(id) == Some(NodeKind::Element)
	}

	pub fn is_text(&self, id: NodeId) -> bool {
		self.kind(id) == Some(NodeKind::Text)
	}

	pub fn is_fragment(&self, id: NodeId) -> bool {
		self.kind(id) == Some(NodeKind::Fragment)
	}

	/// Returns the element name, or `None` for text and fragments.
	pub fn name(&self, id: NodeId) -> Option<&str> {
		match &self.slot(id)?.data {
			NodeData::Element { name, .. } => Some(name),
			_ => None,
		}
	}

	/// Returns the schema item name of a node: the element name or `$text`.
	pub fn item_name(&self, id: NodeId) -> Option<&str> {
		match &self.slot(id)?.data {
			NodeData::Element { name, .. } => Some(name),
			NodeData::Text { .. } => Some("$text"),
			NodeData::Fragment { .. } => Some("$documentFragment"),
		}
	}

	/// Returns the attributes of an element or text node. Fragments have none.
	pub fn attrs(&self, id: NodeId) -> &Attributes {
		match self.slot(id).map(|n| &n.data) {
			Some(NodeData::Element { attrs, .. }) | Some(NodeData::Text { attrs, .. }) => attrs,
			_ => &EMPTY_ATTRS,
		}
	}

	pub fn attr(&self, id: NodeId, key: &str) -> Option<&Value> {
		self.attrs(id).get(key)
	}

	pub fn has_attr(&self, id: NodeId, key: &str) -> bool {
		self.attrs(id).contains_key(key)
	}

	/// Returns the characters of a text node.
	pub fn text(&self, id: NodeId) -> Option<&str> {
		match &self.slot(id)?.data {
			NodeData::Text { data, .. } => Some(data),
			_ => None,
		}
	}

	/// Returns the markers carried by a fragment.
	pub fn fragment_markers(&self, id: NodeId) -> Option<&IndexMap<String, Range>> {
		match &self.slot(id)?.data {
			NodeData::Fragment { markers, .. } => Some(markers),
			_ => None,
		}
	}

	pub(crate) fn fragment_markers_mut(&mut self, id: NodeId) -> Option<&mut IndexMap<String, Range>> {
		match &mut self.slot_mut(id)?.data {
			NodeData::Fragment { markers, .. } => Some(markers),
			_ => None,
		}
	}

	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.slot(id).and_then(|n| n.parent)
	}

	/// Returns the children of an element or fragment; empty for text.
	pub fn children(&self, id: NodeId) -> &[NodeId] {
		match self.slot(id).map(|n| &n.data) {
			Some(NodeData::Element { children, .. }) | Some(NodeData::Fragment { children, .. }) => children,
			_ => &[],
		}
	}

	pub fn child_count(&self, id: NodeId) -> usize {
		self.children(id).len()
	}

	pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
		self.children(id).get(index).copied()
	}

	/// Returns whether an element or fragment has no children.
	pub fn is_empty(&self, id: NodeId) -> bool {
		self.children(id).is_empty()
	}

	/// Offset size of a node: its character count for text, one otherwise.
	pub fn size(&self, id: NodeId) -> usize {
		match self.slot(id).map(|n| &n.data) {
			Some(NodeData::Text { data, .. }) => data.chars().count(),
			_ => 1,
		}
	}

	/// Sum of the offset sizes of all children.
	pub fn max_offset(&self, id: NodeId) -> usize {
		self.children(id).iter().map(|&c| self.size(c)).sum()
	}

	/// Index of `id` in its parent's children.
	pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
		let parent = self.parent(id)?;
		self.children(parent).iter().position(|&c| c == id)
	}

	pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
		let parent = self.parent(id)?;
		self.child(parent, self.index_in_parent(id)? + 1)
	}

	pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
		let parent = self.parent(id)?;
		self.child(parent, self.index_in_parent(id)?.checked_sub(1)?)
	}

	/// Offset at which `id` starts in its parent.
	pub fn start_offset(&self, id: NodeId) -> Option<usize> {
		let parent = self.parent(id)?;
		let mut offset = 0;
		for &child in self.children(parent) {
			if child == id {
				return Some(offset);
			}
			offset += self.size(child);
		}
		None
	}

	pub fn end_offset(&self, id: NodeId) -> Option<usize> {
		self.start_offset(id).map(|s| s + self.size(id))
	}

	/// Returns the top-most ancestor (the node itself if it has no parent).
	pub fn root_of(&self, id: NodeId) -> NodeId {
		let mut current = id;
		while let Some(parent) = self.parent(current) {
			current = parent;
		}
		current
	}

	/// Returns the offsets from the root down to the start of `id`.
	pub fn path_of(&self, id: NodeId) -> Vec<usize> {
		let mut path = Vec::new();
		let mut current = id;
		while let Some(offset) = self.start_offset(current) {
			path.push(offset);
			current = self.parent(current).unwrap_or(current);
		}
		path.reverse();
		path
	}

	/// Ancestors of `id` ordered from the root, optionally including `id`.
	pub fn ancestors(&self, id: NodeId, include_self: bool) -> Vec<NodeId> {
		let mut out = Vec::new();
		if include_self {
			out.push(id);
		}
		let mut current = id;
		while let Some(parent) = self.parent(current) {
			out.push(parent);
			current = parent;
		}
		out.reverse();
		out
	}

	/// Returns whether `ancestor` is a proper ancestor of `id`.
	pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
		let mut current = id;
		while let Some(parent) = self.parent(current) {
			if parent == ancestor {
				return true;
			}
			current = parent;
		}
		false
	}

	/// Converts an offset in `parent` to the index of the child that
	/// contains it, or the child count at the very end.
	pub fn offset_to_index(&self, parent: NodeId, offset: usize) -> Result<usize> {
		let mut total = 0;
		for (index, &child) in self.children(parent).iter().enumerate() {
			let size = self.size(child);
			if offset >= total && offset < total + size {
				return Ok(index);
			}
			total += size;
		}
		if total != offset {
			return Err(ModelError::InvalidPosition(format!(
				"offset {offset} is beyond the parent's size {total}"
			)));
		}
		Ok(self.child_count(parent))
	}

	/// Returns the child containing `offset` together with its start offset.
	pub fn child_at_offset(&self, parent: NodeId, offset: usize) -> Option<(NodeId, usize)> {
		let mut total = 0;
		for &child in self.children(parent) {
			let size = self.size(child);
			if offset < total + size {
				return Some((child, total));
			}
			total += size;
		}
		None
	}

	/// Returns the text node strictly containing `offset`, if any.
	pub fn text_node_at(&self, parent: NodeId, offset: usize) -> Option<NodeId> {
		let (child, start) = self.child_at_offset(parent, offset)?;
		(self.is_text(child) && start < offset).then_some(child)
	}

	/// Node directly after `offset`, or `None` when `offset` is inside a text node.
	pub fn node_after(&self, parent: NodeId, offset: usize) -> Option<NodeId> {
		let (child, start) = self.child_at_offset(parent, offset)?;
		(start == offset).then_some(child)
	}

	/// Node directly before `offset`, or `None` when `offset` is inside a text node.
	pub fn node_before(&self, parent: NodeId, offset: usize) -> Option<NodeId> {
		if self.text_node_at(parent, offset).is_some() || offset == 0 {
			return None;
		}
		self.child_at_offset(parent, offset - 1).map(|(child, _)| child)
	}

	/// Resolves the element or fragment addressed by all but the last path step.
	pub fn parent_of_path(&self, root: NodeId, path: &[usize]) -> Result<NodeId> {
		let mut current = root;
		let steps = path.len().saturating_sub(1);
		for &offset in &path[..steps] {
			match self.child_at_offset(current, offset) {
				Some((child, start)) if start == offset && !self.is_text(child) => current = child,
				_ => {
					return Err(ModelError::InvalidPosition(format!(
						"path {path:?} does not lead through an element"
					)));
				}
			}
		}
		if path.last().is_some_and(|&o| o > self.max_offset(current)) {
			return Err(ModelError::InvalidPosition(format!("path {path:?} points past its parent")));
		}
		Ok(current)
	}

	/// Concatenated text of all descendants.
	pub fn text_content(&self, id: NodeId) -> String {
		if let Some(text) = self.text(id) {
			return text.to_string();
		}
		self.children(id).iter().map(|&c| self.text_content(c)).collect()
	}
}
