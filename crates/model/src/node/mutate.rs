//! Low-level structural edits. These keep text normalized but perform no
//! schema checks and emit nothing.

use serde_json::Value;

use super::{Attributes, NodeData, NodeId, Tree};
use crate::error::{ModelError, Result};

impl Tree {
	fn children_mut(&mut self, id: NodeId) -> Result<&mut Vec<NodeId>> {
		match &mut self.node_mut(id)?.data {
			NodeData::Element { children, .. } | NodeData::Fragment { children, .. } => Ok(children),
			NodeData::Text { .. } => Err(ModelError::InvalidPosition("text nodes have no children".into())),
		}
	}

	pub(crate) fn attrs_mut(&mut self, id: NodeId) -> Result<&mut Attributes> {
		match &mut self.node_mut(id)?.data {
			NodeData::Element { attrs, .. } | NodeData::Text { attrs, .. } => Ok(attrs),
			NodeData::Fragment { .. } => Err(ModelError::InvalidPosition("fragments have no attributes".into())),
		}
	}

	/// Splits the text node containing `offset` (if any) and returns the
	/// index of the first child starting at `offset`.
	pub(crate) fn split_at_offset(&mut self, parent: NodeId, offset: usize) -> Result<usize> {
		let index = self.offset_to_index(parent, offset)?;
		let Some(text) = self.text_node_at(parent, offset) else {
			return Ok(index);
		};
		let start = self.start_offset(text).unwrap_or(0);
		let (data, attrs) = match &self.node(text)?.data {
			NodeData::Text { data, attrs } => (data.clone(), attrs.clone()),
			_ => return Ok(index),
		};
		let split = data.char_indices().nth(offset - start).map_or(data.len(), |(i, _)| i);
		let (left, right) = data.split_at(split);
		if let NodeData::Text { data, .. } = &mut self.node_mut(text)?.data {
			*data = left.to_string();
		}
		let right_id = self.create_text(right, attrs);
		self.node_mut(right_id)?.parent = Some(parent);
		self.children_mut(parent)?.insert(index + 1, right_id);
		Ok(index + 1)
	}

	/// Merges the children at `index - 1` and `index` if both are text nodes
	/// with equal attributes.
	pub(crate) fn merge_text_at(&mut self, parent: NodeId, index: usize) -> Result<()> {
		if index == 0 || index >= self.child_count(parent) {
			return Ok(());
		}
		let (Some(left), Some(right)) = (self.child(parent, index - 1), self.child(parent, index)) else {
			return Ok(());
		};
		let (Some(left_text), Some(right_text)) = (self.text(left), self.text(right)) else {
			return Ok(());
		};
		if self.attrs(left) != self.attrs(right) {
			return Ok(());
		}
		let merged = format!("{left_text}{right_text}");
		if let NodeData::Text { data, .. } = &mut self.node_mut(left)?.data {
			*data = merged;
		}
		self.children_mut(parent)?.remove(index);
		self.nodes.remove(right.0);
		Ok(())
	}

	/// Inserts detached `nodes` at `offset` of `parent`. Fragments are
	/// flattened into their children. Returns the inserted ids in order.
	pub(crate) fn insert_nodes(&mut self, parent: NodeId, offset: usize, nodes: &[NodeId]) -> Result<Vec<NodeId>> {
		let mut flat = Vec::with_capacity(nodes.len());
		for &node in nodes {
			if self.is_fragment(node) {
				let children = std::mem::take(self.children_mut(node)?);
				flat.extend(children);
			} else {
				if self.parent(node).is_some() {
					self.detach(node)?;
				}
				flat.push(node);
			}
		}
		let index = self.split_at_offset(parent, offset)?;
		for &node in &flat {
			self.node_mut(node)?.parent = Some(parent);
		}
		let count = flat.len();
		self.children_mut(parent)?.splice(index..index, flat.iter().copied());
		self.merge_text_at(parent, index + count)?;
		self.merge_text_at(parent, index)?;
		Ok(flat)
	}

	/// Removes the children spanning `[start, end)` of `parent` and returns
	/// them detached.
	pub(crate) fn remove_offsets(&mut self, parent: NodeId, start: usize, end: usize) -> Result<Vec<NodeId>> {
		let first = self.split_at_offset(parent, start)?;
		let last = self.split_at_offset(parent, end)?;
		let removed: Vec<NodeId> = self.children_mut(parent)?.drain(first..last).collect();
		for &node in &removed {
			self.node_mut(node)?.parent = None;
		}
		self.merge_text_at(parent, first)?;
		Ok(removed)
	}

	/// Detaches `id` from its parent without touching offsets of anything else.
	pub(crate) fn detach(&mut self, id: NodeId) -> Result<()> {
		let Some(parent) = self.parent(id) else {
			return Ok(());
		};
		let index = self.index_in_parent(id).ok_or(ModelError::NodeNotFound)?;
		self.children_mut(parent)?.remove(index);
		self.node_mut(id)?.parent = None;
		self.merge_text_at(parent, index)?;
		Ok(())
	}

	/// Sets (or with `None` removes) `key` on every node in `[start, end)`
	/// of `parent`, splitting text at the boundaries.
	pub(crate) fn set_attribute_on_offsets(
		&mut self,
		parent: NodeId,
		start: usize,
		end: usize,
		key: &str,
		value: Option<&Value>,
	) -> Result<()> {
		let first = self.split_at_offset(parent, start)?;
		let last = self.split_at_offset(parent, end)?;
		let targets: Vec<NodeId> = self.children(parent)[first..last].to_vec();
		for node in targets {
			self.set_node_attribute(node, key, value)?;
		}
		for index in (first..=last).rev() {
			self.merge_text_at(parent, index)?;
		}
		Ok(())
	}

	/// Sets (or with `None` removes) `key` on a single node.
	pub(crate) fn set_node_attribute(&mut self, id: NodeId, key: &str, value: Option<&Value>) -> Result<()> {
		let attrs = self.attrs_mut(id)?;
		match value {
			Some(value) => {
				attrs.insert(key.to_string(), value.clone());
			}
			None => {
				attrs.shift_remove(key);
			}
		}
		Ok(())
	}

	pub(crate) fn rename(&mut self, id: NodeId, new_name: &str) -> Result<()> {
		match &mut self.node_mut(id)?.data {
			NodeData::Element { name, .. } => {
				*name = new_name.to_string();
				Ok(())
			}
			_ => Err(ModelError::RenameNotElement),
		}
	}

	/// Appends detached `nodes` at the end of `parent`.
	pub(crate) fn append(&mut self, parent: NodeId, nodes: &[NodeId]) -> Result<Vec<NodeId>> {
		let end = self.max_offset(parent);
		self.insert_nodes(parent, end, nodes)
	}

	/// Deep-copies `id` into a new detached node.
	pub fn clone_deep(&mut self, id: NodeId) -> Result<NodeId> {
		let snapshot = self.snapshot(id)?;
		Ok(self.materialize(&snapshot))
	}

	/// Shallow-copies an element (name and attributes only).
	pub fn clone_shallow(&mut self, id: NodeId) -> Result<NodeId> {
		match &self.node(id)?.data {
			NodeData::Element { name, attrs, .. } => {
				let (name, attrs) = (name.clone(), attrs.clone());
				Ok(self.create_element(name, attrs))
			}
			NodeData::Text { data, attrs } => {
				let (data, attrs) = (data.clone(), attrs.clone());
				Ok(self.create_text(data, attrs))
			}
			NodeData::Fragment { .. } => Ok(self.create_fragment()),
		}
	}
}
