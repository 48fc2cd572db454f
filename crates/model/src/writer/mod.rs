//! The mutation handle handed to change blocks.
//!
//! Every structural method builds operations and applies them through the
//! document, so each edit is replayable and invertible.

mod attributes;
mod markers;
mod selection;

use std::rc::Rc;

pub use markers::MarkerOptions;

use crate::batch::{Batch, BatchId, BatchKind};
use crate::config::ModelConfig;
use crate::document::Document;
use crate::error::{ModelError, Result};
use crate::live::{LivePositionId, LiveRangeId};
use crate::model::Model;
use crate::node::{Attributes, NodeId, Tree};
use crate::operation::{
	InsertOperation, MergeOperation, MoveOperation, Operation, RenameOperation, RootNames, SplitOperation,
};
use crate::position::Position;
use crate::range::Range;
use crate::schema::Schema;
use crate::selection::{Offset, Selectable, Selection, position_at};

/// A node or a range, as accepted by removal and attribute methods.
#[derive(Debug, Clone)]
pub enum Target {
	Node(NodeId),
	Range(Range),
}

impl From<NodeId> for Target {
	fn from(node: NodeId) -> Self {
		Self::Node(node)
	}
}

impl From<Range> for Target {
	fn from(range: Range) -> Self {
		Self::Range(range)
	}
}

/// Outcome of [`Writer::split`].
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
	/// Position between the last pair of split halves.
	pub position: Position,
	/// From the end of the first split element to the start of its copy.
	pub range: Range,
}

/// Mutation handle bound to one batch.
pub struct Writer<'m> {
	model: &'m mut Model,
	batch: BatchId,
}

impl<'m> Writer<'m> {
	pub(crate) fn new(model: &'m mut Model, batch: BatchId) -> Self {
		Self { model, batch }
	}

	pub fn model(&self) -> &Model {
		self.model
	}

	pub fn document(&self) -> &Document {
		&self.model.document
	}

	pub(crate) fn document_mut(&mut self) -> &mut Document {
		&mut self.model.document
	}

	pub fn tree(&self) -> &Tree {
		self.model.document.tree()
	}

	pub(crate) fn tree_mut(&mut self) -> &mut Tree {
		self.model.document.tree_mut()
	}

	pub fn schema(&self) -> &Schema {
		&self.model.schema
	}

	pub(crate) fn schema_rc(&self) -> Rc<Schema> {
		Rc::clone(&self.model.schema)
	}

	pub fn config(&self) -> &ModelConfig {
		self.model.config()
	}

	/// The batch this writer adds operations to.
	pub fn batch(&self) -> Result<&Batch> {
		self.model
			.active
			.as_ref()
			.filter(|b| b.id() == self.batch)
			.ok_or(ModelError::StaleWriter)
	}

	pub(crate) fn check(&self) -> Result<()> {
		self.batch().map(|_| ())
	}

	/// Runs `callback` inside the current change block.
	pub fn change<R>(&mut self, callback: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
		self.check()?;
		callback(self)
	}

	/// Queues `callback` to run in its own change block once the current
	/// one and every previously queued change finished.
	pub fn enqueue_change(
		&mut self,
		kind: BatchKind,
		callback: impl FnOnce(&mut Writer<'_>) -> Result<()> + 'static,
	) -> Result<()> {
		self.check()?;
		self.model.queue_change(kind, Box::new(callback));
		Ok(())
	}

	pub(crate) fn is_document_root(&self, root: NodeId) -> bool {
		self.model.document.root_name(root).is_some()
	}

	fn version_for(&self, root: NodeId) -> Option<u64> {
		self.is_document_root(root).then(|| self.model.document.version())
	}

	fn same_tree(&self, a: NodeId, b: NodeId) -> bool {
		a == b || (self.is_document_root(a) && self.is_document_root(b))
	}

	fn graveyard_start(&self) -> Position {
		Position::new(self.model.document.graveyard(), [0])
	}

	pub(crate) fn apply(&mut self, operation: Operation) -> Result<()> {
		let schema = self.schema_rc();
		let applied = self.model.document.apply_operation(operation, &schema)?;
		if let Some(batch) = self.model.active.as_mut() {
			batch.add_operation(applied);
		}
		Ok(())
	}

	/// Applies an already built operation, e.g. one read back from JSON.
	pub fn apply_operation(&mut self, operation: Operation) -> Result<()> {
		self.check()?;
		self.apply(operation)
	}

	pub fn create_text(&mut self, data: &str, attrs: Attributes) -> NodeId {
		self.tree_mut().create_text(data, attrs)
	}

	pub fn create_element(&mut self, name: &str, attrs: Attributes) -> NodeId {
		self.tree_mut().create_element(name, attrs)
	}

	pub fn create_document_fragment(&mut self) -> NodeId {
		self.tree_mut().create_fragment()
	}

	/// Detached copy of `element`, with or without its subtree.
	pub fn clone_element(&mut self, element: NodeId, deep: bool) -> Result<NodeId> {
		if deep {
			self.tree_mut().clone_deep(element)
		} else {
			self.tree_mut().clone_shallow(element)
		}
	}

	pub fn create_position_at(&self, node: NodeId, offset: Offset) -> Result<Position> {
		position_at(self.tree(), node, offset)
	}

	pub fn create_range_in(&self, element: NodeId) -> Range {
		Range::in_element(self.tree(), element)
	}

	pub fn create_range_on(&self, node: NodeId) -> Result<Range> {
		Range::on_node(self.tree(), node)
	}

	pub fn create_selection(&self, selectable: Selectable, backward: bool) -> Result<Selection> {
		Selection::from_selectable(self.tree(), selectable, backward)
	}

	pub fn create_live_position(&mut self, position: Position) -> LivePositionId {
		self.model.document.add_live_position(position)
	}

	pub fn create_live_range(&mut self, range: Range) -> LiveRangeId {
		self.model.document.add_live_range(range)
	}

	/// Inserts a node or the children of a fragment at `position`.
	///
	/// An attached node is moved instead. Fragment markers become
	/// operation-managed document markers.
	pub fn insert(&mut self, item: NodeId, position: Position) -> Result<()> {
		self.check()?;
		let tree = self.tree();
		if tree.text(item).is_some_and(str::is_empty) {
			return Ok(());
		}
		if tree.parent(item).is_some() {
			let item_root = tree.root_of(item);
			if self.same_tree(item_root, position.root) {
				let range = Range::on_node(tree, item)?;
				return self.move_range(range, position);
			}
			if self.is_document_root(item_root) {
				return Err(ModelError::ForbiddenMove);
			}
			self.remove(item)?;
		}

		let tree = self.tree();
		let is_text = tree.is_text(item);
		let (children, markers) = if tree.is_fragment(item) {
			let markers = tree.fragment_markers(item).cloned().unwrap_or_default();
			let end = tree.max_offset(item);
			let tree = self.tree_mut();
			if let Some(own) = tree.fragment_markers_mut(item) {
				own.clear();
			}
			(tree.remove_offsets(item, 0, end)?, markers)
		} else {
			(vec![item], Default::default())
		};

		let tree = self.tree();
		let nodes = children.iter().map(|&c| tree.snapshot(c)).collect::<Result<Vec<_>>>()?;
		let mut insert = InsertOperation::new(position.clone(), nodes, self.version_for(position.root));
		insert.pending = children;
		insert.should_receive_attributes = is_text;
		self.apply(Operation::Insert(insert))?;

		if !self.is_document_root(position.root) {
			return Ok(());
		}
		for (name, range) in markers {
			let fragment_start = Position::new(range.root(), [0]);
			let range = Range::new(
				range.start.combined(&fragment_start, &position),
				range.end.combined(&fragment_start, &position),
			);
			let options = MarkerOptions {
				range: Some(range),
				using_operation: Some(true),
				affects_data: Some(true),
			};
			if self.model.document.markers().has(&name) {
				self.update_marker(&name, Some(options))?;
			} else {
				self.add_marker(&name, options)?;
			}
		}
		Ok(())
	}

	pub fn insert_text(&mut self, data: &str, attrs: Attributes, position: Position) -> Result<NodeId> {
		let text = self.create_text(data, attrs);
		self.insert(text, position)?;
		Ok(text)
	}

	pub fn insert_element(&mut self, name: &str, attrs: Attributes, position: Position) -> Result<NodeId> {
		let element = self.create_element(name, attrs);
		self.insert(element, position)?;
		Ok(element)
	}

	/// Inserts `item` at the end of `parent`.
	pub fn append(&mut self, item: NodeId, parent: NodeId) -> Result<()> {
		let position = Position::at_end(self.tree(), parent);
		self.insert(item, position)
	}

	pub fn append_text(&mut self, data: &str, attrs: Attributes, parent: NodeId) -> Result<NodeId> {
		let position = Position::at_end(self.tree(), parent);
		self.insert_text(data, attrs, position)
	}

	pub fn append_element(&mut self, name: &str, attrs: Attributes, parent: NodeId) -> Result<NodeId> {
		let position = Position::at_end(self.tree(), parent);
		self.insert_element(name, attrs, position)
	}

	/// Moves a flat range to `position`.
	pub fn move_range(&mut self, range: Range, position: Position) -> Result<()> {
		self.check()?;
		if !range.is_flat() {
			return Err(ModelError::MoveRangeNotFlat);
		}
		if position == range.start {
			return Ok(());
		}
		if !self.same_tree(range.root(), position.root) {
			return Err(ModelError::MoveDifferentDocument);
		}
		self.markers_affected_by_move(&range)?;
		let version = self.version_for(range.root());
		self.apply(Operation::Move(MoveOperation {
			how_many: range.end.offset() - range.start.offset(),
			source_position: range.start,
			target_position: position,
			base_version: version,
		}))
	}

	/// Removes a node or every node in a range. Document content goes to
	/// the graveyard; detached content is dropped.
	pub fn remove(&mut self, target: impl Into<Target>) -> Result<()> {
		self.check()?;
		let range = match target.into() {
			Target::Node(node) => Range::on_node(self.tree(), node)?,
			Target::Range(range) => range,
		};
		let flat = range.minimal_flat_ranges(self.tree())?;
		for range in flat.into_iter().rev() {
			let how_many = range.end.offset() - range.start.offset();
			if self.is_document_root(range.root()) {
				self.markers_affected_by_move(&range)?;
				let version = self.version_for(range.root());
				let graveyard = self.graveyard_start();
				self.apply(Operation::Move(MoveOperation {
					source_position: range.start,
					how_many,
					target_position: graveyard,
					base_version: version,
				}))?;
			} else {
				let parent = range.start.parent(self.tree())?;
				let start = range.start.offset();
				self.tree_mut().remove_offsets(parent, start, start + how_many)?;
			}
		}
		Ok(())
	}

	/// Merges the elements on both sides of `position`.
	pub fn merge(&mut self, position: Position) -> Result<()> {
		self.check()?;
		let tree = self.tree();
		let before = position
			.node_before(tree)
			.filter(|&n| tree.is_element(n))
			.ok_or(ModelError::MergeNoElementBefore)?;
		let after = position
			.node_after(tree)
			.filter(|&n| tree.is_element(n))
			.ok_or(ModelError::MergeNoElementAfter)?;
		self.markers_affected_by_merge(&position, before, after)?;

		let tree = self.tree();
		let target = Position::at_end(tree, before);
		if !self.is_document_root(position.root) {
			let content = Range::in_element(tree, after);
			self.move_range(content, target)?;
			return self.remove(after);
		}
		let merge = MergeOperation {
			source_position: Position::at(tree, after, 0),
			how_many: tree.max_offset(after),
			target_position: target,
			graveyard_position: self.graveyard_start(),
			base_version: Some(self.model.document.version()),
		};
		self.apply(Operation::Merge(merge))
	}

	/// Splits the parent of `position`, and its ancestors up to `limit`
	/// (the parent's parent by default).
	pub fn split(&mut self, position: Position, limit: Option<NodeId>) -> Result<SplitResult> {
		self.check()?;
		let tree = self.tree();
		let mut split_element = position.parent(tree)?;
		let parent = tree.parent(split_element).ok_or(ModelError::SplitElementNoParent)?;
		let limit = limit.unwrap_or(parent);
		if limit == split_element || !tree.ancestors(split_element, false).contains(&limit) {
			return Err(ModelError::SplitInvalidLimitElement);
		}
		self.markers_affected_by_split(&position)?;

		let mut position = position;
		let mut first = None;
		loop {
			let how_many = self.tree().max_offset(split_element) - position.offset();
			let split = SplitOperation {
				insertion_position: SplitOperation::insertion_position_for(&position),
				split_position: position.clone(),
				how_many,
				graveyard_position: None,
				base_version: self.version_for(position.root),
			};
			self.apply(Operation::Split(split))?;

			let tree = self.tree();
			if first.is_none() {
				let copy = tree
					.parent(split_element)
					.zip(tree.index_in_parent(split_element))
					.and_then(|(parent, index)| tree.child(parent, index + 1))
					.ok_or(ModelError::NodeNotFound)?;
				first = Some((split_element, copy));
			}
			position = Position::after(tree, split_element)?;
			split_element = position.parent(tree)?;
			if split_element == limit {
				break;
			}
		}

		let tree = self.tree();
		let (first_split, first_copy) = first.ok_or(ModelError::NodeNotFound)?;
		Ok(SplitResult {
			range: Range::new(Position::at_end(tree, first_split), Position::at(tree, first_copy, 0)),
			position,
		})
	}

	/// Wraps a flat range in `element`, which must be empty and detached.
	pub fn wrap(&mut self, range: Range, element: NodeId) -> Result<()> {
		self.check()?;
		if !range.is_flat() {
			return Err(ModelError::WrapRangeNotFlat);
		}
		let tree = self.tree();
		if !tree.is_empty(element) {
			return Err(ModelError::WrapElementNotEmpty);
		}
		if tree.parent(element).is_some() {
			return Err(ModelError::WrapElementAttached);
		}
		self.insert(element, range.start.clone())?;
		let shifted = Range::new(range.start.shifted_by(1), range.end.shifted_by(1));
		let target = Position::at(self.tree(), element, 0);
		self.move_range(shifted, target)
	}

	/// Wraps a flat range in a new element named `name`.
	pub fn wrap_in(&mut self, range: Range, name: &str) -> Result<NodeId> {
		let element = self.create_element(name, Attributes::new());
		self.wrap(range, element)?;
		Ok(element)
	}

	/// Replaces `element` with its children.
	pub fn unwrap(&mut self, element: NodeId) -> Result<()> {
		self.check()?;
		let tree = self.tree();
		if tree.parent(element).is_none() {
			return Err(ModelError::UnwrapElementNoParent);
		}
		let content = Range::in_element(tree, element);
		let after = Position::after(tree, element)?;
		self.move_range(content, after)?;
		self.remove(element)
	}

	pub fn rename(&mut self, element: NodeId, new_name: &str) -> Result<()> {
		self.check()?;
		let tree = self.tree();
		let old_name = tree
			.name(element)
			.filter(|_| tree.is_element(element))
			.ok_or(ModelError::RenameNotElement)?
			.to_string();
		let position = Position::before(tree, element)?;
		let version = self.version_for(position.root);
		self.apply(Operation::Rename(RenameOperation {
			position,
			old_name,
			new_name: new_name.to_string(),
			base_version: version,
		}))
	}
}

#[cfg(test)]
mod tests;
