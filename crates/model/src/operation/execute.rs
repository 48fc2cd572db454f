//! Applying structural operations to the node arena.

use super::{
	AttributeOperation, InsertOperation, MergeOperation, MoveOperation, Operation, RenameOperation,
	SplitOperation,
};
use crate::error::{ModelError, Result};
use crate::node::{NodeId, Tree};
use crate::position::{PathRelation, Position, compare_paths};

/// Removes `how_many` offsets at `source` and inserts them at `target`
/// (given in pre-removal coordinates).
fn move_offsets(tree: &mut Tree, source: &Position, how_many: usize, target: &Position) -> Result<Vec<NodeId>> {
	let source_parent = source.parent(tree)?;
	let nodes = tree.remove_offsets(source_parent, source.offset(), source.offset() + how_many)?;
	let target = target
		.transformed_by_deletion(source, how_many)
		.ok_or_else(|| ModelError::InvalidPosition("move target inside moved range".into()))?;
	let target_parent = target.parent(tree)?;
	tree.insert_nodes(target_parent, target.offset(), &nodes)
}

impl Operation {
	/// Validates and applies the tree part of the operation.
	pub(crate) fn execute_on_tree(&mut self, tree: &mut Tree) -> Result<()> {
		match self {
			Self::Insert(op) => op.execute(tree),
			Self::Move(op) => op.execute(tree),
			Self::Merge(op) => op.execute(tree),
			Self::Split(op) => op.execute(tree),
			Self::Rename(op) => op.execute(tree),
			Self::Attribute(op) => op.execute(tree),
			Self::RootAttribute(op) => {
				let current = tree.attr(op.root, &op.key).cloned();
				if current != op.old_value {
					return Err(ModelError::WrongOldAttributeValue { key: op.key.clone() });
				}
				tree.set_node_attribute(op.root, &op.key, op.new_value.as_ref())
			}
			Self::Marker(_) | Self::Root(_) | Self::NoOp { .. } => Ok(()),
		}
	}
}

impl InsertOperation {
	fn execute(&mut self, tree: &mut Tree) -> Result<()> {
		let parent = self.position.parent(tree)?;
		if tree.max_offset(parent) < self.position.offset() || tree.is_text(parent) {
			return Err(ModelError::InvalidPosition("insert position is invalid".into()));
		}
		let nodes = if self.pending.is_empty() {
			self.nodes.iter().map(|s| tree.materialize(s)).collect()
		} else {
			std::mem::take(&mut self.pending)
		};
		tree.insert_nodes(parent, self.position.offset(), &nodes)?;
		Ok(())
	}
}

impl MoveOperation {
	fn execute(&mut self, tree: &mut Tree) -> Result<()> {
		let source_parent = self.source_position.parent(tree)?;
		let target_parent = self.target_position.parent(tree)?;
		let source_offset = self.source_position.offset();
		let target_offset = self.target_position.offset();
		if source_offset + self.how_many > tree.max_offset(source_parent) {
			return Err(ModelError::InvalidPosition("moved nodes do not exist".into()));
		}
		if source_parent == target_parent && source_offset < target_offset && target_offset < source_offset + self.how_many {
			return Err(ModelError::InvalidPosition("cannot move a range into itself".into()));
		}
		if self.source_position.root == self.target_position.root
			&& compare_paths(self.source_position.parent_path(), self.target_position.parent_path())
				== PathRelation::Prefix
		{
			let i = self.source_position.path.len() - 1;
			let step = self.target_position.path[i];
			if step >= source_offset && step < source_offset + self.how_many {
				return Err(ModelError::InvalidPosition("cannot move a node into itself".into()));
			}
		}
		move_offsets(tree, &self.source_position, self.how_many, &self.target_position)?;
		Ok(())
	}
}

impl MergeOperation {
	fn execute(&mut self, tree: &mut Tree) -> Result<()> {
		let merged = self.source_position.parent(tree)?;
		let target = self.target_position.parent(tree)?;
		if tree.parent(merged).is_none() {
			return Err(ModelError::InvalidPosition("merge source has no parent".into()));
		}
		if tree.parent(target).is_none() {
			return Err(ModelError::InvalidPosition("merge target has no parent".into()));
		}
		if self.how_many != tree.max_offset(merged) {
			return Err(ModelError::InvalidPosition("merge how-many does not match the element".into()));
		}
		let content_start = Position::at(tree, merged, 0);
		move_offsets(tree, &content_start, self.how_many, &self.target_position)?;
		let before = Position::before(tree, merged)?;
		move_offsets(tree, &before, 1, &self.graveyard_position)?;
		Ok(())
	}
}

impl SplitOperation {
	fn execute(&mut self, tree: &mut Tree) -> Result<()> {
		let element = self.split_position.parent(tree)?;
		let offset = self.split_position.offset();
		if tree.max_offset(element) < offset {
			return Err(ModelError::InvalidPosition("split position is invalid".into()));
		}
		if tree.parent(element).is_none() {
			return Err(ModelError::SplitElementNoParent);
		}
		if self.how_many != tree.max_offset(element) - offset {
			return Err(ModelError::InvalidPosition("split how-many does not match the element".into()));
		}
		match &self.graveyard_position {
			Some(graveyard) => {
				if graveyard.node_after(tree).is_none() {
					return Err(ModelError::InvalidPosition("split graveyard position is invalid".into()));
				}
				move_offsets(tree, graveyard, 1, &self.insertion_position)?;
			}
			None => {
				let clone = tree.clone_shallow(element)?;
				let parent = self.insertion_position.parent(tree)?;
				tree.insert_nodes(parent, self.insertion_position.offset(), &[clone])?;
			}
		}
		let tail = Position::at(tree, element, offset);
		let how_many = tree.max_offset(element) - offset;
		move_offsets(tree, &tail, how_many, &self.move_target_position())?;
		Ok(())
	}
}

impl RenameOperation {
	fn execute(&mut self, tree: &mut Tree) -> Result<()> {
		let element = self
			.position
			.node_after(tree)
			.filter(|&n| tree.is_element(n))
			.ok_or(ModelError::RenameNotElement)?;
		if tree.name(element) != Some(self.old_name.as_str()) {
			return Err(ModelError::InvalidPosition("renamed element has a different name".into()));
		}
		tree.rename(element, &self.new_name)
	}
}

impl AttributeOperation {
	fn execute(&mut self, tree: &mut Tree) -> Result<()> {
		if !self.range.is_flat() {
			return Err(ModelError::InvalidPosition("attribute range is not flat".into()));
		}
		for value in self.range.items(tree, true) {
			let current = tree.attr(value.item.node(), &self.key);
			match &self.old_value {
				Some(old) if current != Some(old) => {
					return Err(ModelError::WrongOldAttributeValue { key: self.key.clone() });
				}
				None if self.new_value.is_some() && current.is_some() => {
					return Err(ModelError::WrongOldAttributeValue { key: self.key.clone() });
				}
				_ => {}
			}
		}
		if self.old_value == self.new_value {
			return Ok(());
		}
		let parent = self.range.start.parent(tree)?;
		tree.set_attribute_on_offsets(
			parent,
			self.range.start.offset(),
			self.range.end.offset(),
			&self.key,
			self.new_value.as_ref(),
		)
	}
}

