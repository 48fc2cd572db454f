//! The closed family of reversible structural edits.

mod execute;
mod json;
mod transform;

pub use json::RootNames;

use serde_json::Value;

use crate::node::{NodeId, NodeSnapshot};
use crate::position::Position;
use crate::range::Range;

/// Coarse operation type, distinguishing moves by their graveyard role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
	Insert,
	Move,
	/// A move into the graveyard.
	Remove,
	/// A move out of the graveyard.
	Reinsert,
	Merge,
	Split,
	Rename,
	AddAttribute,
	ChangeAttribute,
	RemoveAttribute,
	AddRootAttribute,
	ChangeRootAttribute,
	RemoveRootAttribute,
	Marker,
	AddRoot,
	DetachRoot,
	NoOp,
}

/// Inserts nodes at a position.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOperation {
	pub position: Position,
	/// Copies of the inserted nodes, as they were before insertion.
	pub nodes: Vec<NodeSnapshot>,
	pub should_receive_attributes: bool,
	pub base_version: Option<u64>,
	/// Original detached nodes to attach on first execution.
	pub(crate) pending: Vec<NodeId>,
}

impl InsertOperation {
	pub fn new(position: Position, nodes: Vec<NodeSnapshot>, base_version: Option<u64>) -> Self {
		Self {
			position,
			nodes,
			should_receive_attributes: false,
			base_version,
			pending: Vec::new(),
		}
	}

	/// Offset size of the inserted content.
	pub fn how_many(&self) -> usize {
		self.nodes.iter().map(NodeSnapshot::size).sum()
	}
}

/// Moves a flat run of offsets to another position.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOperation {
	pub source_position: Position,
	pub how_many: usize,
	pub target_position: Position,
	pub base_version: Option<u64>,
}

impl MoveOperation {
	/// Where the moved content starts after the move.
	pub fn moved_range_start(&self) -> Position {
		self.target_position
			.transformed_by_deletion(&self.source_position, self.how_many)
			.unwrap_or_else(|| self.target_position.clone())
	}
}

/// Moves all children of an element into its previous sibling and parks
/// the emptied element in the graveyard.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOperation {
	/// Start of the merged element's content.
	pub source_position: Position,
	pub how_many: usize,
	/// End of the element the content is merged into.
	pub target_position: Position,
	pub graveyard_position: Position,
	pub base_version: Option<u64>,
}

impl MergeOperation {
	/// Position before the merged (removed) element.
	pub fn deletion_position(&self) -> Position {
		self.source_position.with_path(self.source_position.parent_path())
	}

	/// Range of the merged element's content.
	pub fn moved_range(&self) -> Range {
		Range::new(self.source_position.clone(), self.source_position.shifted_by(isize::MAX))
	}
}

/// Splits an element at a position, moving the tail into a new sibling.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOperation {
	pub split_position: Position,
	pub how_many: usize,
	/// Where the new element is inserted.
	pub insertion_position: Position,
	/// Element to reuse from the graveyard instead of creating one.
	pub graveyard_position: Option<Position>,
	pub base_version: Option<u64>,
}

impl SplitOperation {
	/// Insertion position for a split at `split_position`: right after its parent.
	pub fn insertion_position_for(split_position: &Position) -> Position {
		let mut path: Vec<usize> = split_position.parent_path().to_vec();
		if let Some(last) = path.last_mut() {
			*last += 1;
		}
		split_position
			.with_path(&path)
			.with_stickiness(folio_primitives::Stickiness::ToPrevious)
	}

	/// Start of the new element's content.
	pub fn move_target_position(&self) -> Position {
		let mut path: Vec<usize> = self.insertion_position.path.to_vec();
		path.push(0);
		self.insertion_position.with_path(&path).with_stickiness(folio_primitives::Stickiness::ToNone)
	}

	/// Range of the split element's tail.
	pub fn moved_range(&self) -> Range {
		Range::new(self.split_position.clone(), self.split_position.shifted_by(isize::MAX))
	}
}

/// Renames the element after `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenameOperation {
	pub position: Position,
	pub old_name: String,
	pub new_name: String,
	pub base_version: Option<u64>,
}

/// Sets, changes or removes an attribute on every item of a flat range.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeOperation {
	pub range: Range,
	pub key: String,
	pub old_value: Option<Value>,
	pub new_value: Option<Value>,
	pub base_version: Option<u64>,
}

/// Attribute change on a root element.
#[derive(Debug, Clone, PartialEq)]
pub struct RootAttributeOperation {
	pub root: NodeId,
	pub key: String,
	pub old_value: Option<Value>,
	pub new_value: Option<Value>,
	pub base_version: Option<u64>,
}

/// Adds, moves or removes a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOperation {
	pub name: String,
	pub old_range: Option<Range>,
	pub new_range: Option<Range>,
	pub affects_data: bool,
	pub base_version: Option<u64>,
}

/// Attaches or detaches a root.
#[derive(Debug, Clone, PartialEq)]
pub struct RootOperation {
	pub root_name: String,
	pub element_name: String,
	pub is_add: bool,
	pub base_version: Option<u64>,
}

/// An operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
	Insert(InsertOperation),
	Move(MoveOperation),
	Merge(MergeOperation),
	Split(SplitOperation),
	Rename(RenameOperation),
	Attribute(AttributeOperation),
	RootAttribute(RootAttributeOperation),
	Marker(MarkerOperation),
	Root(RootOperation),
	NoOp { base_version: Option<u64> },
}

impl Operation {
	pub fn base_version(&self) -> Option<u64> {
		match self {
			Self::Insert(op) => op.base_version,
			Self::Move(op) => op.base_version,
			Self::Merge(op) => op.base_version,
			Self::Split(op) => op.base_version,
			Self::Rename(op) => op.base_version,
			Self::Attribute(op) => op.base_version,
			Self::RootAttribute(op) => op.base_version,
			Self::Marker(op) => op.base_version,
			Self::Root(op) => op.base_version,
			Self::NoOp { base_version } => *base_version,
		}
	}

	pub fn set_base_version(&mut self, version: Option<u64>) {
		let slot = match self {
			Self::Insert(op) => &mut op.base_version,
			Self::Move(op) => &mut op.base_version,
			Self::Merge(op) => &mut op.base_version,
			Self::Split(op) => &mut op.base_version,
			Self::Rename(op) => &mut op.base_version,
			Self::Attribute(op) => &mut op.base_version,
			Self::RootAttribute(op) => &mut op.base_version,
			Self::Marker(op) => &mut op.base_version,
			Self::Root(op) => &mut op.base_version,
			Self::NoOp { base_version } => base_version,
		};
		*slot = version;
	}

	/// Whether the operation targets document content (has a base version).
	pub fn is_document_operation(&self) -> bool {
		self.base_version().is_some()
	}

	/// Operation type. Moves report `Remove`/`Reinsert` by their graveyard role.
	pub fn kind(&self, graveyard: NodeId) -> OperationKind {
		match self {
			Self::Insert(_) => OperationKind::Insert,
			Self::Move(op) => {
				if op.target_position.root == graveyard {
					OperationKind::Remove
				} else if op.source_position.root == graveyard {
					OperationKind::Reinsert
				} else {
					OperationKind::Move
				}
			}
			Self::Merge(_) => OperationKind::Merge,
			Self::Split(_) => OperationKind::Split,
			Self::Rename(_) => OperationKind::Rename,
			Self::Attribute(op) => attribute_kind(
				&op.old_value,
				&op.new_value,
				[
					OperationKind::AddAttribute,
					OperationKind::RemoveAttribute,
					OperationKind::ChangeAttribute,
				],
			),
			Self::RootAttribute(op) => attribute_kind(
				&op.old_value,
				&op.new_value,
				[
					OperationKind::AddRootAttribute,
					OperationKind::RemoveRootAttribute,
					OperationKind::ChangeRootAttribute,
				],
			),
			Self::Marker(_) => OperationKind::Marker,
			Self::Root(op) if op.is_add => OperationKind::AddRoot,
			Self::Root(_) => OperationKind::DetachRoot,
			Self::NoOp { .. } => OperationKind::NoOp,
		}
	}

	/// The inverse operation, to be applied right after this one.
	pub fn reversed(&self, graveyard: NodeId) -> Operation {
		let next = self.base_version().map(|v| v + 1);
		let graveyard_start = Position::new(graveyard, [0]);
		match self {
			Self::Insert(op) => Self::Move(MoveOperation {
				source_position: op.position.clone(),
				how_many: op.how_many(),
				target_position: graveyard_start,
				base_version: next,
			}),
			Self::Move(op) => Self::Move(MoveOperation {
				source_position: op.moved_range_start(),
				how_many: op.how_many,
				target_position: op.source_position.transformed_by_insertion(&op.target_position, op.how_many),
				base_version: next,
			}),
			Self::Merge(op) => {
				let target = op.target_position.transformed_by_merge(op);
				let insertion = op.deletion_position().transformed_by_merge(op);
				Self::Split(SplitOperation {
					split_position: target,
					how_many: op.how_many,
					insertion_position: insertion,
					graveyard_position: Some(op.graveyard_position.clone()),
					base_version: next,
				})
			}
			Self::Split(op) => Self::Merge(MergeOperation {
				source_position: op.move_target_position(),
				how_many: op.how_many,
				target_position: op.split_position.clone(),
				graveyard_position: graveyard_start,
				base_version: next,
			}),
			Self::Rename(op) => Self::Rename(RenameOperation {
				position: op.position.clone(),
				old_name: op.new_name.clone(),
				new_name: op.old_name.clone(),
				base_version: next,
			}),
			Self::Attribute(op) => Self::Attribute(AttributeOperation {
				range: op.range.clone(),
				key: op.key.clone(),
				old_value: op.new_value.clone(),
				new_value: op.old_value.clone(),
				base_version: next,
			}),
			Self::RootAttribute(op) => Self::RootAttribute(RootAttributeOperation {
				root: op.root,
				key: op.key.clone(),
				old_value: op.new_value.clone(),
				new_value: op.old_value.clone(),
				base_version: next,
			}),
			Self::Marker(op) => Self::Marker(MarkerOperation {
				name: op.name.clone(),
				old_range: op.new_range.clone(),
				new_range: op.old_range.clone(),
				affects_data: op.affects_data,
				base_version: next,
			}),
			Self::Root(op) => Self::Root(RootOperation {
				root_name: op.root_name.clone(),
				element_name: op.element_name.clone(),
				is_add: !op.is_add,
				base_version: next,
			}),
			Self::NoOp { .. } => Self::NoOp { base_version: next },
		}
	}
}

fn attribute_kind(old: &Option<Value>, new: &Option<Value>, kinds: [OperationKind; 3]) -> OperationKind {
	match (old, new) {
		(None, _) => kinds[0],
		(_, None) => kinds[1],
		_ => kinds[2],
	}
}

#[cfg(test)]
mod tests;
