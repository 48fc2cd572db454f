//! Groups of operations forming one undo step.

use crate::operation::Operation;

/// Identifier of a [`Batch`], unique within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub(crate) u64);

/// How the batch should be treated by consumers such as undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchKind {
	#[default]
	Default,
	/// Not registered as its own undo step.
	Transparent,
}

/// Operations applied in one change block.
#[derive(Debug, Clone)]
pub struct Batch {
	id: BatchId,
	kind: BatchKind,
	operations: Vec<Operation>,
}

impl Batch {
	pub(crate) fn new(id: BatchId, kind: BatchKind) -> Self {
		Self {
			id,
			kind,
			operations: Vec::new(),
		}
	}

	pub fn id(&self) -> BatchId {
		self.id
	}

	pub fn kind(&self) -> BatchKind {
		self.kind
	}

	pub fn operations(&self) -> &[Operation] {
		&self.operations
	}

	/// Base version of the first document operation in the batch.
	pub fn base_version(&self) -> Option<u64> {
		self.operations.iter().find_map(Operation::base_version)
	}

	pub(crate) fn add_operation(&mut self, operation: Operation) {
		self.operations.push(operation);
	}
}
