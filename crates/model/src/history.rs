//! Append-only log of applied document operations.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ModelError, Result};
use crate::operation::Operation;

/// Every document operation ever applied, addressed by base version, plus
/// bookkeeping pairing undoing operations with the ones they undid.
#[derive(Debug, Default)]
pub struct History {
	operations: Vec<Operation>,
	/// Base version of the first logged operation.
	first_version: Option<u64>,
	undo_pairs: FxHashMap<u64, u64>,
	undone: FxHashSet<u64>,
}

impl History {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an operation. Its base version must follow the last one.
	pub fn add_operation(&mut self, operation: Operation) -> Result<()> {
		let Some(version) = operation.base_version() else {
			return Ok(());
		};
		let expected = self.first_version.map(|first| first + self.operations.len() as u64);
		match expected {
			Some(expected) if expected != version => {
				return Err(ModelError::OperationVersionMismatch {
					base: version,
					current: expected,
				});
			}
			None => self.first_version = Some(version),
			_ => {}
		}
		self.operations.push(operation);
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.operations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}

	/// Version the next logged operation will carry.
	pub fn version(&self) -> Option<u64> {
		self.first_version.map(|first| first + self.operations.len() as u64)
	}

	pub fn operation(&self, base_version: u64) -> Option<&Operation> {
		let first = self.first_version?;
		let index = base_version.checked_sub(first)?;
		self.operations.get(usize::try_from(index).ok()?)
	}

	/// Operations with base versions in `from..to`.
	pub fn operations(&self, from: u64, to: u64) -> impl Iterator<Item = &Operation> {
		self.operations.iter().filter(move |op| {
			op.base_version()
				.is_some_and(|v| v >= from && v < to)
		})
	}

	pub fn last_operation(&self) -> Option<&Operation> {
		self.operations.last()
	}

	/// Records that the operation at `undoing` undid the one at `undone`.
	pub fn set_operation_as_undone(&mut self, undone: u64, undoing: u64) {
		self.undo_pairs.insert(undoing, undone);
		self.undone.insert(undone);
	}

	pub fn is_undoing_operation(&self, base_version: u64) -> bool {
		self.undo_pairs.contains_key(&base_version)
	}

	pub fn is_undone_operation(&self, base_version: u64) -> bool {
		self.undone.contains(&base_version)
	}

	/// The operation undone by the one at `undoing`.
	pub fn undone_operation(&self, undoing: u64) -> Option<&Operation> {
		self.undo_pairs.get(&undoing).and_then(|&v| self.operation(v))
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn noop(version: u64) -> Operation {
		Operation::NoOp {
			base_version: Some(version),
		}
	}

	#[test]
	fn operations_are_addressed_by_version() {
		let mut history = History::new();
		for v in 0..4 {
			history.add_operation(noop(v)).unwrap();
		}
		assert_eq!(history.operation(2), Some(&noop(2)));
		assert_eq!(history.operation(9), None);
		assert_eq!(history.operations(1, 3).count(), 2);
		assert_eq!(history.version(), Some(4));
		assert!(history.add_operation(noop(7)).is_err());
	}

	#[test]
	fn non_document_operations_are_not_logged() {
		let mut history = History::new();
		history.add_operation(Operation::NoOp { base_version: None }).unwrap();
		assert!(history.is_empty());
	}

	#[test]
	fn undo_pairs() {
		let mut history = History::new();
		history.add_operation(noop(0)).unwrap();
		history.add_operation(noop(1)).unwrap();
		history.set_operation_as_undone(0, 1);
		assert!(history.is_undone_operation(0));
		assert!(history.is_undoing_operation(1));
		assert!(!history.is_undoing_operation(0));
		assert_eq!(history.undone_operation(1), Some(&noop(0)));
	}
}
