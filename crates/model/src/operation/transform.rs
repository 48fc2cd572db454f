//! How positions and ranges follow each operation.

use folio_primitives::Stickiness;

use super::{MergeOperation, Operation, SplitOperation};
use crate::position::Position;
use crate::range::Range;

impl Position {
	/// Position after `operation` was applied.
	pub fn transformed_by_operation(&self, operation: &Operation) -> Position {
		match operation {
			Operation::Insert(op) => self.transformed_by_insertion(&op.position, op.how_many()),
			Operation::Move(op) => self.transformed_by_move(&op.source_position, &op.target_position, op.how_many),
			Operation::Split(op) => self.transformed_by_split(op),
			Operation::Merge(op) => self.transformed_by_merge(op),
			_ => self.clone(),
		}
	}

	pub fn transformed_by_split(&self, op: &SplitOperation) -> Position {
		let moved = op.moved_range();
		let contained = moved.contains_position(self)
			|| (moved.start == *self && self.stickiness == Stickiness::ToNext);
		if contained {
			return self.combined(&op.split_position, &op.move_target_position());
		}
		match &op.graveyard_position {
			Some(graveyard) => self.transformed_by_move(graveyard, &op.insertion_position, 1),
			None => self.transformed_by_insertion(&op.insertion_position, 1),
		}
	}

	pub fn transformed_by_merge(&self, op: &MergeOperation) -> Position {
		let moved = op.moved_range();
		let deletion = op.deletion_position();
		if moved.contains_position(self) || moved.start == *self {
			let combined = self.combined(&op.source_position, &op.target_position);
			if op.source_position.is_before(&op.target_position) {
				return combined.transformed_by_deletion(&deletion, 1).unwrap_or(combined);
			}
			return combined;
		}
		if *self == deletion {
			return deletion.with_stickiness(self.stickiness);
		}
		self.transformed_by_move(&deletion, &op.graveyard_position, 1)
	}
}

impl Range {
	/// Ranges covering this range's content after `operation`. A move or
	/// insertion inside may leave up to three pieces.
	pub fn transformed_by_operation(&self, operation: &Operation) -> Vec<Range> {
		match operation {
			Operation::Insert(op) => self.transformed_by_insertion(&op.position, op.how_many(), false),
			Operation::Move(op) => {
				self.transformed_by_move(&op.source_position, &op.target_position, op.how_many, false)
			}
			Operation::Split(op) => vec![self.transformed_by_split(op)],
			Operation::Merge(op) => vec![self.transformed_by_merge(op)],
			_ => vec![self.clone()],
		}
	}

	pub fn transformed_by_split(&self, op: &SplitOperation) -> Range {
		let start = self.start.transformed_by_split(op);
		let mut end = self.end.transformed_by_split(op);
		if self.end == op.insertion_position {
			end = self.end.shifted_by(1);
		}
		// The end sat next to the graveyard element reused by the split and
		// travelled with it.
		if start.root != end.root {
			end = self.end.shifted_by(-1);
		}
		Range::new(start, end)
	}

	pub fn transformed_by_merge(&self, op: &MergeOperation) -> Range {
		let deletion = op.deletion_position();
		// Range spanning only the closing boundary of the merge target.
		if self.start == op.target_position && self.end == deletion {
			return Range::collapsed(self.start.clone());
		}
		let mut start = self.start.transformed_by_merge(op);
		let mut end = self.end.transformed_by_merge(op);
		// The end was next to the merged element and went to the graveyard.
		if start.root != end.root {
			end = self.end.shifted_by(-1);
		}
		if start.is_after(&end) {
			if op.source_position.is_before(&op.target_position) {
				start = end.clone();
				start.set_offset(0);
			} else {
				if deletion != start {
					end = deletion;
				}
				start = op.target_position.clone();
			}
		}
		Range::new(start, end)
	}

	/// Returns whether `operation` changes what is inside this range
	/// without necessarily moving its boundaries.
	pub fn is_content_changed_by(&self, operation: &Operation) -> bool {
		match operation {
			Operation::Insert(op) => self.contains_position(&op.position),
			Operation::Move(op) => {
				self.contains_position(&op.source_position)
					|| self.start == op.source_position
					|| self.contains_position(&op.target_position)
			}
			Operation::Merge(op) => {
				self.contains_position(&op.source_position)
					|| self.start == op.source_position
					|| self.contains_position(&op.target_position)
			}
			Operation::Split(op) => {
				self.contains_position(&op.split_position) || self.contains_position(&op.insertion_position)
			}
			_ => false,
		}
	}
}
