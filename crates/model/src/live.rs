//! Positions and ranges that follow the document through operations.

use slab::Slab;
use tracing::trace;

use crate::error::{ModelError, Result};
use crate::node::NodeId;
use crate::operation::{Operation, OperationKind};
use crate::position::Position;
use crate::range::Range;

/// What happened to a live range while an operation was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveChange {
	/// Boundaries moved. `old` is the range before the operation.
	Range {
		old: Range,
		deletion_position: Option<Position>,
	},
	/// Boundaries stayed but the content in between changed.
	Content {
		range: Range,
		deletion_position: Option<Position>,
	},
}

/// A range that is transformed by every applied document operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRange {
	range: Range,
}

impl LiveRange {
	pub fn new(range: Range) -> Self {
		Self { range }
	}

	pub fn range(&self) -> &Range {
		&self.range
	}

	pub fn into_range(self) -> Range {
		self.range
	}

	pub fn set(&mut self, range: Range) {
		self.range = range;
	}

	/// Moves the range through `operation`, reporting what changed.
	///
	/// When the range ends up in the graveyard, the change carries the
	/// document position the content was removed from.
	pub fn transform(&mut self, operation: &Operation, graveyard: NodeId) -> Option<LiveChange> {
		let content_changed = self.range.is_content_changed_by(operation);
		let result = Range::from_ranges(self.range.transformed_by_operation(operation))?;
		if result != self.range {
			let deletion_position = (result.root() == graveyard)
				.then(|| deletion_position(operation, graveyard))
				.flatten();
			let old = std::mem::replace(&mut self.range, result);
			trace!(?old, new = ?self.range, "live range moved");
			Some(LiveChange::Range { old, deletion_position })
		} else if content_changed {
			trace!(range = ?self.range, "live range content changed");
			Some(LiveChange::Content {
				range: self.range.clone(),
				deletion_position: None,
			})
		} else {
			None
		}
	}
}

fn deletion_position(operation: &Operation, graveyard: NodeId) -> Option<Position> {
	match operation {
		Operation::Move(op) if operation.kind(graveyard) == OperationKind::Remove => Some(op.source_position.clone()),
		Operation::Merge(op) => Some(op.deletion_position()),
		_ => None,
	}
}

/// A position that is transformed by every applied document operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LivePosition {
	position: Position,
}

impl LivePosition {
	pub fn new(position: Position) -> Self {
		Self { position }
	}

	pub fn position(&self) -> &Position {
		&self.position
	}

	pub fn into_position(self) -> Position {
		self.position
	}

	/// Moves the position through `operation`, returning the old position
	/// if it changed.
	pub fn transform(&mut self, operation: &Operation) -> Option<Position> {
		let transformed = self.position.transformed_by_operation(operation);
		if transformed == self.position {
			return None;
		}
		trace!(old = ?self.position, new = ?transformed, "live position moved");
		Some(std::mem::replace(&mut self.position, transformed))
	}
}

/// Handle to a live range held by a [`LiveRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiveRangeId {
	index: usize,
	generation: u64,
}

/// Handle to a live position held by a [`LiveRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LivePositionId {
	index: usize,
	generation: u64,
}

/// Change notification for registry-held live references.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
	RangeChanged {
		id: LiveRangeId,
		old: Range,
		deletion_position: Option<Position>,
	},
	ContentChanged {
		id: LiveRangeId,
		range: Range,
		deletion_position: Option<Position>,
	},
	PositionChanged {
		id: LivePositionId,
		old: Position,
	},
}

#[derive(Debug)]
enum Entry {
	Range(LiveRange),
	Position(LivePosition),
}

#[derive(Debug)]
struct Slot {
	generation: u64,
	entry: Entry,
}

/// Owner of every live reference created through the public API.
///
/// Detaching frees the slot. A stale handle reports
/// [`ModelError::DetachedLiveReference`] instead of reaching a reused slot.
#[derive(Debug, Default)]
pub struct LiveRegistry {
	slots: Slab<Slot>,
	generation: u64,
}

impl LiveRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	fn insert(&mut self, entry: Entry) -> (usize, u64) {
		self.generation += 1;
		let generation = self.generation;
		(self.slots.insert(Slot { generation, entry }), generation)
	}

	fn slot(&self, index: usize, generation: u64) -> Result<&Entry> {
		match self.slots.get(index) {
			Some(slot) if slot.generation == generation => Ok(&slot.entry),
			_ => Err(ModelError::DetachedLiveReference),
		}
	}

	fn remove(&mut self, index: usize, generation: u64) -> Result<Entry> {
		self.slot(index, generation)?;
		Ok(self.slots.remove(index).entry)
	}

	pub fn add_range(&mut self, range: Range) -> LiveRangeId {
		let (index, generation) = self.insert(Entry::Range(LiveRange::new(range)));
		LiveRangeId { index, generation }
	}

	pub fn add_position(&mut self, position: Position) -> LivePositionId {
		let (index, generation) = self.insert(Entry::Position(LivePosition::new(position)));
		LivePositionId { index, generation }
	}

	pub fn range(&self, id: LiveRangeId) -> Result<&Range> {
		match self.slot(id.index, id.generation)? {
			Entry::Range(live) => Ok(live.range()),
			Entry::Position(_) => Err(ModelError::DetachedLiveReference),
		}
	}

	pub fn position(&self, id: LivePositionId) -> Result<&Position> {
		match self.slot(id.index, id.generation)? {
			Entry::Position(live) => Ok(live.position()),
			Entry::Range(_) => Err(ModelError::DetachedLiveReference),
		}
	}

	/// Stops tracking the range and returns its last value.
	pub fn detach_range(&mut self, id: LiveRangeId) -> Result<Range> {
		self.range(id)?;
		match self.remove(id.index, id.generation)? {
			Entry::Range(live) => Ok(live.into_range()),
			Entry::Position(_) => Err(ModelError::DetachedLiveReference),
		}
	}

	/// Stops tracking the position and returns its last value.
	pub fn detach_position(&mut self, id: LivePositionId) -> Result<Position> {
		self.position(id)?;
		match self.remove(id.index, id.generation)? {
			Entry::Position(live) => Ok(live.into_position()),
			Entry::Range(_) => Err(ModelError::DetachedLiveReference),
		}
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Transforms every tracked reference, in creation order of slots.
	pub fn transform_all(&mut self, operation: &Operation, graveyard: NodeId) -> Vec<LiveEvent> {
		let mut events = Vec::new();
		for (index, slot) in self.slots.iter_mut() {
			let generation = slot.generation;
			match &mut slot.entry {
				Entry::Range(live) => match live.transform(operation, graveyard) {
					Some(LiveChange::Range { old, deletion_position }) => events.push(LiveEvent::RangeChanged {
						id: LiveRangeId { index, generation },
						old,
						deletion_position,
					}),
					Some(LiveChange::Content { range, deletion_position }) => {
						events.push(LiveEvent::ContentChanged {
							id: LiveRangeId { index, generation },
							range,
							deletion_position,
						})
					}
					None => {}
				},
				Entry::Position(live) => {
					if let Some(old) = live.transform(operation) {
						events.push(LiveEvent::PositionChanged {
							id: LivePositionId { index, generation },
							old,
						});
					}
				}
			}
		}
		events
	}
}
