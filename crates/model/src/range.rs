//! Ranges between two positions in the same root.

use folio_primitives::Stickiness;

use crate::error::{ModelError, Result};
use crate::node::{NodeId, Tree};
use crate::position::Position;
use crate::walker::{TreeWalker, WalkerOptions, WalkerValue};

/// A span between two positions, `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
	pub start: Position,
	pub end: Position,
}

impl Range {
	/// Creates a range, swapping the ends if given backwards. The start
	/// sticks to the next node and the end to the previous one, so content
	/// inserted at a boundary stays outside; a collapsed range sticks to
	/// neither side.
	pub fn new(start: Position, end: Position) -> Self {
		let (mut start, mut end) = if start.is_after(&end) { (end, start) } else { (start, end) };
		let collapsed = start == end;
		start.stickiness = if collapsed { Stickiness::ToNone } else { Stickiness::ToNext };
		end.stickiness = if collapsed { Stickiness::ToNone } else { Stickiness::ToPrevious };
		Self { start, end }
	}

	pub fn collapsed(position: Position) -> Self {
		Self::new(position.clone(), position)
	}

	/// Range spanning the whole content of `element`.
	pub fn in_element(tree: &Tree, element: NodeId) -> Self {
		Self::new(Position::at(tree, element, 0), Position::at_end(tree, element))
	}

	/// Range spanning `node` itself.
	pub fn on_node(tree: &Tree, node: NodeId) -> Result<Self> {
		Ok(Self::new(Position::before(tree, node)?, Position::after(tree, node)?))
	}

	pub fn from_position_and_shift(position: &Position, shift: usize) -> Self {
		Self::new(position.clone(), position.shifted_by(shift as isize))
	}

	pub fn root(&self) -> NodeId {
		self.start.root
	}

	pub fn is_collapsed(&self) -> bool {
		self.start == self.end
	}

	/// Returns whether both ends share a parent.
	pub fn is_flat(&self) -> bool {
		self.start.parent_path() == self.end.parent_path()
	}

	/// Returns whether `position` is strictly inside.
	pub fn contains_position(&self, position: &Position) -> bool {
		position.is_after(&self.start) && position.is_before(&self.end)
	}

	pub fn contains_range(&self, other: &Range, loose: bool) -> bool {
		let loose = loose && !other.is_collapsed();
		let contains_start = self.contains_position(&other.start) || (loose && self.start == other.start);
		let contains_end = self.contains_position(&other.end) || (loose && self.end == other.end);
		contains_start && contains_end
	}

	/// Returns whether `node` lies inside the range.
	pub fn contains_item(&self, tree: &Tree, node: NodeId) -> bool {
		match Position::before(tree, node) {
			Ok(pos) => self.contains_position(&pos) || self.start == pos,
			Err(_) => false,
		}
	}

	pub fn is_intersecting(&self, other: &Range) -> bool {
		self.start.is_before(&other.end) && self.end.is_after(&other.start)
	}

	/// Parts of this range not covered by `other`.
	pub fn difference(&self, other: &Range) -> Vec<Range> {
		let mut ranges = Vec::new();
		if self.is_intersecting(other) {
			if self.contains_position(&other.start) {
				ranges.push(Range::new(self.start.clone(), other.start.clone()));
			}
			if self.contains_position(&other.end) {
				ranges.push(Range::new(other.end.clone(), self.end.clone()));
			}
		} else {
			ranges.push(self.clone());
		}
		ranges
	}

	pub fn intersection(&self, other: &Range) -> Option<Range> {
		if !self.is_intersecting(other) {
			return None;
		}
		let mut start = self.start.clone();
		let mut end = self.end.clone();
		if self.contains_position(&other.start) {
			start = other.start.clone();
		}
		if self.contains_position(&other.end) {
			end = other.end.clone();
		}
		Some(Range::new(start, end))
	}

	/// Sum of both ranges if they intersect or touch. With `loose`, ranges
	/// separated only by element boundaries are also joined.
	pub fn join(&self, other: &Range, loose: Option<&Tree>) -> Option<Range> {
		let mut should_join = self.is_intersecting(other);
		if !should_join {
			should_join = if self.start.is_before(&other.start) {
				match loose {
					Some(tree) => self.end.is_touching(&other.start, tree),
					None => self.end == other.start,
				}
			} else {
				match loose {
					Some(tree) => other.end.is_touching(&self.start, tree),
					None => other.end == self.start,
				}
			};
		}
		if !should_join {
			return None;
		}
		let mut start = self.start.clone();
		let mut end = self.end.clone();
		if other.start.is_before(&start) {
			start = other.start.clone();
		}
		if other.end.is_after(&end) {
			end = other.end.clone();
		}
		Some(Range::new(start, end))
	}

	/// Decomposes the range into the fewest flat ranges that cover it.
	pub fn minimal_flat_ranges(&self, tree: &Tree) -> Result<Vec<Range>> {
		let mut ranges = Vec::new();
		let diff_at = self.start.common_path(&self.end).len();
		let mut pos = self.start.clone();
		let mut pos_parent = pos.parent(tree)?;
		while pos.path.len() > diff_at + 1 {
			let how_many = tree.max_offset(pos_parent) - pos.offset();
			if how_many != 0 {
				ranges.push(Range::from_position_and_shift(&pos, how_many));
			}
			pos.path.pop();
			let offset = pos.offset() + 1;
			pos.set_offset(offset);
			pos_parent = tree.parent(pos_parent).ok_or(ModelError::NodeNotFound)?;
		}
		while pos.path.len() <= self.end.path.len() {
			let offset = self.end.path[pos.path.len() - 1];
			let how_many = offset.saturating_sub(pos.offset());
			if how_many != 0 {
				ranges.push(Range::from_position_and_shift(&pos, how_many));
			}
			pos.set_offset(offset);
			pos.path.push(0);
		}
		Ok(ranges)
	}

	/// The single element the range spans exactly, if any.
	pub fn contained_element(&self, tree: &Tree) -> Option<NodeId> {
		if self.is_collapsed() {
			return None;
		}
		let after_start = self.start.node_after(tree)?;
		let before_end = self.end.node_before(tree)?;
		(tree.is_element(after_start) && after_start == before_end).then_some(after_start)
	}

	/// Deepest element containing the whole range.
	pub fn common_ancestor(&self, tree: &Tree) -> Option<NodeId> {
		self.start.common_ancestor(&self.end, tree)
	}

	/// Walker over the range.
	pub fn walker<'t>(&self, tree: &'t Tree, options: WalkerOptions) -> TreeWalker<'t> {
		TreeWalker::new(tree, WalkerOptions {
			boundaries: Some(self.clone()),
			..options
		})
	}

	/// All items in the range (text proxies and element starts) in order.
	pub fn items(&self, tree: &Tree, shallow: bool) -> Vec<WalkerValue> {
		self.walker(tree, WalkerOptions {
			shallow,
			ignore_element_end: true,
			..WalkerOptions::default()
		})
		.collect()
	}

	/// Range spanning `ranges` glued to the first one: neighbours are added
	/// while they touch exactly.
	pub fn from_ranges(mut ranges: Vec<Range>) -> Option<Range> {
		match ranges.len() {
			0 => return None,
			1 => return ranges.pop(),
			_ => {}
		}
		let reference = ranges[0].clone();
		ranges.sort_by(|a, b| {
			if a.start.is_after(&b.start) {
				std::cmp::Ordering::Greater
			} else {
				std::cmp::Ordering::Less
			}
		});
		let ref_index = ranges.iter().position(|r| *r == reference).unwrap_or(0);
		let mut start = reference.start.clone();
		let mut end = reference.end.clone();
		for range in ranges[..ref_index].iter().rev() {
			if range.end == start {
				start = range.start.clone();
			} else {
				break;
			}
		}
		for range in &ranges[ref_index + 1..] {
			if range.start == end {
				end = range.end.clone();
			} else {
				break;
			}
		}
		Some(Range::new(start, end))
	}

	/// Range after `how_many` offsets were inserted at `at`. With `spread`,
	/// an insertion strictly inside splits the range in two.
	pub fn transformed_by_insertion(&self, at: &Position, how_many: usize, spread: bool) -> Vec<Range> {
		if spread && self.contains_position(at) {
			return vec![
				Range::new(self.start.clone(), at.clone()),
				Range::new(
					at.shifted_by(how_many as isize),
					self.end.transformed_by_insertion(at, how_many),
				),
			];
		}
		let mut range = self.clone();
		range.start = self.start.transformed_by_insertion(at, how_many);
		range.end = self.end.transformed_by_insertion(at, how_many);
		vec![range]
	}

	/// Range after `how_many` offsets were removed at `at`, shrunk to the
	/// deletion point when an end was inside the removed span.
	pub fn transformed_by_deletion(&self, at: &Position, how_many: usize) -> Option<Range> {
		let start = self.start.transformed_by_deletion(at, how_many);
		let end = self.end.transformed_by_deletion(at, how_many);
		match (start, end) {
			(None, None) => None,
			(start, end) => Some(Range::new(
				start.unwrap_or_else(|| at.clone()),
				end.unwrap_or_else(|| at.clone()),
			)),
		}
	}

	/// Range after `how_many` offsets at `source` moved to `target`. The
	/// result has up to three parts: what stayed before, what moved, what
	/// stayed after.
	pub fn transformed_by_move(
		&self,
		source: &Position,
		target: &Position,
		how_many: usize,
		spread: bool,
	) -> Vec<Range> {
		if self.is_collapsed() {
			let moved = self.start.transformed_by_move(source, target, how_many);
			return vec![Range::collapsed(moved)];
		}
		let move_range = Range::from_position_and_shift(source, how_many);
		let insert_position = target.transformed_by_deletion(source, how_many).unwrap_or_else(|| target.clone());

		if self.contains_position(target)
			&& !spread
			&& (move_range.contains_position(&self.start) || move_range.contains_position(&self.end))
		{
			let start = self.start.transformed_by_move(source, target, how_many);
			let end = self.end.transformed_by_move(source, target, how_many);
			return vec![Range::new(start, end)];
		}

		let difference_set = self.difference(&move_range);
		let common = self.intersection(&move_range);
		let difference = match difference_set.len() {
			1 => {
				let d = &difference_set[0];
				Some(Range::new(
					d.start.transformed_by_deletion(source, how_many).unwrap_or_else(|| source.clone()),
					d.end.transformed_by_deletion(source, how_many).unwrap_or_else(|| source.clone()),
				))
			}
			2 => Some(Range::new(
				self.start.clone(),
				self.end.transformed_by_deletion(source, how_many).unwrap_or_else(|| source.clone()),
			)),
			_ => None,
		};
		let mut result = match difference {
			Some(difference) => {
				difference.transformed_by_insertion(&insert_position, how_many, common.is_some() || spread)
			}
			None => Vec::new(),
		};
		if let Some(common) = common {
			let moved = Range::new(
				common.start.combined(&move_range.start, &insert_position),
				common.end.combined(&move_range.start, &insert_position),
			);
			if result.len() == 2 {
				result.insert(1, moved);
			} else {
				result.push(moved);
			}
		}
		result
	}
}

#[cfg(test)]
mod tests;
