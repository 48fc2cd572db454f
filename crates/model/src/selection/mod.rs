//! Selections: ordered, non-intersecting ranges with a direction.

mod blocks;
mod document;

pub use document::{DocumentSelection, GravityToken, STORE_ATTRIBUTE_PREFIX, SelectionEvent, store_attribute_key};

use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::node::{Attributes, NodeId, Tree};
use crate::position::Position;
use crate::range::Range;

/// Where inside or around a node a position should be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
	At(usize),
	End,
	Before,
	After,
}

/// Anything a selection can be set to.
#[derive(Debug, Clone)]
pub enum Selectable {
	/// Clears the selection.
	None,
	Position(Position),
	Range(Range),
	Ranges(Vec<Range>),
	/// A range spanning the node.
	On(NodeId),
	/// A range spanning the content of the element.
	In(NodeId),
	/// A collapsed range relative to a node.
	At(NodeId, Offset),
	Selection(Selection),
}

impl Selectable {
	/// Resolves the selectable to ranges and an optional direction override.
	pub fn into_ranges(self, tree: &Tree) -> Result<(Vec<Range>, Option<bool>)> {
		Ok(match self {
			Self::None => (Vec::new(), None),
			Self::Position(position) => (vec![Range::collapsed(position)], None),
			Self::Range(range) => (vec![range], None),
			Self::Ranges(ranges) => (ranges, None),
			Self::On(node) => (vec![Range::on_node(tree, node)?], None),
			Self::In(node) => {
				if tree.is_text(node) {
					return Err(ModelError::InvalidSelectable("cannot select inside a text node".into()));
				}
				(vec![Range::in_element(tree, node)], None)
			}
			Self::At(node, offset) => (vec![Range::collapsed(position_at(tree, node, offset)?)], None),
			Self::Selection(selection) => {
				let backward = selection.is_backward();
				(selection.ranges, Some(backward))
			}
		})
	}
}

/// Resolves an [`Offset`] relative to `node`.
pub fn position_at(tree: &Tree, node: NodeId, offset: Offset) -> Result<Position> {
	match offset {
		Offset::At(offset) => {
			if offset > tree.max_offset(node) {
				return Err(ModelError::InvalidPosition(format!("offset {offset} is past the node end")));
			}
			Ok(Position::at(tree, node, offset))
		}
		Offset::End => Ok(Position::at_end(tree, node)),
		Offset::Before => Position::before(tree, node),
		Offset::After => Position::after(tree, node),
	}
}

/// A detached selection value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
	ranges: Vec<Range>,
	backward: bool,
	attrs: Attributes,
}

impl Selection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Selection from a selectable.
	pub fn from_selectable(tree: &Tree, selectable: Selectable, backward: bool) -> Result<Self> {
		let mut selection = Self::new();
		selection.set_to(tree, selectable, backward)?;
		Ok(selection)
	}

	pub fn collapsed(position: Position) -> Self {
		Self {
			ranges: vec![Range::collapsed(position)],
			..Self::default()
		}
	}

	pub fn from_range(range: Range, backward: bool) -> Self {
		Self {
			ranges: vec![range],
			backward,
			..Self::default()
		}
	}

	/// Replaces the ranges. Fails if any two ranges intersect.
	pub fn set_to(&mut self, tree: &Tree, selectable: Selectable, backward: bool) -> Result<()> {
		let (ranges, override_backward) = selectable.into_ranges(tree)?;
		self.set_ranges(ranges, override_backward.unwrap_or(backward))
	}

	pub fn set_ranges(&mut self, ranges: Vec<Range>, backward: bool) -> Result<()> {
		check_ranges(&ranges)?;
		self.ranges = ranges;
		self.backward = backward && !self.ranges.is_empty();
		Ok(())
	}

	pub fn ranges(&self) -> &[Range] {
		&self.ranges
	}

	pub fn range_count(&self) -> usize {
		self.ranges.len()
	}

	pub fn is_backward(&self) -> bool {
		self.backward && !self.is_collapsed()
	}

	pub fn is_collapsed(&self) -> bool {
		self.ranges.len() == 1 && self.ranges[0].is_collapsed()
	}

	/// Anchor: the fixed end of the last range.
	pub fn anchor(&self) -> Option<Position> {
		let last = self.ranges.last()?;
		Some(if self.backward { last.end.clone() } else { last.start.clone() })
	}

	/// Focus: the moving end of the last range.
	pub fn focus(&self) -> Option<Position> {
		let last = self.ranges.last()?;
		Some(if self.backward { last.start.clone() } else { last.end.clone() })
	}

	pub fn first_range(&self) -> Option<&Range> {
		self.ranges
			.iter()
			.fold(None, |first: Option<&Range>, r| match first {
				Some(f) if !r.start.is_before(&f.start) => Some(f),
				_ => Some(r),
			})
	}

	pub fn last_range(&self) -> Option<&Range> {
		self.ranges.iter().fold(None, |last: Option<&Range>, r| match last {
			Some(l) if !r.end.is_after(&l.end) => Some(l),
			_ => Some(r),
		})
	}

	pub fn first_position(&self) -> Option<Position> {
		self.first_range().map(|r| r.start.clone())
	}

	pub fn last_position(&self) -> Option<Position> {
		self.last_range().map(|r| r.end.clone())
	}

	/// Moves the focus, keeping the anchor.
	pub fn set_focus(&mut self, focus: Position) -> Result<()> {
		let anchor = self.anchor().ok_or(ModelError::SelectionNoAnchor)?;
		if self.focus().as_ref() == Some(&focus) {
			return Ok(());
		}
		self.ranges.pop();
		let (range, backward) = if focus.is_before(&anchor) {
			(Range::new(focus, anchor), true)
		} else {
			(Range::new(anchor, focus), false)
		};
		check_ranges_with(&self.ranges, &range)?;
		self.ranges.push(range);
		self.backward = backward;
		Ok(())
	}

	/// The single element selected as a whole, if any.
	pub fn selected_element(&self, tree: &Tree) -> Option<NodeId> {
		if self.ranges.len() != 1 {
			return None;
		}
		self.ranges[0].contained_element(tree)
	}

	/// Returns whether the selection spans the whole content of `element`.
	pub fn contains_entire_content(&self, tree: &Tree, element: NodeId) -> bool {
		let (Some(first), Some(last)) = (self.first_position(), self.last_position()) else {
			return false;
		};
		Position::at(tree, element, 0).is_touching(&first, tree)
			&& Position::at_end(tree, element).is_touching(&last, tree)
	}

	pub fn attrs(&self) -> &Attributes {
		&self.attrs
	}

	pub fn attribute(&self, key: &str) -> Option<&Value> {
		self.attrs.get(key)
	}

	pub fn has_attribute(&self, key: &str) -> bool {
		self.attrs.contains_key(key)
	}

	pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
		self.attrs.insert(key.into(), value);
	}

	pub fn remove_attribute(&mut self, key: &str) {
		self.attrs.shift_remove(key);
	}

	pub fn set_attributes(&mut self, attrs: Attributes) {
		self.attrs = attrs;
	}
}

fn check_ranges(ranges: &[Range]) -> Result<()> {
	for (i, range) in ranges.iter().enumerate() {
		check_ranges_with(&ranges[..i], range)?;
	}
	Ok(())
}

fn check_ranges_with(existing: &[Range], range: &Range) -> Result<()> {
	if existing.iter().any(|r| r.is_intersecting(range)) {
		return Err(ModelError::SelectionRangeIntersects);
	}
	Ok(())
}

#[cfg(test)]
mod tests;
