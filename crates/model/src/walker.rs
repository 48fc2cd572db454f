//! Depth-first traversal of the tree between positions.

use folio_primitives::Direction;

use crate::node::{Attributes, NodeId, Tree};
use crate::position::Position;
use crate::range::Range;

/// A slice of a text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextProxy {
	pub node: NodeId,
	pub offset_in_text: usize,
	pub data: String,
}

impl TextProxy {
	pub fn len(&self) -> usize {
		self.data.chars().count()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	pub fn attrs<'t>(&self, tree: &'t Tree) -> &'t Attributes {
		tree.attrs(self.node)
	}
}

/// What the walker stepped over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
	Element(NodeId),
	Text(TextProxy),
}

impl Item {
	/// The underlying node; for text, the whole text node.
	pub fn node(&self) -> NodeId {
		match self {
			Self::Element(id) => *id,
			Self::Text(proxy) => proxy.node,
		}
	}

	pub fn as_element(&self) -> Option<NodeId> {
		match self {
			Self::Element(id) => Some(*id),
			Self::Text(_) => None,
		}
	}

	pub fn is_text(&self) -> bool {
		matches!(self, Self::Text(_))
	}

	/// Schema item name: element name or `$text`.
	pub fn item_name<'t>(&self, tree: &'t Tree) -> &'t str {
		match self {
			Self::Element(id) => tree.name(*id).unwrap_or_default(),
			Self::Text(_) => "$text",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
	ElementStart,
	ElementEnd,
	Text,
}

/// One walker step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkerValue {
	pub kind: StepKind,
	pub item: Item,
	pub previous_position: Position,
	pub next_position: Position,
	/// Offset size of the item; zero for element ends.
	pub length: usize,
}

#[derive(Debug, Clone, Default)]
pub struct WalkerOptions {
	pub direction: Direction,
	pub boundaries: Option<Range>,
	/// Defaults to the boundary start (forward) or end (backward).
	pub start_position: Option<Position>,
	/// Yield text one character at a time.
	pub single_characters: bool,
	/// Step over elements instead of entering them.
	pub shallow: bool,
	pub ignore_element_end: bool,
}

/// Iterator over [`WalkerValue`]s.
pub struct TreeWalker<'t> {
	tree: &'t Tree,
	options: WalkerOptions,
	position: Position,
	visited_parent: Option<NodeId>,
	boundary_start_parent: Option<NodeId>,
	boundary_end_parent: Option<NodeId>,
}

impl<'t> TreeWalker<'t> {
	pub fn new(tree: &'t Tree, options: WalkerOptions) -> Self {
		let position = match (&options.start_position, &options.boundaries) {
			(Some(start), _) => start.clone(),
			(None, Some(b)) if options.direction.is_forward() => b.start.clone(),
			(None, Some(b)) => b.end.clone(),
			(None, None) => Position::new(NodeId(0, 0), [0]),
		};
		let boundary_start_parent = options.boundaries.as_ref().and_then(|b| b.start.parent(tree).ok());
		let boundary_end_parent = options.boundaries.as_ref().and_then(|b| b.end.parent(tree).ok());
		let visited_parent = position.parent(tree).ok();
		Self {
			tree,
			options,
			position,
			visited_parent,
			boundary_start_parent,
			boundary_end_parent,
		}
	}

	/// Walker starting at `position` with no boundaries.
	pub fn from_position(tree: &'t Tree, position: Position, direction: Direction) -> Self {
		Self::new(tree, WalkerOptions {
			direction,
			start_position: Some(position),
			..WalkerOptions::default()
		})
	}

	pub fn position(&self) -> &Position {
		&self.position
	}

	/// Moves the walker to `position`.
	pub fn jump_to(&mut self, position: Position) {
		self.visited_parent = position.parent(self.tree).ok();
		self.position = position;
	}

	/// Advances while `skip` returns true, leaving the walker before the
	/// first value it rejected.
	pub fn skip(&mut self, mut skip: impl FnMut(&WalkerValue) -> bool) {
		loop {
			let prev_position = self.position.clone();
			let prev_parent = self.visited_parent;
			match self.next() {
				None => return,
				Some(value) if skip(&value) => {}
				Some(_) => {
					self.position = prev_position;
					self.visited_parent = prev_parent;
					return;
				}
			}
		}
	}

	fn step_forward(&mut self) -> Option<WalkerValue> {
		let tree = self.tree;
		let previous_position = self.position.clone();
		let mut position = self.position.clone();
		let parent = self.visited_parent?;
		if tree.parent(parent).is_none() && position.offset() == tree.max_offset(parent) {
			return None;
		}
		if let (Some(end_parent), Some(b)) = (self.boundary_end_parent, &self.options.boundaries)
			&& end_parent == parent
			&& position.offset() == b.end.offset()
		{
			return None;
		}
		let node = tree.child_at_offset(parent, position.offset()).map(|(n, _)| n);
		match node {
			Some(node) if tree.is_element(node) => {
				if self.options.shallow {
					if self.options.boundaries.as_ref().is_some_and(|b| b.end.is_before(&position)) {
						return None;
					}
					let offset = position.offset() + 1;
					position.set_offset(offset);
				} else {
					position.path.push(0);
					self.visited_parent = Some(node);
				}
				self.position = position.clone();
				Some(WalkerValue {
					kind: StepKind::ElementStart,
					item: Item::Element(node),
					previous_position,
					next_position: position,
					length: 1,
				})
			}
			Some(node) => {
				let count = if self.options.single_characters {
					1
				} else {
					let mut end = tree.end_offset(node).unwrap_or(position.offset());
					if let (Some(end_parent), Some(b)) = (self.boundary_end_parent, &self.options.boundaries)
						&& end_parent == parent
						&& b.end.offset() < end
					{
						end = b.end.offset();
					}
					end - position.offset()
				};
				let start = tree.start_offset(node).unwrap_or(0);
				let proxy = text_proxy(tree, node, position.offset() - start, count);
				let offset = position.offset() + count;
				position.set_offset(offset);
				self.position = position.clone();
				Some(WalkerValue {
					kind: StepKind::Text,
					item: Item::Text(proxy),
					previous_position,
					next_position: position,
					length: count,
				})
			}
			None => {
				position.path.pop();
				let offset = position.offset() + 1;
				position.set_offset(offset);
				self.position = position.clone();
				self.visited_parent = tree.parent(parent);
				if self.options.ignore_element_end {
					return self.step_forward();
				}
				Some(WalkerValue {
					kind: StepKind::ElementEnd,
					item: Item::Element(parent),
					previous_position,
					next_position: position,
					length: 0,
				})
			}
		}
	}

	fn step_backward(&mut self) -> Option<WalkerValue> {
		let tree = self.tree;
		let previous_position = self.position.clone();
		let mut position = self.position.clone();
		let parent = self.visited_parent?;
		if tree.parent(parent).is_none() && position.offset() == 0 {
			return None;
		}
		if let (Some(start_parent), Some(b)) = (self.boundary_start_parent, &self.options.boundaries)
			&& start_parent == parent
			&& position.offset() == b.start.offset()
		{
			return None;
		}
		let node = if position.offset() == 0 {
			None
		} else {
			tree.child_at_offset(parent, position.offset() - 1).map(|(n, _)| n)
		};
		match node {
			Some(node) if tree.is_element(node) => {
				let offset = position.offset() - 1;
				position.set_offset(offset);
				if self.options.shallow {
					self.position = position.clone();
					return Some(WalkerValue {
						kind: StepKind::ElementStart,
						item: Item::Element(node),
						previous_position,
						next_position: position,
						length: 1,
					});
				}
				position.path.push(tree.max_offset(node));
				self.position = position.clone();
				self.visited_parent = Some(node);
				if self.options.ignore_element_end {
					return self.step_backward();
				}
				Some(WalkerValue {
					kind: StepKind::ElementEnd,
					item: Item::Element(node),
					previous_position,
					next_position: position,
					length: 0,
				})
			}
			Some(node) => {
				let start = tree.start_offset(node).unwrap_or(0);
				let count = if self.options.single_characters {
					1
				} else {
					let mut begin = start;
					if let (Some(start_parent), Some(b)) = (self.boundary_start_parent, &self.options.boundaries)
						&& start_parent == parent
						&& b.start.offset() > begin
					{
						begin = b.start.offset();
					}
					position.offset() - begin
				};
				let proxy = text_proxy(tree, node, position.offset() - start - count, count);
				let offset = position.offset() - count;
				position.set_offset(offset);
				self.position = position.clone();
				Some(WalkerValue {
					kind: StepKind::Text,
					item: Item::Text(proxy),
					previous_position,
					next_position: position,
					length: count,
				})
			}
			None => {
				position.path.pop();
				self.position = position.clone();
				self.visited_parent = tree.parent(parent);
				Some(WalkerValue {
					kind: StepKind::ElementStart,
					item: Item::Element(parent),
					previous_position,
					next_position: position,
					length: 1,
				})
			}
		}
	}
}

fn text_proxy(tree: &Tree, node: NodeId, offset_in_text: usize, count: usize) -> TextProxy {
	let data = tree
		.text(node)
		.map(|t| t.chars().skip(offset_in_text).take(count).collect())
		.unwrap_or_default();
	TextProxy {
		node,
		offset_in_text,
		data,
	}
}

impl Iterator for TreeWalker<'_> {
	type Item = WalkerValue;

	fn next(&mut self) -> Option<WalkerValue> {
		match self.options.direction {
			Direction::Forward => self.step_forward(),
			Direction::Backward => self.step_backward(),
		}
	}
}
