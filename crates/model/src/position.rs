//! Positions: a root plus a path of offsets.

use std::cmp::Ordering;

use folio_primitives::Stickiness;
use smallvec::SmallVec;

use crate::error::{ModelError, Result};
use crate::node::{NodeId, Tree};

/// Offsets from a root down to a point between two children.
pub type Path = SmallVec<[usize; 4]>;

/// Result of comparing two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
	Before,
	Same,
	After,
	/// The positions are in different roots.
	Different,
}

/// Result of comparing two paths element by element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathRelation {
	Same,
	/// The first path is a proper prefix of the second.
	Prefix,
	/// The second path is a proper prefix of the first.
	Extension,
	/// Index of the first differing step.
	Differs(usize),
}

pub(crate) fn compare_paths(a: &[usize], b: &[usize]) -> PathRelation {
	let len = a.len().min(b.len());
	for i in 0..len {
		if a[i] != b[i] {
			return PathRelation::Differs(i);
		}
	}
	match a.len().cmp(&b.len()) {
		Ordering::Equal => PathRelation::Same,
		Ordering::Less => PathRelation::Prefix,
		Ordering::Greater => PathRelation::Extension,
	}
}

/// A location between two children of some element, addressed by offsets.
///
/// Equality and hashing ignore [`Stickiness`].
#[derive(Debug, Clone)]
pub struct Position {
	pub root: NodeId,
	pub path: Path,
	pub stickiness: Stickiness,
}

impl PartialEq for Position {
	fn eq(&self, other: &Self) -> bool {
		self.root == other.root && self.path == other.path
	}
}

impl Eq for Position {}

impl std::hash::Hash for Position {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.root.hash(state);
		self.path.hash(state);
	}
}

impl Position {
	/// Creates a position without checking it against a tree. An empty path
	/// is replaced with `[0]`.
	pub fn new(root: NodeId, path: impl IntoIterator<Item = usize>) -> Self {
		let mut path: Path = path.into_iter().collect();
		if path.is_empty() {
			path.push(0);
		}
		Self {
			root,
			path,
			stickiness: Stickiness::ToNone,
		}
	}

	/// Creates a position and verifies it resolves in `tree`.
	pub fn checked(tree: &Tree, root: NodeId, path: impl IntoIterator<Item = usize>) -> Result<Self> {
		let position = Self::new(root, path);
		tree.parent_of_path(root, &position.path)?;
		Ok(position)
	}

	/// Position at `offset` inside `parent`.
	pub fn at(tree: &Tree, parent: NodeId, offset: usize) -> Self {
		let root = tree.root_of(parent);
		let mut path: Path = tree.path_of(parent).into_iter().collect();
		path.push(offset);
		Self {
			root,
			path,
			stickiness: Stickiness::ToNone,
		}
	}

	/// Position at the end of `parent`.
	pub fn at_end(tree: &Tree, parent: NodeId) -> Self {
		Self::at(tree, parent, tree.max_offset(parent))
	}

	/// Position directly before `node`.
	pub fn before(tree: &Tree, node: NodeId) -> Result<Self> {
		let parent = tree.parent(node).ok_or_else(|| {
			ModelError::InvalidPosition("cannot create a position before a node without a parent".into())
		})?;
		let offset = tree.start_offset(node).ok_or(ModelError::NodeNotFound)?;
		Ok(Self::at(tree, parent, offset))
	}

	/// Position directly after `node`.
	pub fn after(tree: &Tree, node: NodeId) -> Result<Self> {
		Ok(Self::before(tree, node)?.shifted_by(tree.size(node) as isize))
	}

	pub fn with_stickiness(mut self, stickiness: Stickiness) -> Self {
		self.stickiness = stickiness;
		self
	}

	/// Offset in the parent.
	pub fn offset(&self) -> usize {
		self.path.last().copied().unwrap_or(0)
	}

	pub fn set_offset(&mut self, offset: usize) {
		if let Some(last) = self.path.last_mut() {
			*last = offset;
		}
	}

	pub fn parent_path(&self) -> &[usize] {
		&self.path[..self.path.len() - 1]
	}

	/// Position moved by `shift` within the same parent, clamped at zero.
	pub fn shifted_by(&self, shift: isize) -> Self {
		let mut shifted = self.clone();
		let offset = self.offset() as isize;
		shifted.set_offset(offset.saturating_add(shift).max(0) as usize);
		shifted
	}

	/// Position with the same root and a truncated path.
	pub(crate) fn with_path(&self, path: &[usize]) -> Self {
		Self {
			root: self.root,
			path: path.iter().copied().collect(),
			stickiness: self.stickiness,
		}
	}

	pub fn compare(&self, other: &Position) -> Relation {
		if self.root != other.root {
			return Relation::Different;
		}
		match compare_paths(&self.path, &other.path) {
			PathRelation::Same => Relation::Same,
			PathRelation::Prefix => Relation::Before,
			PathRelation::Extension => Relation::After,
			PathRelation::Differs(i) => {
				if self.path[i] < other.path[i] {
					Relation::Before
				} else {
					Relation::After
				}
			}
		}
	}

	pub fn is_before(&self, other: &Position) -> bool {
		self.compare(other) == Relation::Before
	}

	pub fn is_after(&self, other: &Position) -> bool {
		self.compare(other) == Relation::After
	}

	pub fn has_same_parent_as(&self, other: &Position) -> bool {
		self.root == other.root && self.parent_path() == other.parent_path()
	}

	/// Longest common prefix of both paths.
	pub fn common_path(&self, other: &Position) -> Vec<usize> {
		if self.root != other.root {
			return Vec::new();
		}
		let len = match compare_paths(&self.path, &other.path) {
			PathRelation::Same => self.path.len(),
			PathRelation::Prefix => self.path.len(),
			PathRelation::Extension => other.path.len(),
			PathRelation::Differs(i) => i,
		};
		self.path[..len].to_vec()
	}

	/// Element or fragment the position is in.
	pub fn parent(&self, tree: &Tree) -> Result<NodeId> {
		tree.parent_of_path(self.root, &self.path)
	}

	/// Index of the child that starts at or contains this position.
	pub fn index(&self, tree: &Tree) -> Result<usize> {
		tree.offset_to_index(self.parent(tree)?, self.offset())
	}

	/// Text node the position is strictly inside of.
	pub fn text_node(&self, tree: &Tree) -> Option<NodeId> {
		let parent = self.parent(tree).ok()?;
		tree.text_node_at(parent, self.offset())
	}

	pub fn node_after(&self, tree: &Tree) -> Option<NodeId> {
		let parent = self.parent(tree).ok()?;
		tree.node_after(parent, self.offset())
	}

	pub fn node_before(&self, tree: &Tree) -> Option<NodeId> {
		let parent = self.parent(tree).ok()?;
		tree.node_before(parent, self.offset())
	}

	pub fn is_at_start(&self) -> bool {
		self.offset() == 0
	}

	pub fn is_at_end(&self, tree: &Tree) -> bool {
		self.parent(tree).is_ok_and(|p| tree.max_offset(p) == self.offset())
	}

	/// Ancestors of the position from the root down to its parent.
	pub fn ancestors(&self, tree: &Tree) -> Vec<NodeId> {
		match self.parent(tree) {
			Ok(parent) => tree.ancestors(parent, true),
			Err(_) => Vec::new(),
		}
	}

	/// Deepest element containing both positions.
	pub fn common_ancestor(&self, other: &Position, tree: &Tree) -> Option<NodeId> {
		let a = self.ancestors(tree);
		let b = other.ancestors(tree);
		a.iter().zip(b.iter()).take_while(|(x, y)| x == y).last().map(|(x, _)| *x)
	}

	/// Returns whether the two positions are equal or separated only by
	/// element boundaries.
	pub fn is_touching(&self, other: &Position, tree: &Tree) -> bool {
		let (mut left, mut right) = match self.compare(other) {
			Relation::Same => return true,
			Relation::Before => (self.clone(), other.clone()),
			Relation::After => (other.clone(), self.clone()),
			Relation::Different => return false,
		};
		let Ok(mut left_parent) = left.parent(tree) else {
			return false;
		};
		while left.path.len() + right.path.len() > 0 {
			if left == right {
				return true;
			}
			if left.path.len() > right.path.len() {
				if left.offset() != tree.max_offset(left_parent) {
					return false;
				}
				left.path.pop();
				if left.path.is_empty() {
					return false;
				}
				left_parent = match tree.parent(left_parent) {
					Some(p) => p,
					None => return false,
				};
				let offset = left.offset() + 1;
				left.set_offset(offset);
			} else {
				if right.offset() != 0 {
					return false;
				}
				right.path.pop();
				if right.path.is_empty() {
					return false;
				}
			}
		}
		false
	}

	/// Position after `how_many` offsets were inserted at `at`.
	pub fn transformed_by_insertion(&self, at: &Position, how_many: usize) -> Position {
		let mut transformed = self.clone();
		if self.root != at.root {
			return transformed;
		}
		match compare_paths(at.parent_path(), self.parent_path()) {
			PathRelation::Same => {
				if at.offset() < self.offset()
					|| (at.offset() == self.offset() && self.stickiness.moves_with_insertion())
				{
					transformed.set_offset(self.offset() + how_many);
				}
			}
			PathRelation::Prefix => {
				let i = at.path.len() - 1;
				if at.offset() <= self.path[i] {
					transformed.path[i] += how_many;
				}
			}
			_ => {}
		}
		transformed
	}

	/// Position after `how_many` offsets were removed at `at`, or `None` if
	/// it was inside the removed span.
	pub fn transformed_by_deletion(&self, at: &Position, how_many: usize) -> Option<Position> {
		let mut transformed = self.clone();
		if self.root != at.root {
			return Some(transformed);
		}
		match compare_paths(at.parent_path(), self.parent_path()) {
			PathRelation::Same => {
				if at.offset() < self.offset() {
					if at.offset() + how_many > self.offset() {
						return None;
					}
					transformed.set_offset(self.offset() - how_many);
				}
			}
			PathRelation::Prefix => {
				let i = at.path.len() - 1;
				if at.offset() <= self.path[i] {
					if at.offset() + how_many > self.path[i] {
						return None;
					}
					transformed.path[i] -= how_many;
				}
			}
			_ => {}
		}
		Some(transformed)
	}

	/// Position after `how_many` offsets at `source` moved to `target`
	/// (`target` given in pre-move coordinates).
	pub fn transformed_by_move(&self, source: &Position, target: &Position, how_many: usize) -> Position {
		let target = target.transformed_by_deletion(source, how_many).unwrap_or_else(|| target.clone());
		if *source == target {
			return self.clone();
		}
		let transformed = self.transformed_by_deletion(source, how_many);
		let moved = match &transformed {
			None => true,
			Some(_) => {
				(source == self && self.stickiness == Stickiness::ToNext)
					|| (source.shifted_by(how_many as isize) == *self && self.stickiness == Stickiness::ToPrevious)
			}
		};
		match transformed {
			Some(transformed) if !moved => transformed.transformed_by_insertion(&target, how_many),
			_ => self.combined(source, &target),
		}
	}

	/// Re-anchors this position, which lies inside content starting at
	/// `source`, onto the same content placed at `target`.
	pub fn combined(&self, source: &Position, target: &Position) -> Position {
		let i = source.path.len() - 1;
		let mut combined = target.clone();
		combined.stickiness = self.stickiness;
		let offset = (combined.offset() + self.path[i]).saturating_sub(source.offset());
		combined.set_offset(offset);
		combined.path.extend(self.path[i + 1..].iter().copied());
		combined
	}
}

impl PartialOrd for Position {
	/// Positions in different roots are incomparable.
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		match self.compare(other) {
			Relation::Before => Some(Ordering::Less),
			Relation::Same => Some(Ordering::Equal),
			Relation::After => Some(Ordering::Greater),
			Relation::Different => None,
		}
	}
}
