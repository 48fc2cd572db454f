use rustc_hash::FxHashSet;

use super::Selection;
use crate::node::{NodeId, Tree};
use crate::position::Position;
use crate::range::Range;
use crate::schema::Schema;
use crate::walker::{StepKind, WalkerOptions};

impl Selection {
	/// Top-most blocks touched by the selection, in range order.
	///
	/// A block in which a non-collapsed range only ends at its very
	/// beginning is not included; a block in which a range starts at its
	/// very end is.
	pub fn selected_blocks(&self, tree: &Tree, schema: &Schema) -> Vec<NodeId> {
		let mut visited = FxHashSet::default();
		let mut blocks = Vec::new();
		for range in &self.ranges {
			if let Some(start_block) = parent_block(tree, schema, &range.start, &mut visited)
				&& is_top_block_in_range(tree, schema, start_block, range)
			{
				blocks.push(start_block);
			}
			for value in range.walker(tree, WalkerOptions::default()) {
				if value.kind != StepKind::ElementEnd {
					continue;
				}
				let block = value.item.node();
				if is_unvisited_block(tree, schema, block, &mut visited)
					&& is_top_block_in_range(tree, schema, block, range)
				{
					blocks.push(block);
				}
			}
			if let Some(end_block) = parent_block(tree, schema, &range.end, &mut visited)
				&& !range.end.is_touching(&Position::at(tree, end_block, 0), tree)
				&& is_top_block_in_range(tree, schema, end_block, range)
			{
				blocks.push(end_block);
			}
		}
		blocks
	}
}

fn is_unvisited_block(tree: &Tree, schema: &Schema, element: NodeId, visited: &mut FxHashSet<NodeId>) -> bool {
	if !visited.insert(element) {
		return false;
	}
	schema.node_is_block(tree, element) && tree.parent(element).is_some()
}

fn parent_block(tree: &Tree, schema: &Schema, position: &Position, visited: &mut FxHashSet<NodeId>) -> Option<NodeId> {
	let parent = position.parent(tree).ok()?;
	let mut ancestors = tree.ancestors(parent, true);
	ancestors.reverse();
	let mut found = None;
	for &element in &ancestors {
		if schema.node_is_limit(tree, element) {
			break;
		}
		if is_unvisited_block(tree, schema, element, visited) {
			found = Some(element);
			break;
		}
	}
	visited.extend(ancestors);
	found
}

fn is_top_block_in_range(tree: &Tree, schema: &Schema, block: NodeId, range: &Range) -> bool {
	let mut parent = tree.parent(block);
	while let Some(current) = parent {
		if schema.node_is_block(tree, current) {
			return match Range::on_node(tree, current) {
				Ok(on) => !range.contains_range(&on, true),
				Err(_) => true,
			};
		}
		parent = tree.parent(current);
	}
	true
}
