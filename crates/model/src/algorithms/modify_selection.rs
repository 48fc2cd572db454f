use folio_primitives::movement::{is_at_word_boundary, is_valid_stop};
use folio_primitives::{Direction, TextUnit};
use tracing::trace;

use super::ModifySelectionOptions;
use crate::error::{ModelError, Result};
use crate::node::{NodeId, Tree};
use crate::position::Position;
use crate::range::Range;
use crate::schema::Schema;
use crate::selection::Selection;
use crate::walker::{Item, StepKind, TreeWalker, WalkerOptions, WalkerValue};
use crate::writer::Writer;

struct Walk<'a> {
	schema: &'a Schema,
	forward: bool,
	unit: TextUnit,
	treat_emoji_as_single_unit: bool,
	word_boundaries: &'a str,
}

impl Writer<'_> {
	/// Moves the focus of the selection by one unit, extending or shrinking
	/// it. Selectable elements are stepped over whole; limit element
	/// boundaries end the walk.
	pub fn modify_selection(&mut self, selection: Option<&mut Selection>, options: ModifySelectionOptions) -> Result<()> {
		self.check()?;
		let current = self.selection_or_document(selection.as_deref());
		let focus = current.focus().ok_or(ModelError::SelectionNoAnchor)?;
		let schema = self.schema_rc();
		let config = self.config();
		let walk = Walk {
			schema: &schema,
			forward: options.direction.is_forward(),
			unit: options.unit,
			treat_emoji_as_single_unit: options
				.treat_emoji_as_single_unit
				.unwrap_or(config.treat_emoji_as_single_unit),
			word_boundaries: &config.word_boundary_characters,
		};
		let Some(position) = find_focus(self.tree(), &walk, focus) else {
			return Ok(());
		};
		trace!(focus = ?position.path, "selection focus moved");
		match selection {
			Some(selection) => selection.set_focus(position),
			None => self.set_selection_focus(position),
		}
	}
}

fn find_focus(tree: &Tree, walk: &Walk<'_>, focus: Position) -> Option<Position> {
	let root_edge = if walk.forward {
		Position::at_end(tree, focus.root)
	} else {
		Position::at(tree, focus.root, 0)
	};
	let mut walker = TreeWalker::new(tree, WalkerOptions {
		direction: if walk.forward { Direction::Forward } else { Direction::Backward },
		boundaries: Some(Range::new(focus, root_edge)),
		single_characters: true,
		..WalkerOptions::default()
	});
	while let Some(value) = walker.next() {
		if let Some(position) = try_extending_to(tree, walk, &mut walker, value) {
			return Some(position);
		}
	}
	None
}

fn try_extending_to(tree: &Tree, walk: &Walk<'_>, walker: &mut TreeWalker<'_>, value: WalkerValue) -> Option<Position> {
	let schema = walk.schema;
	let entering = if walk.forward { StepKind::ElementStart } else { StepKind::ElementEnd };
	match (value.kind, value.item) {
		(StepKind::Text, _) => Some(match walk.unit {
			TextUnit::Word => word_break_position(tree, walk, walker),
			unit => unit_position(tree, walk, walker, unit),
		}),
		(kind, Item::Element(element)) if kind == entering => {
			if schema.node_is_selectable(tree, element) {
				let edge = if walk.forward {
					Position::after(tree, element)
				} else {
					Position::before(tree, element)
				};
				return edge.ok();
			}
			schema
				.check_child_at(tree, &value.next_position, "$text")
				.then_some(value.next_position)
		}
		(_, Item::Element(element)) => {
			if schema.node_is_limit(tree, element) {
				walker.skip(|_| true);
				return None;
			}
			schema
				.check_child_at(tree, &value.next_position, "$text")
				.then_some(value.next_position)
		}
		(_, Item::Text(_)) => None,
	}
}

/// Walker position pushed past clusters the unit must not split.
fn unit_position(tree: &Tree, walk: &Walk<'_>, walker: &mut TreeWalker<'_>, unit: TextUnit) -> Position {
	let Some(text_node) = TreeWalker::position(walker).text_node(tree) else {
		return TreeWalker::position(walker).clone();
	};
	let data = tree.text(text_node).unwrap_or_default();
	let start = tree.start_offset(text_node).unwrap_or_default();
	loop {
		let offset = TreeWalker::position(walker).offset().saturating_sub(start);
		if is_valid_stop(data, offset, unit, walk.treat_emoji_as_single_unit) {
			break;
		}
		if walker.next().is_none() {
			break;
		}
	}
	TreeWalker::position(walker).clone()
}

/// Walker position advanced to the next word boundary. Crossing into a
/// text node with other attributes also ends the word.
fn word_break_position(tree: &Tree, walk: &Walk<'_>, walker: &mut TreeWalker<'_>) -> Position {
	let adjacent = |position: &Position| -> Option<NodeId> {
		if walk.forward {
			position.node_after(tree)
		} else {
			position.node_before(tree)
		}
	};
	let mut text_node = TreeWalker::position(walker)
		.text_node(tree)
		.or_else(|| adjacent(TreeWalker::position(walker)));
	while let Some(node) = text_node.filter(|&n| tree.is_text(n)) {
		let data = tree.text(node).unwrap_or_default();
		let offset = TreeWalker::position(walker)
			.offset()
			.saturating_sub(tree.start_offset(node).unwrap_or_default());
		let node_edge = if walk.forward { tree.size(node) } else { 0 };
		if offset == node_edge {
			text_node = adjacent(TreeWalker::position(walker));
		} else if is_at_word_boundary(data, offset, walk.forward, walk.word_boundaries) {
			break;
		} else if walker.next().is_none() {
			break;
		}
	}
	TreeWalker::position(walker).clone()
}
