use folio_primitives::{Direction, Stickiness};
use serde_json::Value;
use tracing::trace;

use super::{DeleteContentOptions, ModifySelectionOptions};
use crate::error::Result;
use crate::live::LivePositionId;
use crate::model::{ContentTarget, HasContentOptions};
use crate::node::{Attributes, NodeId, Tree};
use crate::position::Position;
use crate::range::Range;
use crate::schema::Schema;
use crate::selection::{Selectable, Selection};
use crate::walker::WalkerOptions;
use crate::writer::Writer;

const IGNORE_MARKERS: HasContentOptions = HasContentOptions {
	ignore_whitespaces: false,
	ignore_markers: true,
};

impl Writer<'_> {
	/// Deletes the content of the selection, merging the blocks at both
	/// ends, and collapses the selection where the content was.
	pub fn delete_content(&mut self, mut selection: Option<&mut Selection>, options: DeleteContentOptions) -> Result<()> {
		self.check()?;
		let current = self.selection_or_document(selection.as_deref());
		if current.is_collapsed() {
			return Ok(());
		}
		let Some(range) = current.first_range().cloned() else {
			return Ok(());
		};
		if range.root() == self.document().graveyard() {
			return Ok(());
		}
		let schema = self.schema_rc();

		if !options.do_not_reset_entire_content && self.should_replace_entire_content(&schema, &current) {
			return self.replace_entire_content_with_paragraph(&schema, &current, selection);
		}

		let mut paragraph_attributes = Vec::new();
		if !options.do_not_autoparagraph
			&& let Some(selected) = current.selected_element(self.tree())
		{
			paragraph_attributes =
				schema.attributes_with_property(self.tree(), selected, |p| p.copy_on_replace == Some(true));
		}

		let (start, end) = self.live_positions_for_selected_blocks(&range)?;
		let start_value = self.live_position_value(start)?;
		let end_value = self.live_position_value(end)?;
		if !start_value.is_touching(&end_value, self.tree()) {
			trace!(start = ?start_value.path, end = ?end_value.path, "deleting content");
			self.remove(Range::new(start_value, end_value))?;
		}

		if !options.leave_unmerged {
			let start_value = self.live_position_value(start)?;
			let end_value = self.live_position_value(end)?;
			self.merge_branches(&schema, start_value, end_value)?;
			let start_value = self.live_position_value(start)?;
			let parent = start_value.parent(self.tree())?;
			let children = self.tree().children(parent).to_vec();
			schema.remove_disallowed_attributes(&children, self)?;
		}

		let start_value = self.release_live_position(start)?;
		self.release_live_position(end)?;
		self.set_target_selection(selection.as_deref_mut(), Selectable::Position(start_value.clone()))?;

		if !options.do_not_autoparagraph && self.should_autoparagraph(&schema, &start_value) {
			self.insert_paragraph(&schema, start_value, selection, paragraph_attributes)?;
		}
		Ok(())
	}

	fn should_replace_entire_content(&self, schema: &Schema, selection: &Selection) -> bool {
		let tree = self.tree();
		let Some(limit) = schema.limit_element(tree, selection.ranges()) else {
			return false;
		};
		if !selection.contains_entire_content(tree, limit) {
			return false;
		}
		let Some(range) = selection.first_range() else {
			return false;
		};
		if range.start.parent_path() == range.end.parent_path() {
			return false;
		}
		schema.check_child_in(tree, limit, &self.config().paragraph_element)
	}

	fn replace_entire_content_with_paragraph(
		&mut self,
		schema: &Schema,
		selection: &Selection,
		target: Option<&mut Selection>,
	) -> Result<()> {
		let Some(limit) = schema.limit_element(self.tree(), selection.ranges()) else {
			return Ok(());
		};
		let content = self.create_range_in(limit);
		self.remove(content)?;
		let position = Position::at(self.tree(), limit, 0);
		self.insert_paragraph(schema, position, target, Vec::new())
	}

	pub(crate) fn insert_paragraph(
		&mut self,
		schema: &Schema,
		position: Position,
		target: Option<&mut Selection>,
		attributes: Vec<(String, Value)>,
	) -> Result<()> {
		let name = self.config().paragraph_element.clone();
		let paragraph = self.create_element(&name, Attributes::new());
		schema.set_allowed_attributes(paragraph, attributes, self)?;
		self.insert(paragraph, position)?;
		let inside = Position::at(self.tree(), paragraph, 0);
		self.set_target_selection(target, Selectable::Position(inside))
	}

	fn should_autoparagraph(&self, schema: &Schema, position: &Position) -> bool {
		let tree = self.tree();
		!schema.check_child_at(tree, position, "$text")
			&& schema.check_child_at(tree, position, &self.config().paragraph_element)
	}

	/// Live boundaries of the deletion. A trailing block the range only
	/// touches at its start is left out so it is not merged.
	fn live_positions_for_selected_blocks(
		&mut self,
		range: &Range,
	) -> Result<(LivePositionId, LivePositionId)> {
		let schema = self.schema_rc();
		let start = range.start.clone();
		let mut end = range.end.clone();

		if self.model().has_content(ContentTarget::Range(range.clone()), IGNORE_MARKERS)
			&& let Some(end_block) = parent_block(self.tree(), &schema, &end)
			&& end.is_touching(&Position::at(self.tree(), end_block, 0), self.tree())
		{
			let mut probe = Selection::from_range(range.clone(), false);
			self.modify_selection(Some(&mut probe), ModifySelectionOptions {
				direction: Direction::Backward,
				..ModifySelectionOptions::default()
			})?;
			if let Some(new_end) = probe.last_position() {
				let skipped = Range::new(new_end.clone(), end.clone());
				if !self.model().has_content(ContentTarget::Range(skipped), IGNORE_MARKERS) {
					end = new_end;
				}
			}
		}

		Ok((
			self.create_live_position(start.with_stickiness(Stickiness::ToPrevious)),
			self.create_live_position(end.with_stickiness(Stickiness::ToNext)),
		))
	}

	fn merge_branches(&mut self, schema: &Schema, start: Position, end: Position) -> Result<()> {
		if !self.should_merge(schema, &start, &end)? {
			return Ok(());
		}
		let tree = self.tree();
		let start_ancestors = start.ancestors(tree);
		let end_ancestors = end.ancestors(tree);
		let common = start_ancestors
			.iter()
			.zip(end_ancestors.iter())
			.take_while(|(a, b)| a == b)
			.count();
		let (Some(&start_ancestor), Some(&end_ancestor)) = (start_ancestors.get(common), end_ancestors.get(common))
		else {
			return Ok(());
		};
		let Some(common_ancestor) = tree.parent(start_ancestor) else {
			return Ok(());
		};
		let start_empty = !self
			.model()
			.has_content(ContentTarget::Element(start_ancestor), IGNORE_MARKERS);
		let end_empty = !self
			.model()
			.has_content(ContentTarget::Element(end_ancestor), IGNORE_MARKERS);
		if start_empty && !end_empty {
			self.merge_branches_right(schema, start, end, common_ancestor)
		} else {
			self.merge_branches_left(schema, start, end, common_ancestor)
		}
	}

	/// Merges the end branch into the start branch, level by level.
	fn merge_branches_left(
		&mut self,
		schema: &Schema,
		mut start: Position,
		mut end: Position,
		common_ancestor: NodeId,
	) -> Result<()> {
		loop {
			let tree = self.tree();
			let start_element = start.parent(tree)?;
			let end_element = end.parent(tree)?;
			if start_element == common_ancestor || end_element == common_ancestor {
				return Ok(());
			}
			start = Position::after(tree, start_element)?;
			end = Position::before(tree, end_element)?;
			if end != start {
				self.insert(end_element, start.clone())?;
			}
			self.merge(start.clone())?;

			while self.tree().is_empty(end.parent(self.tree())?) {
				let parent = end.parent(self.tree())?;
				end = Position::before(self.tree(), parent)?;
				self.remove(parent)?;
			}
			if !self.should_merge(schema, &start, &end)? {
				return Ok(());
			}
		}
	}

	/// Merges the start branch into the end branch, keeping the end
	/// elements' names and attributes.
	fn merge_branches_right(
		&mut self,
		schema: &Schema,
		mut start: Position,
		mut end: Position,
		common_ancestor: NodeId,
	) -> Result<()> {
		loop {
			let tree = self.tree();
			let start_element = start.parent(tree)?;
			let end_element = end.parent(tree)?;
			if start_element == common_ancestor || end_element == common_ancestor {
				return Ok(());
			}
			start = Position::after(tree, start_element)?;
			end = Position::before(tree, end_element)?;
			if end != start {
				self.insert(start_element, end.clone())?;
			}

			while self.tree().is_empty(start.parent(self.tree())?) {
				let parent = start.parent(self.tree())?;
				start = Position::before(self.tree(), parent)?;
				self.remove(parent)?;
			}
			end = Position::before(self.tree(), end_element)?;
			self.merge_right(end.clone())?;

			if !self.should_merge(schema, &start, &end)? {
				return Ok(());
			}
		}
	}

	/// Merges the element after `position` into the one before it, after
	/// giving the left one the right one's name and attributes.
	fn merge_right(&mut self, position: Position) -> Result<()> {
		let tree = self.tree();
		let (Some(start_element), Some(end_element)) = (position.node_before(tree), position.node_after(tree)) else {
			return self.merge(position);
		};
		let end_name = tree.name(end_element).unwrap_or_default().to_string();
		let end_attrs = tree.attrs(end_element).clone();
		if tree.name(start_element) != Some(end_name.as_str()) {
			self.rename(start_element, &end_name)?;
		}
		self.clear_attributes(start_element)?;
		self.set_attributes(end_attrs, start_element)?;
		self.merge(position)
	}

	fn should_merge(&self, schema: &Schema, start: &Position, end: &Position) -> Result<bool> {
		let tree = self.tree();
		let start_element = start.parent(tree)?;
		let end_element = end.parent(tree)?;
		if start_element == end_element {
			return Ok(false);
		}
		if schema.node_is_limit(tree, start_element) || schema.node_is_limit(tree, end_element) {
			return Ok(false);
		}
		Ok(!is_crossing_limit_element(tree, schema, start, end))
	}
}

/// Nearest block containing `position`, unless a limit element comes first.
pub(crate) fn parent_block(tree: &Tree, schema: &Schema, position: &Position) -> Option<NodeId> {
	let parent = position.parent(tree).ok()?;
	for element in tree.ancestors(parent, true).into_iter().rev() {
		if schema.node_is_limit(tree, element) {
			return None;
		}
		if schema.node_is_block(tree, element) {
			return Some(element);
		}
	}
	None
}

fn is_crossing_limit_element(tree: &Tree, schema: &Schema, left: &Position, right: &Position) -> bool {
	Range::new(left.clone(), right.clone())
		.walker(tree, WalkerOptions::default())
		.any(|value| {
			value
				.item
				.as_element()
				.is_some_and(|element| schema.node_is_limit(tree, element))
		})
}
