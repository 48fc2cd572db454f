//! Schema-aware content algorithms built on top of the writer.
//!
//! Every algorithm takes an optional detached [`Selection`]. Without one it
//! works on the document selection and moves it to the result.

mod delete_content;
mod insert_content;
mod insert_object;
mod modify_selection;

use folio_primitives::{Direction, TextUnit};

use crate::error::Result;
use crate::live::LivePositionId;
use crate::position::Position;
use crate::schema::InsertionPlace;
use crate::selection::{Selectable, Selection};
use crate::writer::Writer;

/// Options of [`Writer::delete_content`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteContentOptions {
	/// Keep the blocks at both ends of the selection apart.
	pub leave_unmerged: bool,
	/// Never replace the whole limit element content with a paragraph.
	pub do_not_reset_entire_content: bool,
	/// Never insert a paragraph where text is not allowed.
	pub do_not_autoparagraph: bool,
}

/// Options of [`Writer::modify_selection`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifySelectionOptions {
	pub direction: Direction,
	pub unit: TextUnit,
	/// Overrides the configured default for the character unit.
	pub treat_emoji_as_single_unit: Option<bool>,
}

/// Where the selection goes after [`Writer::insert_object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSelection {
	/// On the inserted object.
	On,
	/// Into the next text-capable element, created when missing.
	After,
}

/// Options of [`Writer::insert_object`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertObjectOptions {
	/// Look for an insertion point that does not split a block.
	pub find_optimal_position: Option<InsertionPlace>,
	pub set_selection: Option<ObjectSelection>,
}

impl Writer<'_> {
	/// The selection an algorithm works on.
	pub(crate) fn selection_or_document(&self, selection: Option<&Selection>) -> Selection {
		match selection {
			Some(selection) => selection.clone(),
			None => self.document().selection().to_selection(),
		}
	}

	/// Moves the given selection, or the document selection without one.
	pub(crate) fn set_target_selection(&mut self, target: Option<&mut Selection>, selectable: Selectable) -> Result<()> {
		match target {
			Some(selection) => selection.set_to(self.tree(), selectable, false),
			None => self.set_selection(selectable, false),
		}
	}

	pub(crate) fn live_position_value(&self, id: LivePositionId) -> Result<Position> {
		self.document().live_position(id).cloned()
	}

	pub(crate) fn release_live_position(&mut self, id: LivePositionId) -> Result<Position> {
		self.document_mut().detach_live_position(id)
	}
}
