use serde_json::Value;

use super::Writer;
use crate::error::Result;
use crate::node::{Attributes, NodeId};
use crate::position::Position;
use crate::selection::{GravityToken, Selectable, Selection, store_attribute_key};

impl Writer<'_> {
	/// Moves the document selection.
	pub fn set_selection(&mut self, selectable: Selectable, backward: bool) -> Result<()> {
		self.check()?;
		let selection = Selection::from_selectable(self.tree(), selectable, backward)?;
		let schema = self.schema_rc();
		let (tree, document_selection, markers) = self.model.document.selection_parts();
		document_selection.set_to(tree, &schema, markers, selection)
	}

	/// Moves the focus of the document selection, keeping its anchor.
	pub fn set_selection_focus(&mut self, focus: Position) -> Result<()> {
		self.check()?;
		let schema = self.schema_rc();
		let (tree, document_selection, markers) = self.model.document.selection_parts();
		document_selection.set_focus(tree, &schema, markers, focus)
	}

	/// Sets an attribute on the document selection. A caret in an empty
	/// element also stores it on that element so it survives a selection
	/// round trip.
	pub fn set_selection_attribute(&mut self, key: &str, value: Value) -> Result<()> {
		self.check()?;
		if let Some(parent) = self.empty_caret_parent() {
			self.set_attribute(&store_attribute_key(key), value.clone(), parent)?;
		}
		self.model.document.selection_parts().1.set_attribute(key, value);
		Ok(())
	}

	pub fn set_selection_attributes(&mut self, attrs: Attributes) -> Result<()> {
		for (key, value) in attrs {
			self.set_selection_attribute(&key, value)?;
		}
		Ok(())
	}

	pub fn remove_selection_attribute(&mut self, key: &str) -> Result<()> {
		self.check()?;
		if let Some(parent) = self.empty_caret_parent() {
			let stored = store_attribute_key(key);
			if self.tree().has_attr(parent, &stored) {
				self.remove_attribute(&stored, parent)?;
			}
		}
		self.model.document.selection_parts().1.remove_attribute(key);
		Ok(())
	}

	/// Stops the caret from inheriting attributes of the text before it
	/// until the returned token is handed back.
	pub fn override_selection_gravity(&mut self) -> Result<GravityToken> {
		self.check()?;
		let schema = self.schema_rc();
		let (tree, document_selection, _) = self.model.document.selection_parts();
		Ok(document_selection.override_gravity(tree, &schema))
	}

	pub fn restore_selection_gravity(&mut self, token: GravityToken) -> Result<()> {
		self.check()?;
		let schema = self.schema_rc();
		let (tree, document_selection, _) = self.model.document.selection_parts();
		document_selection.restore_gravity(tree, &schema, token)
	}

	fn empty_caret_parent(&self) -> Option<NodeId> {
		let selection = self.model.document.selection();
		if !selection.is_collapsed() {
			return None;
		}
		let tree = self.tree();
		let parent = selection.anchor()?.parent(tree).ok()?;
		(tree.is_element(parent) && tree.is_empty(parent)).then_some(parent)
	}
}
