use serde_json::Value;
use tracing::debug;

use super::{DeleteContentOptions, InsertObjectOptions, ObjectSelection};
use crate::error::{ModelError, Result};
use crate::node::{Attributes, NodeId};
use crate::range::Range;
use crate::schema::{Schema, SchemaContext};
use crate::selection::{Offset, Selectable, Selection};
use crate::writer::Writer;

impl Writer<'_> {
	/// Inserts an object element at the selection, wrapping it in a
	/// paragraph when it cannot stand where the selection is.
	///
	/// Attributes marked `copy_on_replace` on the first selected block carry
	/// over to the object. Returns the affected range.
	pub fn insert_object(
		&mut self,
		object: NodeId,
		mut selection: Option<&mut Selection>,
		options: InsertObjectOptions,
	) -> Result<Range> {
		self.check()?;
		let schema = self.schema_rc();
		if !schema.node_is_object(self.tree(), object) {
			let name = self.tree().item_name(object).unwrap_or_default().to_string();
			return Err(ModelError::NotAnObject(name));
		}

		let original = self.selection_or_document(selection.as_deref());
		let mut optimal = match options.find_optimal_position {
			Some(place) if schema.node_is_block(self.tree(), object) => {
				let range = schema.find_optimal_insertion_range(self.tree(), &original, place)?;
				Some(Selection::from_range(range, false))
			}
			_ => None,
		};

		let attributes: Vec<(String, Value)> = match original.selected_blocks(self.tree(), &schema).first() {
			Some(&block) => schema.attributes_with_property(self.tree(), block, |p| p.copy_on_replace == Some(true)),
			None => Vec::new(),
		};

		let affected = {
			let mut target = match optimal.as_mut() {
				Some(optimal) => Some(optimal),
				None => selection.as_deref_mut(),
			};
			let insertion = self.selection_or_document(target.as_deref());
			if !insertion.is_collapsed() {
				self.delete_content(target.as_deref_mut(), DeleteContentOptions {
					do_not_autoparagraph: true,
					..DeleteContentOptions::default()
				})?;
			}
			let anchor = self
				.selection_or_document(target.as_deref())
				.anchor()
				.ok_or(ModelError::SelectionNoAnchor)?;
			let parent = anchor.parent(self.tree())?;
			let element = self.wrap_in_paragraph_if_needed(&schema, object, parent)?;
			schema.set_allowed_attributes(element, attributes.clone(), self)?;
			self.insert_content(element, target)?
		};

		if affected.is_collapsed() {
			debug!("object insertion left the content unchanged");
			return Ok(affected);
		}
		if let Some(place) = options.set_selection {
			self.select_around_object(&schema, object, place, attributes, selection)?;
		}
		Ok(affected)
	}

	fn wrap_in_paragraph_if_needed(&mut self, schema: &Schema, object: NodeId, parent: NodeId) -> Result<NodeId> {
		let tree = self.tree();
		let name = tree.item_name(object).unwrap_or_default();
		let paragraph = self.config().paragraph_element.clone();
		if schema.check_child_in(tree, parent, name)
			|| !schema.check_child_in(tree, parent, &paragraph)
			|| !schema.check_child(&SchemaContext::from_names([paragraph.as_str()]), name)
		{
			return Ok(object);
		}
		let wrapper = self.create_element(&paragraph, Attributes::new());
		self.tree_mut().insert_nodes(wrapper, 0, &[object])?;
		Ok(wrapper)
	}

	/// Puts the selection on the object or into the text-capable element
	/// following it, inserting a paragraph when there is none.
	fn select_around_object(
		&mut self,
		schema: &Schema,
		object: NodeId,
		place: ObjectSelection,
		attributes: Vec<(String, Value)>,
		mut target: Option<&mut Selection>,
	) -> Result<()> {
		if place == ObjectSelection::On {
			return self.set_target_selection(target, Selectable::On(object));
		}
		let tree = self.tree();
		if schema.node_is_inline(tree, object) {
			return self.set_target_selection(target, Selectable::At(object, Offset::After));
		}
		let mut next = tree.next_sibling(object);
		let text_capable = next.is_some_and(|next| schema.check_child_in(tree, next, "$text"));
		let paragraph = self.config().paragraph_element.clone();
		if !text_capable
			&& let Some(parent) = tree.parent(object)
			&& schema.check_child_in(tree, parent, &paragraph)
		{
			let element = self.create_element(&paragraph, Attributes::new());
			schema.set_allowed_attributes(element, attributes, self)?;
			let mut after_object = Selection::from_selectable(self.tree(), Selectable::At(object, Offset::After), false)?;
			self.insert_content(element, Some(&mut after_object))?;
			next = Some(element);
		}
		match next {
			Some(next) => self.set_target_selection(target.as_deref_mut(), Selectable::At(next, Offset::At(0))),
			None => Ok(()),
		}
	}
}
