//! Transaction entry point tying document, schema and configuration.

use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use crate::batch::{Batch, BatchId, BatchKind};
use crate::config::ModelConfig;
use crate::document::Document;
use crate::error::Result;
use crate::node::NodeId;
use crate::range::Range;
use crate::schema::Schema;
use crate::selection::{STORE_ATTRIBUTE_PREFIX, Selection};
use crate::walker::Item;
use crate::writer::{Target, Writer};

type ChangeCallback = Box<dyn FnOnce(&mut Writer<'_>) -> Result<()>>;
type PostFixer = Box<dyn FnMut(&mut Writer<'_>) -> Result<bool>>;

/// What [`Model::has_content`] inspects.
#[derive(Debug, Clone)]
pub enum ContentTarget {
	Element(NodeId),
	Range(Range),
}

/// Options of [`Model::has_content`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HasContentOptions {
	/// Whitespace-only text does not count as content.
	pub ignore_whitespaces: bool,
	/// Markers affecting data do not count as content.
	pub ignore_markers: bool,
}

/// The editing model. All mutation goes through [`Model::change`].
pub struct Model {
	pub(crate) document: Document,
	pub(crate) schema: Rc<Schema>,
	config: ModelConfig,
	queue: VecDeque<(BatchKind, ChangeCallback)>,
	pub(crate) active: Option<Batch>,
	next_batch: u64,
	post_fixers: Vec<PostFixer>,
	last_batch: Option<Batch>,
}

impl Default for Model {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Model {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Model")
			.field("document", &self.document)
			.field("schema", &self.schema)
			.field("config", &self.config)
			.field("queued", &self.queue.len())
			.field("post_fixers", &self.post_fixers.len())
			.finish()
	}
}

impl Model {
	/// Model with the base schema items and default configuration.
	pub fn new() -> Self {
		Self::with_config(ModelConfig::default())
	}

	pub fn with_config(config: ModelConfig) -> Self {
		Self {
			document: Document::new(),
			schema: Rc::new(Schema::with_base_items()),
			config,
			queue: VecDeque::new(),
			active: None,
			next_batch: 0,
			post_fixers: Vec::new(),
			last_batch: None,
		}
	}

	pub fn document(&self) -> &Document {
		&self.document
	}

	/// Mutable document access, for event subscription and live-reference
	/// bookkeeping.
	pub fn document_mut(&mut self) -> &mut Document {
		&mut self.document
	}

	pub fn schema(&self) -> &Schema {
		&self.schema
	}

	pub fn schema_mut(&mut self) -> &mut Schema {
		Rc::make_mut(&mut self.schema)
	}

	pub fn config(&self) -> &ModelConfig {
		&self.config
	}

	/// The batch of the most recently finished change block.
	pub fn last_batch(&self) -> Option<&Batch> {
		self.last_batch.as_ref()
	}

	/// Creates an attached root outside of any change block.
	pub fn create_root(&mut self, element_name: &str, root_name: &str) -> Result<NodeId> {
		let root = self.document.create_root(element_name, root_name)?;
		let schema = Rc::clone(&self.schema);
		self.document.refresh_default_range(&schema);
		Ok(root)
	}

	/// Runs `callback` in a fresh change block. Post-fixers run once the
	/// callback returns, then queued changes are drained.
	///
	/// Operations applied before an error stay applied.
	pub fn change<R>(&mut self, callback: impl FnOnce(&mut Writer<'_>) -> Result<R>) -> Result<R> {
		let batch = self.open_batch(BatchKind::Default);
		let result = callback(&mut Writer::new(self, batch));
		let closed = self.close_batch(result.is_ok());
		let value = result?;
		closed?;
		self.drain_queue()?;
		Ok(value)
	}

	/// Runs `callback` in its own change block after every queued change.
	pub fn enqueue_change(
		&mut self,
		kind: BatchKind,
		callback: impl FnOnce(&mut Writer<'_>) -> Result<()> + 'static,
	) -> Result<()> {
		self.queue.push_back((kind, Box::new(callback)));
		if self.active.is_none() {
			self.drain_queue()?;
		}
		Ok(())
	}

	pub(crate) fn queue_change(&mut self, kind: BatchKind, callback: ChangeCallback) {
		self.queue.push_back((kind, callback));
	}

	/// Registers a callback run at the end of every change block. Returning
	/// `true` means it changed the document, which reruns every post-fixer.
	pub fn register_post_fixer(&mut self, fixer: impl FnMut(&mut Writer<'_>) -> Result<bool> + 'static) {
		self.post_fixers.push(Box::new(fixer));
	}

	fn open_batch(&mut self, kind: BatchKind) -> BatchId {
		let id = BatchId(self.next_batch);
		self.next_batch += 1;
		self.active = Some(Batch::new(id, kind));
		id
	}

	fn drain_queue(&mut self) -> Result<()> {
		while let Some((kind, callback)) = self.queue.pop_front() {
			let batch = self.open_batch(kind);
			let result = callback(&mut Writer::new(self, batch));
			let closed = self.close_batch(result.is_ok());
			result?;
			closed?;
		}
		Ok(())
	}

	fn close_batch(&mut self, succeeded: bool) -> Result<()> {
		let has_document_changes = self
			.active
			.as_ref()
			.is_some_and(|b| b.operations().iter().any(|op| op.is_document_operation()));
		let fixed = if succeeded && has_document_changes {
			self.run_post_fixers()
		} else {
			Ok(())
		};
		if !succeeded || fixed.is_err() {
			self.queue.clear();
		}
		if let Some(batch) = self.active.take() {
			debug!(
				batch = batch.id().0,
				operations = batch.operations().len(),
				"change block finished"
			);
			if batch.base_version().is_some() {
				self.document.emit_change(batch.id());
			}
			self.last_batch = Some(batch);
		}
		fixed
	}

	fn run_post_fixers(&mut self) -> Result<()> {
		let Some(batch) = self.active.as_ref().map(Batch::id) else {
			return Ok(());
		};
		let mut fixers = std::mem::take(&mut self.post_fixers);
		let result = self.run_fixers(&mut fixers, batch);
		fixers.append(&mut self.post_fixers);
		self.post_fixers = fixers;
		result
	}

	fn run_fixers(&mut self, fixers: &mut [PostFixer], batch: BatchId) -> Result<()> {
		loop {
			let mut fixed = clear_stored_selection_attributes(&mut Writer::new(self, batch))?;
			if !fixed {
				for fixer in fixers.iter_mut() {
					if fixer(&mut Writer::new(self, batch))? {
						fixed = true;
						break;
					}
				}
			}
			if !fixed {
				return Ok(());
			}
		}
	}

	/// Whether the target holds anything meaningful: content items, or a
	/// marker affecting data.
	pub fn has_content(&self, target: ContentTarget, options: HasContentOptions) -> bool {
		let tree = self.document.tree();
		let range = match target {
			ContentTarget::Element(element) => Range::in_element(tree, element),
			ContentTarget::Range(range) => range,
		};
		if range.is_collapsed() {
			return false;
		}
		if !options.ignore_markers
			&& self
				.document
				.markers()
				.get_markers_intersecting_range(&range)
				.any(|m| m.affects_data())
		{
			return true;
		}
		range.items(tree, false).iter().any(|value| {
			if !self.schema.is_content(value.item.item_name(tree)) {
				return false;
			}
			match &value.item {
				Item::Text(text) => !options.ignore_whitespaces || text.data.chars().any(|c| !c.is_whitespace()),
				Item::Element(_) => true,
			}
		})
	}

	/// Inserts a node or fragment at the selection. See [`Writer::insert_content`].
	pub fn insert_content(&mut self, content: NodeId, selection: Option<&mut Selection>) -> Result<Range> {
		self.change(|writer| writer.insert_content(content, selection))
	}

	/// Inserts an object element. See [`Writer::insert_object`].
	pub fn insert_object(
		&mut self,
		object: NodeId,
		selection: Option<&mut Selection>,
		options: crate::algorithms::InsertObjectOptions,
	) -> Result<Range> {
		self.change(|writer| writer.insert_object(object, selection, options))
	}

	/// Deletes the selected content. See [`Writer::delete_content`].
	pub fn delete_content(
		&mut self,
		selection: Option<&mut Selection>,
		options: crate::algorithms::DeleteContentOptions,
	) -> Result<()> {
		self.change(|writer| writer.delete_content(selection, options))
	}

	/// Extends or moves the selection by one unit. See [`Writer::modify_selection`].
	pub fn modify_selection(
		&mut self,
		selection: Option<&mut Selection>,
		options: crate::algorithms::ModifySelectionOptions,
	) -> Result<()> {
		self.change(|writer| writer.modify_selection(selection, options))
	}
}

/// Drops `selection:` attributes from elements that gained content.
fn clear_stored_selection_attributes(writer: &mut Writer<'_>) -> Result<bool> {
	let tree = writer.model().document.tree();
	let mut stale = Vec::new();
	let mut stack: Vec<NodeId> = writer.model().document.roots().collect();
	while let Some(node) = stack.pop() {
		if !tree.is_element(node) {
			continue;
		}
		if !tree.is_empty(node) {
			for key in tree.attrs(node).keys() {
				if key.starts_with(STORE_ATTRIBUTE_PREFIX) {
					stale.push((node, key.clone()));
				}
			}
		}
		stack.extend(tree.children(node).iter().copied());
	}
	let fixed = !stale.is_empty();
	for (node, key) in stale {
		writer.remove_attribute(&key, Target::Node(node))?;
	}
	Ok(fixed)
}

#[cfg(test)]
mod tests;
