//! The document: roots, version, history and everything kept live.

use indexmap::IndexMap;
use tracing::trace;

use crate::batch::BatchId;
use crate::emitter::{Emitter, Priority, SubscriptionId};
use crate::error::{ModelError, Result};
use crate::history::History;
use crate::live::{LiveEvent, LivePositionId, LiveRangeId, LiveRegistry};
use crate::markers::{MarkerCollection, MarkerEvent};
use crate::node::{Attributes, NodeId, Tree};
use crate::operation::{Operation, RootNames};
use crate::position::Position;
use crate::range::Range;
use crate::schema::{GRAVEYARD, Schema};
use crate::selection::{DocumentSelection, SelectionEvent};

/// Conventional name of the main content root.
pub const DEFAULT_ROOT_NAME: &str = "main";

#[derive(Debug, Clone, Copy)]
struct RootEntry {
	id: NodeId,
	attached: bool,
}

/// Document-level notification.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
	/// Emitted after an operation and all its live-reference updates.
	OperationApplied { operation: Operation },
	/// Emitted once per change block that applied document operations.
	Change { batch: BatchId },
}

/// Roots, graveyard, version counter and the live state following them.
#[derive(Debug)]
pub struct Document {
	tree: Tree,
	roots: IndexMap<String, RootEntry>,
	graveyard: NodeId,
	version: u64,
	history: History,
	selection: DocumentSelection,
	markers: MarkerCollection,
	live: LiveRegistry,
	live_events: Emitter<LiveEvent>,
	events: Emitter<DocumentEvent>,
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl Document {
	/// Empty document holding only the graveyard.
	pub fn new() -> Self {
		let mut tree = Tree::new();
		let graveyard = tree.create_element(GRAVEYARD, Attributes::new());
		let mut roots = IndexMap::new();
		roots.insert(
			GRAVEYARD.to_string(),
			RootEntry {
				id: graveyard,
				attached: true,
			},
		);
		Self {
			tree,
			roots,
			graveyard,
			version: 0,
			history: History::new(),
			selection: DocumentSelection::new(),
			markers: MarkerCollection::new(),
			live: LiveRegistry::new(),
			live_events: Emitter::new(),
			events: Emitter::new(),
		}
	}

	pub fn tree(&self) -> &Tree {
		&self.tree
	}

	pub(crate) fn tree_mut(&mut self) -> &mut Tree {
		&mut self.tree
	}

	pub fn version(&self) -> u64 {
		self.version
	}

	pub fn history(&self) -> &History {
		&self.history
	}

	pub fn selection(&self) -> &DocumentSelection {
		&self.selection
	}

	pub fn markers(&self) -> &MarkerCollection {
		&self.markers
	}

	pub fn graveyard(&self) -> NodeId {
		self.graveyard
	}

	/// Creates an attached root element named `root_name`.
	pub(crate) fn create_root(&mut self, element_name: &str, root_name: &str) -> Result<NodeId> {
		if self.roots.contains_key(root_name) {
			return Err(ModelError::RootExists(root_name.to_string()));
		}
		let id = self.tree.create_element(element_name, Attributes::new());
		self.roots.insert(root_name.to_string(), RootEntry { id, attached: true });
		trace!(root = root_name, element = element_name, "root created");
		Ok(id)
	}

	/// Root with this name, attached or not.
	pub fn root(&self, name: &str) -> Option<NodeId> {
		self.roots.get(name).map(|entry| entry.id)
	}

	pub fn is_attached(&self, root: NodeId) -> bool {
		self.roots.values().any(|entry| entry.id == root && entry.attached)
	}

	/// Names of the content roots, in creation order.
	pub fn root_names(&self, include_detached: bool) -> impl Iterator<Item = &str> {
		self.roots
			.iter()
			.filter(move |(name, entry)| name.as_str() != GRAVEYARD && (include_detached || entry.attached))
			.map(|(name, _)| name.as_str())
	}

	/// Attached content roots, in creation order.
	pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
		self.root_names(false).filter_map(|name| self.root(name))
	}

	/// First attached content root.
	pub fn default_root(&self) -> Option<NodeId> {
		self.roots().next()
	}

	pub fn subscribe(&mut self, priority: Priority, handler: impl FnMut(&DocumentEvent) + 'static) -> SubscriptionId {
		self.events.subscribe(priority, handler)
	}

	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		self.events.unsubscribe(id)
	}

	pub fn subscribe_live(&mut self, priority: Priority, handler: impl FnMut(&LiveEvent) + 'static) -> SubscriptionId {
		self.live_events.subscribe(priority, handler)
	}

	pub fn unsubscribe_live(&mut self, id: SubscriptionId) -> bool {
		self.live_events.unsubscribe(id)
	}

	pub fn subscribe_selection(
		&mut self,
		priority: Priority,
		handler: impl FnMut(&SelectionEvent) + 'static,
	) -> SubscriptionId {
		self.selection.subscribe(priority, handler)
	}

	pub fn unsubscribe_selection(&mut self, id: SubscriptionId) -> bool {
		self.selection.unsubscribe(id)
	}

	pub fn subscribe_markers(&mut self, priority: Priority, handler: impl FnMut(&MarkerEvent) + 'static) -> SubscriptionId {
		self.markers.subscribe(priority, handler)
	}

	pub fn unsubscribe_markers(&mut self, id: SubscriptionId) -> bool {
		self.markers.unsubscribe(id)
	}

	pub(crate) fn add_live_range(&mut self, range: Range) -> LiveRangeId {
		self.live.add_range(range)
	}

	pub(crate) fn add_live_position(&mut self, position: Position) -> LivePositionId {
		self.live.add_position(position)
	}

	pub fn live_range(&self, id: LiveRangeId) -> Result<&Range> {
		self.live.range(id)
	}

	pub fn live_position(&self, id: LivePositionId) -> Result<&Position> {
		self.live.position(id)
	}

	/// Stops tracking a live range, returning its final value.
	pub fn detach_live_range(&mut self, id: LiveRangeId) -> Result<Range> {
		self.live.detach_range(id)
	}

	/// Stops tracking a live position, returning its final value.
	pub fn detach_live_position(&mut self, id: LivePositionId) -> Result<Position> {
		self.live.detach_position(id)
	}

	pub(crate) fn selection_parts(&mut self) -> (&Tree, &mut DocumentSelection, &MarkerCollection) {
		(&self.tree, &mut self.selection, &self.markers)
	}

	pub(crate) fn refresh_default_range(&mut self, schema: &Schema) {
		let root = self.default_root();
		self.selection.refresh_default_range(&self.tree, schema, root);
		self.selection.update_markers(&self.markers);
	}

	pub(crate) fn markers_mut(&mut self) -> &mut MarkerCollection {
		&mut self.markers
	}

	pub(crate) fn update_selection_markers(&mut self) {
		self.selection.update_markers(&self.markers);
	}

	pub(crate) fn emit_change(&mut self, batch: BatchId) {
		self.events.emit(&DocumentEvent::Change { batch });
	}

	/// Executes an operation and brings every live reference up to date.
	///
	/// Stages run in a fixed order: version check, execution, live ranges
	/// and markers, selection repair, then external notification.
	pub(crate) fn apply_operation(&mut self, mut operation: Operation, schema: &Schema) -> Result<Operation> {
		if let Some(base) = operation.base_version()
			&& base != self.version
		{
			return Err(ModelError::OperationVersionMismatch {
				base,
				current: self.version,
			});
		}
		self.execute(&mut operation)?;
		trace!(
			kind = ?operation.kind(self.graveyard),
			base_version = ?operation.base_version(),
			"operation applied"
		);

		if operation.is_document_operation() {
			self.version += 1;
			self.history.add_operation(operation.clone())?;
			let live_events = self.live.transform_all(&operation, self.graveyard);
			self.markers.transform_all(&operation, self.graveyard);
			let root = self.default_root();
			self.selection.refresh_default_range(&self.tree, schema, root);
			self.selection
				.after_operation(&self.tree, schema, &self.markers, &operation, self.graveyard)?;
			for event in &live_events {
				self.live_events.emit(event);
			}
		}
		self.events.emit(&DocumentEvent::OperationApplied {
			operation: operation.clone(),
		});
		Ok(operation)
	}

	fn execute(&mut self, operation: &mut Operation) -> Result<()> {
		match operation {
			Operation::Marker(op) => match &op.new_range {
				Some(range) => self
					.markers
					.set(&op.name, range.clone(), true, op.affects_data)
					.map(|_| ()),
				None => {
					self.markers.remove(&op.name);
					Ok(())
				}
			},
			Operation::Root(op) => match self.roots.get_mut(&op.root_name) {
				Some(entry) => {
					entry.attached = op.is_add;
					Ok(())
				}
				None if op.is_add => {
					let id = self.tree.create_element(op.element_name.as_str(), Attributes::new());
					self.roots.insert(op.root_name.clone(), RootEntry { id, attached: true });
					Ok(())
				}
				None => Err(ModelError::RootNotFound(op.root_name.clone())),
			},
			operation => operation.execute_on_tree(&mut self.tree),
		}
	}
}

impl RootNames for Document {
	fn root_name(&self, root: NodeId) -> Option<&str> {
		self.roots
			.iter()
			.find(|(_, entry)| entry.id == root)
			.map(|(name, _)| name.as_str())
	}

	fn root_by_name(&self, name: &str) -> Option<NodeId> {
		self.root(name)
	}
}
