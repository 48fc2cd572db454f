use super::Writer;
use crate::error::{ModelError, Result};
use crate::node::NodeId;
use crate::operation::{MarkerOperation, Operation, RootOperation};
use crate::position::Position;
use crate::range::Range;

/// Options of [`Writer::add_marker`] and [`Writer::update_marker`].
#[derive(Debug, Clone, Default)]
pub struct MarkerOptions {
	pub range: Option<Range>,
	/// Whether the marker is changed through marker operations. Required
	/// when adding.
	pub using_operation: Option<bool>,
	pub affects_data: Option<bool>,
}

impl Writer<'_> {
	pub fn add_marker(&mut self, name: &str, options: MarkerOptions) -> Result<()> {
		self.check()?;
		let using_operation = options
			.using_operation
			.ok_or_else(|| ModelError::MarkerWrongOptions("using_operation is required".into()))?;
		if self.model.document.markers().has(name) {
			return Err(ModelError::MarkerExists(name.to_string()));
		}
		let range = options
			.range
			.ok_or_else(|| ModelError::MarkerWrongOptions("range is required".into()))?;
		let affects_data = options.affects_data.unwrap_or(false);
		if using_operation {
			return self.apply_marker_operation(name, None, Some(range), affects_data);
		}
		self.set_marker_directly(name, range, false, affects_data)
	}

	/// Records a marker on a document fragment. It becomes a document marker
	/// when the fragment is inserted.
	pub fn add_fragment_marker(&mut self, name: &str, range: Range) -> Result<()> {
		self.check()?;
		if name.contains(crate::markers::MARKER_NAME_SEPARATOR) {
			return Err(ModelError::InvalidMarkerName(name.to_string()));
		}
		let fragment = range.root();
		let markers = self
			.tree_mut()
			.fragment_markers_mut(fragment)
			.ok_or_else(|| ModelError::MarkerWrongOptions(format!("{name}: range is not in a document fragment")))?;
		markers.insert(name.to_string(), range);
		Ok(())
	}

	/// Changes a marker. `None` options only re-announce it.
	pub fn update_marker(&mut self, name: &str, options: Option<MarkerOptions>) -> Result<()> {
		self.check()?;
		let marker = self
			.model
			.document
			.markers()
			.get(name)
			.ok_or_else(|| ModelError::MarkerNotFound(name.to_string()))?;
		let managed = marker.managed_using_operations();
		let current = marker.range().clone();
		let current_affects_data = marker.affects_data();
		let Some(options) = options else {
			return self.model.document.markers_mut().refresh(name);
		};
		if options.using_operation.is_none() && options.range.is_none() && options.affects_data.is_none() {
			return Err(ModelError::MarkerWrongOptions(
				"nothing to update: give a range, using_operation or affects_data".into(),
			));
		}
		let affects_data = options.affects_data.unwrap_or(current_affects_data);
		let updated = options.range.unwrap_or_else(|| current.clone());

		match options.using_operation {
			Some(true) if !managed => self.apply_marker_operation(name, None, Some(updated), affects_data),
			Some(false) if managed => {
				self.apply_marker_operation(name, Some(current), None, affects_data)?;
				self.set_marker_directly(name, updated, false, affects_data)
			}
			_ if managed => self.apply_marker_operation(name, Some(current), Some(updated), affects_data),
			_ => self.set_marker_directly(name, updated, false, affects_data),
		}
	}

	pub fn remove_marker(&mut self, name: &str) -> Result<()> {
		self.check()?;
		let marker = self
			.model
			.document
			.markers()
			.get(name)
			.ok_or_else(|| ModelError::MarkerNotFound(name.to_string()))?;
		if marker.managed_using_operations() {
			let range = marker.range().clone();
			let affects_data = marker.affects_data();
			return self.apply_marker_operation(name, Some(range), None, affects_data);
		}
		self.model.document.markers_mut().remove(name);
		self.model.document.update_selection_markers();
		Ok(())
	}

	fn set_marker_directly(&mut self, name: &str, range: Range, managed: bool, affects_data: bool) -> Result<()> {
		self.model
			.document
			.markers_mut()
			.set(name, range, managed, affects_data)?;
		self.model.document.update_selection_markers();
		Ok(())
	}

	fn apply_marker_operation(
		&mut self,
		name: &str,
		old_range: Option<Range>,
		new_range: Option<Range>,
		affects_data: bool,
	) -> Result<()> {
		let version = self.model.document.version();
		self.apply(Operation::Marker(MarkerOperation {
			name: name.to_string(),
			old_range,
			new_range,
			affects_data,
			base_version: Some(version),
		}))
	}

	/// Records operation-managed markers touching a moved range, so undoing
	/// the move can restore their boundaries.
	pub(crate) fn markers_affected_by_move(&mut self, range: &Range) -> Result<()> {
		let affected: Vec<(String, Range)> = self
			.model
			.document
			.markers()
			.iter()
			.filter(|m| m.managed_using_operations())
			.filter(|m| {
				let marker = m.range();
				range.contains_position(&marker.start)
					|| range.start == marker.start
					|| range.contains_position(&marker.end)
					|| range.end == marker.end
			})
			.map(|m| (m.name().to_string(), m.range().clone()))
			.collect();
		self.refresh_marker_ranges(affected)
	}

	/// Same as [`Self::markers_affected_by_move`], for a merge at `position`.
	pub(crate) fn markers_affected_by_merge(&mut self, position: &Position, before: NodeId, after: NodeId) -> Result<()> {
		let tree = self.tree();
		let affected: Vec<(String, Range)> = self
			.model
			.document
			.markers()
			.iter()
			.filter(|m| m.managed_using_operations())
			.filter(|m| {
				let touches = |p: &Position| {
					*p == *position
						|| (p.parent(tree).ok() == Some(before) && p.is_at_end(tree))
						|| (p.parent(tree).ok() == Some(after) && p.is_at_start())
				};
				touches(&m.range().start) || touches(&m.range().end)
			})
			.map(|m| (m.name().to_string(), m.range().clone()))
			.collect();
		self.refresh_marker_ranges(affected)
	}

	/// Same as [`Self::markers_affected_by_move`], for a split at `position`.
	pub(crate) fn markers_affected_by_split(&mut self, position: &Position) -> Result<()> {
		let affected: Vec<(String, Range)> = self
			.model
			.document
			.markers()
			.iter()
			.filter(|m| m.managed_using_operations())
			.filter(|m| m.range().contains_position(position))
			.map(|m| (m.name().to_string(), m.range().clone()))
			.collect();
		self.refresh_marker_ranges(affected)
	}

	fn refresh_marker_ranges(&mut self, affected: Vec<(String, Range)>) -> Result<()> {
		for (name, range) in affected {
			let affects_data = self
				.model
				.document
				.markers()
				.get(&name)
				.is_some_and(|m| m.affects_data());
			self.apply_marker_operation(&name, Some(range.clone()), Some(range), affects_data)?;
		}
		Ok(())
	}

	/// Attaches a root, creating it when needed.
	pub fn add_root(&mut self, root_name: &str, element_name: &str) -> Result<NodeId> {
		self.check()?;
		let document = &self.model.document;
		if document.root(root_name).is_some_and(|r| document.is_attached(r)) {
			return Err(ModelError::RootExists(root_name.to_string()));
		}
		let version = document.version();
		self.apply(Operation::Root(RootOperation {
			root_name: root_name.to_string(),
			element_name: element_name.to_string(),
			is_add: true,
			base_version: Some(version),
		}))?;
		self.model
			.document
			.root(root_name)
			.ok_or_else(|| ModelError::RootNotFound(root_name.to_string()))
	}

	/// Clears and detaches a root: its markers, attributes and content go
	/// first so the detach can be undone step by step.
	pub fn detach_root(&mut self, root_name: &str) -> Result<()> {
		self.check()?;
		let document = &self.model.document;
		let root = document
			.root(root_name)
			.filter(|&r| document.is_attached(r))
			.ok_or_else(|| ModelError::RootNotFound(root_name.to_string()))?;
		let markers: Vec<String> = document
			.markers()
			.iter()
			.filter(|m| m.range().root() == root)
			.map(|m| m.name().to_string())
			.collect();
		for name in markers {
			self.remove_marker(&name)?;
		}
		let keys: Vec<String> = self.tree().attrs(root).keys().cloned().collect();
		for key in keys {
			self.remove_attribute(&key, root)?;
		}
		if !self.tree().is_empty(root) {
			let content = self.create_range_in(root);
			self.remove(content)?;
		}
		let element_name = self.tree().name(root).unwrap_or_default().to_string();
		let version = self.model.document.version();
		self.apply(Operation::Root(RootOperation {
			root_name: root_name.to_string(),
			element_name,
			is_add: false,
			base_version: Some(version),
		}))
	}
}
