//! Named live ranges tagging document regions.

use indexmap::IndexMap;
use tracing::trace;

use crate::emitter::{Emitter, Priority, SubscriptionId};
use crate::error::{ModelError, Result};
use crate::live::{LiveChange, LiveRange};
use crate::node::NodeId;
use crate::operation::Operation;
use crate::position::Position;
use crate::range::Range;

/// Separator that may not appear in marker names.
pub const MARKER_NAME_SEPARATOR: char = ',';

/// A named live range.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
	name: String,
	live: LiveRange,
	managed_using_operations: bool,
	affects_data: bool,
}

impl Marker {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn range(&self) -> &Range {
		self.live.range()
	}

	pub fn start(&self) -> &Position {
		&self.live.range().start
	}

	pub fn end(&self) -> &Position {
		&self.live.range().end
	}

	/// Whether the marker is changed only through marker operations.
	pub fn managed_using_operations(&self) -> bool {
		self.managed_using_operations
	}

	pub fn affects_data(&self) -> bool {
		self.affects_data
	}

	/// Snapshot of the marker's data, for change notifications.
	pub fn data(&self) -> MarkerData {
		MarkerData {
			range: Some(self.range().clone()),
			managed_using_operations: self.managed_using_operations,
			affects_data: self.affects_data,
		}
	}
}

/// Marker state before or after a change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkerData {
	pub range: Option<Range>,
	pub managed_using_operations: bool,
	pub affects_data: bool,
}

/// Marker change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerEvent {
	/// A marker was added, moved, removed, or refreshed. `old_range` is
	/// `None` for additions, `new_range` is `None` for removals.
	Update {
		name: String,
		old_range: Option<Range>,
		new_range: Option<Range>,
		old_data: MarkerData,
	},
	/// Content inside the marker changed while its boundaries stayed put.
	Content { name: String, range: Range },
}

impl MarkerEvent {
	pub fn name(&self) -> &str {
		match self {
			Self::Update { name, .. } | Self::Content { name, .. } => name,
		}
	}
}

/// All markers of a document, in insertion order.
#[derive(Debug, Default)]
pub struct MarkerCollection {
	markers: IndexMap<String, Marker>,
	events: Emitter<MarkerEvent>,
}

impl MarkerCollection {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, name: &str) -> Option<&Marker> {
		self.markers.get(name)
	}

	pub fn has(&self, name: &str) -> bool {
		self.markers.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.markers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.markers.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Marker> {
		self.markers.values()
	}

	/// Markers named `prefix:…`.
	pub fn get_markers_group<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Marker> + 'a {
		self.markers.values().filter(move |m| {
			m.name
				.strip_prefix(prefix)
				.is_some_and(|rest| rest.starts_with(':'))
		})
	}

	/// Markers whose range strictly contains `position`.
	pub fn get_markers_at_position<'a>(&'a self, position: &'a Position) -> impl Iterator<Item = &'a Marker> + 'a {
		self.markers
			.values()
			.filter(move |m| m.range().contains_position(position))
	}

	pub fn get_markers_intersecting_range<'a>(&'a self, range: &'a Range) -> impl Iterator<Item = &'a Marker> + 'a {
		self.markers
			.values()
			.filter(move |m| m.range().intersection(range).is_some())
	}

	pub fn subscribe(&mut self, priority: Priority, handler: impl FnMut(&MarkerEvent) + 'static) -> SubscriptionId {
		self.events.subscribe(priority, handler)
	}

	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		self.events.unsubscribe(id)
	}

	/// Adds or updates a marker. Returns whether anything changed.
	pub(crate) fn set(
		&mut self,
		name: &str,
		range: Range,
		managed_using_operations: bool,
		affects_data: bool,
	) -> Result<bool> {
		if name.contains(MARKER_NAME_SEPARATOR) {
			return Err(ModelError::InvalidMarkerName(name.to_string()));
		}
		let event = match self.markers.get_mut(name) {
			Some(marker) => {
				let old_data = marker.data();
				let range_changed = *marker.range() != range;
				let changed = range_changed
					|| marker.managed_using_operations != managed_using_operations
					|| marker.affects_data != affects_data;
				if !changed {
					return Ok(false);
				}
				marker.live.set(range.clone());
				marker.managed_using_operations = managed_using_operations;
				marker.affects_data = affects_data;
				MarkerEvent::Update {
					name: name.to_string(),
					old_range: old_data.range.clone(),
					new_range: Some(range),
					old_data,
				}
			}
			None => {
				self.markers.insert(
					name.to_string(),
					Marker {
						name: name.to_string(),
						live: LiveRange::new(range.clone()),
						managed_using_operations,
						affects_data,
					},
				);
				MarkerEvent::Update {
					name: name.to_string(),
					old_range: None,
					new_range: Some(range),
					old_data: MarkerData::default(),
				}
			}
		};
		trace!(marker = name, "marker set");
		self.events.emit(&event);
		Ok(true)
	}

	/// Removes a marker. Returns whether it existed.
	pub(crate) fn remove(&mut self, name: &str) -> bool {
		let Some(marker) = self.markers.shift_remove(name) else {
			return false;
		};
		trace!(marker = name, "marker removed");
		let old_data = marker.data();
		self.events.emit(&MarkerEvent::Update {
			name: name.to_string(),
			old_range: old_data.range.clone(),
			new_range: None,
			old_data,
		});
		true
	}

	/// Re-announces a marker without changing it.
	pub(crate) fn refresh(&mut self, name: &str) -> Result<()> {
		let marker = self
			.markers
			.get(name)
			.ok_or_else(|| ModelError::MarkerNotFound(name.to_string()))?;
		let data = marker.data();
		self.events.emit(&MarkerEvent::Update {
			name: name.to_string(),
			old_range: data.range.clone(),
			new_range: data.range.clone(),
			old_data: data,
		});
		Ok(())
	}

	/// Moves every marker through an applied operation.
	pub(crate) fn transform_all(&mut self, operation: &Operation, graveyard: NodeId) {
		let mut events = Vec::new();
		for marker in self.markers.values_mut() {
			let old_data = marker.data();
			match marker.live.transform(operation, graveyard) {
				Some(LiveChange::Range { old, .. }) => events.push(MarkerEvent::Update {
					name: marker.name.clone(),
					old_range: Some(old),
					new_range: Some(marker.range().clone()),
					old_data,
				}),
				Some(LiveChange::Content { range, .. }) => events.push(MarkerEvent::Content {
					name: marker.name.clone(),
					range,
				}),
				None => {}
			}
		}
		for event in &events {
			self.events.emit(event);
		}
	}
}
