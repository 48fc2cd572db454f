use serde_json::Value;

use super::{Target, Writer};
use crate::error::Result;
use crate::node::{Attributes, NodeId};
use crate::operation::{AttributeOperation, Operation, RootAttributeOperation};
use crate::position::Position;
use crate::range::Range;
use crate::walker::{Item, StepKind};

impl Writer<'_> {
	/// Sets `key` on a node, or on every item of a range.
	pub fn set_attribute(&mut self, key: &str, value: Value, target: impl Into<Target>) -> Result<()> {
		self.check()?;
		self.set_attribute_value(key, Some(value), target.into())
	}

	pub fn set_attributes(&mut self, attrs: Attributes, target: impl Into<Target>) -> Result<()> {
		let target = target.into();
		for (key, value) in attrs {
			self.set_attribute(&key, value, target.clone())?;
		}
		Ok(())
	}

	pub fn remove_attribute(&mut self, key: &str, target: impl Into<Target>) -> Result<()> {
		self.check()?;
		self.set_attribute_value(key, None, target.into())
	}

	/// Removes every attribute from a node, or from every item in a range.
	pub fn clear_attributes(&mut self, target: impl Into<Target>) -> Result<()> {
		self.check()?;
		let tree = self.tree();
		let mut work: Vec<(Target, Vec<String>)> = Vec::new();
		match target.into() {
			Target::Node(node) => work.push((Target::Node(node), tree.attrs(node).keys().cloned().collect())),
			Target::Range(range) => {
				for value in range.items(tree, false) {
					let keys: Vec<String> = tree.attrs(value.item.node()).keys().cloned().collect();
					if keys.is_empty() {
						continue;
					}
					let target = match (&value.item, value.kind) {
						(Item::Text(_), StepKind::Text) => {
							Target::Range(Range::new(value.previous_position.clone(), value.next_position.clone()))
						}
						(item, _) => Target::Node(item.node()),
					};
					work.push((target, keys));
				}
			}
		}
		for (target, keys) in work {
			for key in keys {
				self.set_attribute_value(&key, None, target.clone())?;
			}
		}
		Ok(())
	}

	fn set_attribute_value(&mut self, key: &str, value: Option<Value>, target: Target) -> Result<()> {
		match target {
			Target::Node(node) => self.set_attribute_on_node(key, value, node),
			Target::Range(range) => {
				for flat in range.minimal_flat_ranges(self.tree())? {
					self.set_attribute_on_flat_range(key, &value, flat)?;
				}
				Ok(())
			}
		}
	}

	/// Emits one operation per run of items sharing the same old value.
	fn set_attribute_on_flat_range(&mut self, key: &str, value: &Option<Value>, range: Range) -> Result<()> {
		let tree = self.tree();
		let steps: Vec<(Position, Option<Value>)> = range
			.items(tree, true)
			.into_iter()
			.map(|step| (step.next_position, tree.attr(step.item.node(), key).cloned()))
			.collect();

		let mut runs = Vec::new();
		let mut last_split = range.start.clone();
		let mut position: Option<Position> = None;
		let mut value_before: Option<Value> = None;
		for (next, value_after) in steps {
			if let Some(position) = &position
				&& value_before != value_after
			{
				if value_before != *value {
					runs.push((Range::new(last_split.clone(), position.clone()), value_before.clone()));
				}
				last_split = position.clone();
			}
			position = Some(next);
			value_before = value_after;
		}
		if let Some(position) = position
			&& position != last_split
			&& value_before != *value
		{
			runs.push((Range::new(last_split, position), value_before));
		}

		for (range, old_value) in runs {
			let version = self.version_for(range.root());
			self.apply(Operation::Attribute(AttributeOperation {
				range,
				key: key.to_string(),
				old_value,
				new_value: value.clone(),
				base_version: version,
			}))?;
		}
		Ok(())
	}

	fn set_attribute_on_node(&mut self, key: &str, value: Option<Value>, node: NodeId) -> Result<()> {
		let tree = self.tree();
		let old_value = tree.attr(node, key).cloned();
		if old_value == value {
			return Ok(());
		}
		if tree.parent(node).is_none() {
			let version = self.version_for(node);
			return self.apply(Operation::RootAttribute(RootAttributeOperation {
				root: node,
				key: key.to_string(),
				old_value,
				new_value: value,
				base_version: version,
			}));
		}
		let range = Range::on_node(tree, node)?;
		let version = self.version_for(range.root());
		self.apply(Operation::Attribute(AttributeOperation {
			range,
			key: key.to_string(),
			old_value,
			new_value: value,
			base_version: version,
		}))
	}
}
