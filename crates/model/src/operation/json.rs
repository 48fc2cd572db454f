//! Keyed JSON form of operations, tagged by `__className`.

use folio_primitives::Stickiness;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
	AttributeOperation, InsertOperation, MarkerOperation, MergeOperation, MoveOperation, Operation,
	RenameOperation, RootAttributeOperation, RootOperation, SplitOperation,
};
use crate::error::{ModelError, Result};
use crate::node::{NodeId, NodeSnapshot};
use crate::position::Position;
use crate::range::Range;

/// Maps root elements to their names and back.
pub trait RootNames {
	fn root_name(&self, root: NodeId) -> Option<&str>;
	fn root_by_name(&self, name: &str) -> Option<NodeId>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PositionJson {
	root: String,
	path: Vec<usize>,
	#[serde(default)]
	stickiness: Stickiness,
}

#[derive(Debug, Serialize, Deserialize)]
struct RangeJson {
	start: PositionJson,
	end: PositionJson,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "__className")]
enum Wire {
	#[serde(rename = "InsertOperation", rename_all = "camelCase")]
	Insert {
		base_version: Option<u64>,
		position: PositionJson,
		nodes: Vec<NodeSnapshot>,
		#[serde(default)]
		should_receive_attributes: bool,
	},
	#[serde(rename = "MoveOperation", rename_all = "camelCase")]
	Move {
		base_version: Option<u64>,
		source_position: PositionJson,
		how_many: usize,
		target_position: PositionJson,
	},
	#[serde(rename = "MergeOperation", rename_all = "camelCase")]
	Merge {
		base_version: Option<u64>,
		source_position: PositionJson,
		how_many: usize,
		target_position: PositionJson,
		graveyard_position: PositionJson,
	},
	#[serde(rename = "SplitOperation", rename_all = "camelCase")]
	Split {
		base_version: Option<u64>,
		split_position: PositionJson,
		how_many: usize,
		insertion_position: PositionJson,
		graveyard_position: Option<PositionJson>,
	},
	#[serde(rename = "RenameOperation", rename_all = "camelCase")]
	Rename {
		base_version: Option<u64>,
		position: PositionJson,
		old_name: String,
		new_name: String,
	},
	#[serde(rename = "AttributeOperation", rename_all = "camelCase")]
	Attribute {
		base_version: Option<u64>,
		range: RangeJson,
		key: String,
		old_value: Option<Value>,
		new_value: Option<Value>,
	},
	#[serde(rename = "RootAttributeOperation", rename_all = "camelCase")]
	RootAttribute {
		base_version: Option<u64>,
		root: String,
		key: String,
		old_value: Option<Value>,
		new_value: Option<Value>,
	},
	#[serde(rename = "MarkerOperation", rename_all = "camelCase")]
	Marker {
		base_version: Option<u64>,
		name: String,
		old_range: Option<RangeJson>,
		new_range: Option<RangeJson>,
		affects_data: bool,
	},
	#[serde(rename = "RootOperation", rename_all = "camelCase")]
	Root {
		base_version: Option<u64>,
		root_name: String,
		element_name: String,
		is_add: bool,
	},
	#[serde(rename = "NoOperation", rename_all = "camelCase")]
	NoOp { base_version: Option<u64> },
}

fn position_to_json(position: &Position, roots: &impl RootNames) -> Result<PositionJson> {
	let root = roots
		.root_name(position.root)
		.ok_or(ModelError::DetachedPositionSerialization)?;
	Ok(PositionJson {
		root: root.to_string(),
		path: position.path.to_vec(),
		stickiness: position.stickiness,
	})
}

fn position_from_json(json: PositionJson, roots: &impl RootNames) -> Result<Position> {
	let root = roots
		.root_by_name(&json.root)
		.ok_or_else(|| ModelError::UnknownRoot(json.root.clone()))?;
	Ok(Position::new(root, json.path).with_stickiness(json.stickiness))
}

fn range_to_json(range: &Range, roots: &impl RootNames) -> Result<RangeJson> {
	Ok(RangeJson {
		start: position_to_json(&range.start, roots)?,
		end: position_to_json(&range.end, roots)?,
	})
}

fn range_from_json(json: RangeJson, roots: &impl RootNames) -> Result<Range> {
	Ok(Range::new(
		position_from_json(json.start, roots)?,
		position_from_json(json.end, roots)?,
	))
}

impl Operation {
	/// Serializes the operation. Positions are written with root names, so
	/// operations on detached trees cannot be serialized.
	pub fn to_json(&self, roots: &impl RootNames) -> Result<Value> {
		let wire = match self {
			Self::Insert(op) => Wire::Insert {
				base_version: op.base_version,
				position: position_to_json(&op.position, roots)?,
				nodes: op.nodes.clone(),
				should_receive_attributes: op.should_receive_attributes,
			},
			Self::Move(op) => Wire::Move {
				base_version: op.base_version,
				source_position: position_to_json(&op.source_position, roots)?,
				how_many: op.how_many,
				target_position: position_to_json(&op.target_position, roots)?,
			},
			Self::Merge(op) => Wire::Merge {
				base_version: op.base_version,
				source_position: position_to_json(&op.source_position, roots)?,
				how_many: op.how_many,
				target_position: position_to_json(&op.target_position, roots)?,
				graveyard_position: position_to_json(&op.graveyard_position, roots)?,
			},
			Self::Split(op) => Wire::Split {
				base_version: op.base_version,
				split_position: position_to_json(&op.split_position, roots)?,
				how_many: op.how_many,
				insertion_position: position_to_json(&op.insertion_position, roots)?,
				graveyard_position: op
					.graveyard_position
					.as_ref()
					.map(|p| position_to_json(p, roots))
					.transpose()?,
			},
			Self::Rename(op) => Wire::Rename {
				base_version: op.base_version,
				position: position_to_json(&op.position, roots)?,
				old_name: op.old_name.clone(),
				new_name: op.new_name.clone(),
			},
			Self::Attribute(op) => Wire::Attribute {
				base_version: op.base_version,
				range: range_to_json(&op.range, roots)?,
				key: op.key.clone(),
				old_value: op.old_value.clone(),
				new_value: op.new_value.clone(),
			},
			Self::RootAttribute(op) => Wire::RootAttribute {
				base_version: op.base_version,
				root: roots
					.root_name(op.root)
					.ok_or(ModelError::DetachedPositionSerialization)?
					.to_string(),
				key: op.key.clone(),
				old_value: op.old_value.clone(),
				new_value: op.new_value.clone(),
			},
			Self::Marker(op) => Wire::Marker {
				base_version: op.base_version,
				name: op.name.clone(),
				old_range: op.old_range.as_ref().map(|r| range_to_json(r, roots)).transpose()?,
				new_range: op.new_range.as_ref().map(|r| range_to_json(r, roots)).transpose()?,
				affects_data: op.affects_data,
			},
			Self::Root(op) => Wire::Root {
				base_version: op.base_version,
				root_name: op.root_name.clone(),
				element_name: op.element_name.clone(),
				is_add: op.is_add,
			},
			Self::NoOp { base_version } => Wire::NoOp {
				base_version: *base_version,
			},
		};
		Ok(serde_json::to_value(wire)?)
	}

	/// Rebuilds an operation from [`Operation::to_json`] output.
	pub fn from_json(json: Value, roots: &impl RootNames) -> Result<Operation> {
		let wire: Wire = serde_json::from_value(json)?;
		Ok(match wire {
			Wire::Insert {
				base_version,
				position,
				nodes,
				should_receive_attributes,
			} => {
				let mut op = InsertOperation::new(position_from_json(position, roots)?, nodes, base_version);
				op.should_receive_attributes = should_receive_attributes;
				Self::Insert(op)
			}
			Wire::Move {
				base_version,
				source_position,
				how_many,
				target_position,
			} => Self::Move(MoveOperation {
				source_position: position_from_json(source_position, roots)?,
				how_many,
				target_position: position_from_json(target_position, roots)?,
				base_version,
			}),
			Wire::Merge {
				base_version,
				source_position,
				how_many,
				target_position,
				graveyard_position,
			} => Self::Merge(MergeOperation {
				source_position: position_from_json(source_position, roots)?,
				how_many,
				target_position: position_from_json(target_position, roots)?,
				graveyard_position: position_from_json(graveyard_position, roots)?,
				base_version,
			}),
			Wire::Split {
				base_version,
				split_position,
				how_many,
				insertion_position,
				graveyard_position,
			} => Self::Split(SplitOperation {
				split_position: position_from_json(split_position, roots)?,
				how_many,
				insertion_position: position_from_json(insertion_position, roots)?,
				graveyard_position: graveyard_position.map(|p| position_from_json(p, roots)).transpose()?,
				base_version,
			}),
			Wire::Rename {
				base_version,
				position,
				old_name,
				new_name,
			} => Self::Rename(RenameOperation {
				position: position_from_json(position, roots)?,
				old_name,
				new_name,
				base_version,
			}),
			Wire::Attribute {
				base_version,
				range,
				key,
				old_value,
				new_value,
			} => Self::Attribute(AttributeOperation {
				range: range_from_json(range, roots)?,
				key,
				old_value,
				new_value,
				base_version,
			}),
			Wire::RootAttribute {
				base_version,
				root,
				key,
				old_value,
				new_value,
			} => Self::RootAttribute(RootAttributeOperation {
				root: roots.root_by_name(&root).ok_or(ModelError::UnknownRoot(root))?,
				key,
				old_value,
				new_value,
				base_version,
			}),
			Wire::Marker {
				base_version,
				name,
				old_range,
				new_range,
				affects_data,
			} => Self::Marker(MarkerOperation {
				name,
				old_range: old_range.map(|r| range_from_json(r, roots)).transpose()?,
				new_range: new_range.map(|r| range_from_json(r, roots)).transpose()?,
				affects_data,
				base_version,
			}),
			Wire::Root {
				base_version,
				root_name,
				element_name,
				is_add,
			} => Self::Root(RootOperation {
				root_name,
				element_name,
				is_add,
				base_version,
			}),
			Wire::NoOp { base_version } => Self::NoOp { base_version },
		})
	}
}
