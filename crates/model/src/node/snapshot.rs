use serde::{Deserialize, Serialize};

use super::{Attributes, NodeData, NodeId, Tree};
use crate::error::Result;

/// Owned, serializable copy of a subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSnapshot {
	Text {
		data: String,
		#[serde(default, skip_serializing_if = "Attributes::is_empty")]
		attributes: Attributes,
	},
	Element {
		name: String,
		#[serde(default, skip_serializing_if = "Attributes::is_empty")]
		attributes: Attributes,
		#[serde(default, skip_serializing_if = "Vec::is_empty")]
		children: Vec<NodeSnapshot>,
	},
}

impl NodeSnapshot {
	/// Offset size of the snapshot once materialized.
	pub fn size(&self) -> usize {
		match self {
			Self::Text { data, .. } => data.chars().count(),
			Self::Element { .. } => 1,
		}
	}
}

impl Tree {
	/// Copies `id` into a snapshot. A fragment yields a nameless element
	/// holding copies of its children.
	pub fn snapshot(&self, id: NodeId) -> Result<NodeSnapshot> {
		Ok(match &self.node(id)?.data {
			NodeData::Text { data, attrs } => NodeSnapshot::Text {
				data: data.clone(),
				attributes: attrs.clone(),
			},
			NodeData::Element { name, attrs, children } => NodeSnapshot::Element {
				name: name.clone(),
				attributes: attrs.clone(),
				children: children.iter().map(|&c| self.snapshot(c)).collect::<Result<_>>()?,
			},
			NodeData::Fragment { children, .. } => NodeSnapshot::Element {
				name: String::new(),
				attributes: Attributes::new(),
				children: children.iter().map(|&c| self.snapshot(c)).collect::<Result<_>>()?,
			},
		})
	}

	/// Creates detached nodes from a snapshot.
	pub fn materialize(&mut self, snapshot: &NodeSnapshot) -> NodeId {
		match snapshot {
			NodeSnapshot::Text { data, attributes } => self.create_text(data.clone(), attributes.clone()),
			NodeSnapshot::Element {
				name,
				attributes,
				children,
			} => {
				let element = self.create_element(name.clone(), attributes.clone());
				let ids: Vec<NodeId> = children.iter().map(|c| self.materialize(c)).collect();
				for &child in &ids {
					if let Ok(node) = self.node_mut(child) {
						node.parent = Some(element);
					}
				}
				if let Ok(node) = self.node_mut(element)
					&& let NodeData::Element { children, .. } = &mut node.data
				{
					*children = ids;
				}
				element
			}
		}
	}
}
