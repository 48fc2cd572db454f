use crate::node::{Attributes, NodeId, Tree};
use crate::position::Position;

/// One level of a [`SchemaContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContextItem {
	pub name: String,
	pub attrs: Attributes,
}

/// Ordered chain of item names from the outermost ancestor to the item
/// under which something is checked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaContext {
	items: Vec<ContextItem>,
}

impl SchemaContext {
	/// Context built from bare names.
	pub fn from_names<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			items: names
				.into_iter()
				.map(|name| ContextItem {
					name: name.into(),
					attrs: Attributes::new(),
				})
				.collect(),
		}
	}

	/// Context of `node` and its ancestors, `node` last.
	pub fn from_node(tree: &Tree, node: NodeId) -> Self {
		Self {
			items: tree
				.ancestors(node, true)
				.into_iter()
				.filter_map(|id| {
					Some(ContextItem {
						name: tree.item_name(id)?.to_string(),
						attrs: tree.attrs(id).clone(),
					})
				})
				.collect(),
		}
	}

	/// Context of the parent of `position` and its ancestors.
	pub fn from_position(tree: &Tree, position: &Position) -> Self {
		match position.parent(tree) {
			Ok(parent) => Self::from_node(tree, parent),
			Err(_) => Self::default(),
		}
	}

	/// Returns a copy extended with one more item.
	pub fn push(&self, name: impl Into<String>, attrs: Attributes) -> Self {
		let mut items = self.items.clone();
		items.push(ContextItem {
			name: name.into(),
			attrs,
		});
		Self { items }
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn last(&self) -> Option<&ContextItem> {
		self.items.last()
	}

	pub fn get(&self, index: usize) -> Option<&ContextItem> {
		self.items.get(index)
	}

	pub fn iter(&self) -> impl Iterator<Item = &ContextItem> {
		self.items.iter()
	}

	/// Returns whether the item names end with `names`.
	pub fn ends_with(&self, names: &[&str]) -> bool {
		names.len() <= self.items.len()
			&& self.items[self.items.len() - names.len()..]
				.iter()
				.zip(names)
				.all(|(item, name)| item.name == *name)
	}
}
