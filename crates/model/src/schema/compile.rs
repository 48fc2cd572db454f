//! Turns the registered rule fragments into resolved item definitions.

use bitflags::bitflags;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use tracing::debug;

bitflags! {
	/// Semantic flags of a schema item.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct ItemFlags: u8 {
		const BLOCK = 1 << 0;
		const INLINE = 1 << 1;
		const LIMIT = 1 << 2;
		const OBJECT = 1 << 3;
		const SELECTABLE = 1 << 4;
		const CONTENT = 1 << 5;
	}
}

const FLAG_ORDER: [ItemFlags; 6] = [
	ItemFlags::BLOCK,
	ItemFlags::INLINE,
	ItemFlags::LIMIT,
	ItemFlags::OBJECT,
	ItemFlags::SELECTABLE,
	ItemFlags::CONTENT,
];

/// One rule fragment passed to `register` or `extend`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemDefinition {
	pub allow_in: Vec<String>,
	pub allow_children: Vec<String>,
	pub allow_attributes: Vec<String>,
	pub allow_content_of: Vec<String>,
	pub allow_where: Vec<String>,
	pub allow_attributes_of: Vec<String>,
	pub inherit_types_from: Vec<String>,
	/// Shorthand for `allow_content_of`, `allow_where`,
	/// `allow_attributes_of` and `inherit_types_from` of one item.
	pub inherit_all_from: Option<String>,
	pub disallow_in: Vec<String>,
	pub disallow_children: Vec<String>,
	pub disallow_attributes: Vec<String>,
	pub is_block: Option<bool>,
	pub is_inline: Option<bool>,
	pub is_limit: Option<bool>,
	pub is_object: Option<bool>,
	pub is_selectable: Option<bool>,
	pub is_content: Option<bool>,
}

fn strings(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}

impl ItemDefinition {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn allow_in(mut self, names: &[&str]) -> Self {
		self.allow_in.extend(strings(names));
		self
	}

	pub fn allow_children(mut self, names: &[&str]) -> Self {
		self.allow_children.extend(strings(names));
		self
	}

	pub fn allow_attributes(mut self, names: &[&str]) -> Self {
		self.allow_attributes.extend(strings(names));
		self
	}

	pub fn allow_content_of(mut self, names: &[&str]) -> Self {
		self.allow_content_of.extend(strings(names));
		self
	}

	pub fn allow_where(mut self, names: &[&str]) -> Self {
		self.allow_where.extend(strings(names));
		self
	}

	pub fn allow_attributes_of(mut self, names: &[&str]) -> Self {
		self.allow_attributes_of.extend(strings(names));
		self
	}

	pub fn inherit_types_from(mut self, names: &[&str]) -> Self {
		self.inherit_types_from.extend(strings(names));
		self
	}

	pub fn inherit_all_from(mut self, name: &str) -> Self {
		self.inherit_all_from = Some(name.to_string());
		self
	}

	pub fn disallow_in(mut self, names: &[&str]) -> Self {
		self.disallow_in.extend(strings(names));
		self
	}

	pub fn disallow_children(mut self, names: &[&str]) -> Self {
		self.disallow_children.extend(strings(names));
		self
	}

	pub fn disallow_attributes(mut self, names: &[&str]) -> Self {
		self.disallow_attributes.extend(strings(names));
		self
	}

	pub fn block(mut self, value: bool) -> Self {
		self.is_block = Some(value);
		self
	}

	pub fn inline(mut self, value: bool) -> Self {
		self.is_inline = Some(value);
		self
	}

	pub fn limit(mut self, value: bool) -> Self {
		self.is_limit = Some(value);
		self
	}

	pub fn object(mut self, value: bool) -> Self {
		self.is_object = Some(value);
		self
	}

	pub fn selectable(mut self, value: bool) -> Self {
		self.is_selectable = Some(value);
		self
	}

	pub fn content(mut self, value: bool) -> Self {
		self.is_content = Some(value);
		self
	}

	fn flag_values(&self) -> [Option<bool>; 6] {
		[
			self.is_block,
			self.is_inline,
			self.is_limit,
			self.is_object,
			self.is_selectable,
			self.is_content,
		]
	}
}

/// A resolved schema item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledItem {
	pub name: String,
	/// Flags as declared or inherited. `OBJECT` is not folded into `LIMIT`,
	/// `SELECTABLE` or `CONTENT` here; the schema queries apply that.
	pub flags: ItemFlags,
	pub allow_in: FxHashSet<String>,
	pub allow_children: FxHashSet<String>,
	pub allow_attributes: FxHashSet<String>,
}

#[derive(Debug, Default)]
struct Base {
	allow_in: FxHashSet<String>,
	own_allow_in: FxHashSet<String>,
	disallow_in: FxHashSet<String>,
	allow_attributes: FxHashSet<String>,
	disallow_attributes: FxHashSet<String>,
	allow_content_of: Vec<String>,
	allow_where: Vec<String>,
	allow_attributes_of: Vec<String>,
	inherit_types_from: Vec<String>,
	flags: [Option<bool>; 6],
}

/// Compiles rule fragments in the fixed resolution order.
pub(crate) fn compile(sources: &IndexMap<String, Vec<ItemDefinition>>) -> IndexMap<String, CompiledItem> {
	// Merge same-named fragments.
	let mut bases: IndexMap<&str, Base> = IndexMap::new();
	for (name, fragments) in sources {
		let mut base = Base::default();
		for fragment in fragments {
			base.allow_in.extend(fragment.allow_in.iter().cloned());
			base.disallow_in.extend(fragment.disallow_in.iter().cloned());
			base.allow_attributes.extend(fragment.allow_attributes.iter().cloned());
			base.disallow_attributes.extend(fragment.disallow_attributes.iter().cloned());
			base.allow_content_of.extend(fragment.allow_content_of.iter().cloned());
			base.allow_where.extend(fragment.allow_where.iter().cloned());
			base.allow_attributes_of.extend(fragment.allow_attributes_of.iter().cloned());
			base.inherit_types_from.extend(fragment.inherit_types_from.iter().cloned());
			if let Some(from) = &fragment.inherit_all_from {
				base.allow_content_of.push(from.clone());
				base.allow_where.push(from.clone());
				base.allow_attributes_of.push(from.clone());
				base.inherit_types_from.push(from.clone());
			}
			for (slot, value) in base.flags.iter_mut().zip(fragment.flag_values()) {
				if value.is_some() {
					*slot = value;
				}
			}
		}
		bases.insert(name.as_str(), base);
	}

	// Mirror child declarations onto the parent side.
	for (name, fragments) in sources {
		for fragment in fragments {
			for child in &fragment.allow_children {
				if let Some(base) = bases.get_mut(child.as_str()) {
					base.allow_in.insert(name.clone());
				}
			}
			for child in &fragment.disallow_children {
				if let Some(base) = bases.get_mut(child.as_str()) {
					base.disallow_in.insert(name.clone());
				}
			}
		}
	}

	// Disallow wins over allow declared for the same item.
	for base in bases.values_mut() {
		let disallowed = base.disallow_in.clone();
		base.allow_in.retain(|p| !disallowed.contains(p));
		let disallowed_attrs = base.disallow_attributes.clone();
		base.allow_attributes.retain(|a| !disallowed_attrs.contains(a));
		base.own_allow_in = base.allow_in.clone();
	}

	// Disallows inherited through `allow_where` never beat an own allow.
	let names: Vec<&str> = bases.keys().copied().collect();
	let mut blocked: FxHashMap<&str, FxHashSet<String>> = FxHashMap::default();
	for &name in &names {
		let mut inherited = FxHashSet::default();
		collect_inherited_disallows(&bases, name, &mut inherited, &mut FxHashSet::default());
		let base = &bases[name];
		let mut set: FxHashSet<String> = base.disallow_in.clone();
		set.extend(inherited.into_iter().filter(|p| !base.own_allow_in.contains(p)));
		blocked.insert(name, set);
	}

	// Resolve references until nothing changes.
	loop {
		let mut changed = false;
		for &name in &names {
			let sources: Vec<String> = bases[name].allow_where.clone();
			for source in sources {
				let Some(parents) = bases.get(source.as_str()).map(|b| b.allow_in.clone()) else {
					continue;
				};
				let blocked_here = &blocked[name];
				let base = &mut bases[name];
				for parent in parents {
					if !blocked_here.contains(&parent) && base.allow_in.insert(parent) {
						changed = true;
					}
				}
			}
		}
		for &name in &names {
			let sources: Vec<String> = bases[name].allow_content_of.clone();
			for source in sources {
				for &child in &names {
					if bases[child].allow_in.contains(&source)
						&& !blocked[child].contains(name)
						&& bases[child].allow_in.insert(name.to_string())
					{
						changed = true;
					}
				}
			}
		}
		for &name in &names {
			let sources: Vec<String> = bases[name].allow_attributes_of.clone();
			for source in sources {
				let Some(attrs) = bases.get(source.as_str()).map(|b| b.allow_attributes.clone()) else {
					continue;
				};
				let base = &mut bases[name];
				for attr in attrs {
					if !base.disallow_attributes.contains(&attr) && base.allow_attributes.insert(attr) {
						changed = true;
					}
				}
			}
		}
		if !changed {
			break;
		}
	}

	let mut compiled: IndexMap<String, CompiledItem> = IndexMap::new();
	for &name in &names {
		let flags = resolve_flags(&bases, name, &mut FxHashSet::default());
		let base = &bases[name];
		let allow_in: FxHashSet<String> = base
			.allow_in
			.iter()
			.filter(|p| bases.contains_key(p.as_str()))
			.cloned()
			.collect();
		compiled.insert(name.to_string(), CompiledItem {
			name: name.to_string(),
			flags,
			allow_in,
			allow_children: FxHashSet::default(),
			allow_attributes: base.allow_attributes.clone(),
		});
	}
	let edges: Vec<(String, String)> = compiled
		.values()
		.flat_map(|item| item.allow_in.iter().map(|p| (p.clone(), item.name.clone())))
		.collect();
	for (parent, child) in edges {
		if let Some(item) = compiled.get_mut(&parent) {
			item.allow_children.insert(child);
		}
	}
	debug!(items = compiled.len(), "schema compiled");
	compiled
}

fn collect_inherited_disallows<'a>(
	bases: &'a IndexMap<&str, Base>,
	name: &'a str,
	out: &mut FxHashSet<String>,
	visiting: &mut FxHashSet<&'a str>,
) {
	if !visiting.insert(name) {
		return;
	}
	let Some(base) = bases.get(name) else {
		return;
	};
	for source in &base.allow_where {
		if let Some((key, inherited)) = bases.get_key_value(source.as_str()) {
			out.extend(inherited.disallow_in.iter().cloned());
			collect_inherited_disallows(bases, key, out, visiting);
		}
	}
}

fn resolve_flags<'a>(bases: &'a IndexMap<&str, Base>, name: &'a str, visiting: &mut FxHashSet<&'a str>) -> ItemFlags {
	let Some(base) = bases.get(name) else {
		return ItemFlags::empty();
	};
	if !visiting.insert(name) {
		return explicit_flags(base);
	}
	let mut values = base.flags;
	for source in &base.inherit_types_from {
		let Some((key, _)) = bases.get_key_value(source.as_str()) else {
			continue;
		};
		let inherited = resolve_flags(bases, key, visiting);
		for (slot, flag) in values.iter_mut().zip(FLAG_ORDER) {
			if slot.is_none() && inherited.contains(flag) {
				*slot = Some(true);
			}
		}
	}
	to_flags(values)
}

fn explicit_flags(base: &Base) -> ItemFlags {
	to_flags(base.flags)
}

fn to_flags(values: [Option<bool>; 6]) -> ItemFlags {
	values
		.iter()
		.zip(FLAG_ORDER)
		.filter(|(value, _)| **value == Some(true))
		.fold(ItemFlags::empty(), |acc, (_, flag)| acc | flag)
}
