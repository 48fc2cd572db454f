//! Markup helpers for tests and debugging.
//!
//! Content is written as `<paragraph>fo[o</paragraph><image src="a.png"/>`:
//! elements as tags, attributed text inside `<$text key="value">` tags, and
//! the selection as `[` `]` or a `[]` caret. Attribute values that parse as
//! JSON are stored as JSON; anything else is a string.

use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::model::Model;
use crate::node::{Attributes, NodeId, Tree};
use crate::position::{Path, Position};
use crate::range::Range;
use crate::selection::Selectable;
use crate::writer::Writer;

const TEXT_TAG: &str = "$text";

/// Replaces the content of a root with parsed markup and puts the document
/// selection where the markup says.
pub fn set_data(model: &mut Model, root_name: &str, markup: &str) -> Result<()> {
	let root = model
		.document()
		.root(root_name)
		.ok_or_else(|| ModelError::RootNotFound(root_name.to_string()))?;
	model.change(|writer| {
		let (fragment, boundaries) = parse(writer, markup)?;
		if !writer.tree().is_empty(root) {
			let content = writer.create_range_in(root);
			writer.remove(content)?;
		}
		writer.insert(fragment, Position::at(writer.tree(), root, 0))?;
		let at = |path: &Path| Position::new(root, path.iter().copied());
		let selectable = match boundaries.as_slice() {
			[] => return Ok(()),
			[caret] => Selectable::Position(at(caret)),
			[start, end] => Selectable::Range(Range::new(at(start), at(end))),
			_ => return Err(ModelError::InvalidMarkup("more than one selection range".into())),
		};
		writer.set_selection(selectable, false)
	})
}

/// Markup of a root, with the document selection when it is in that root.
pub fn get_data(model: &Model, root_name: &str) -> Result<String> {
	let document = model.document();
	let root = document
		.root(root_name)
		.ok_or_else(|| ModelError::RootNotFound(root_name.to_string()))?;
	let ranges: Vec<Range> = document
		.selection()
		.ranges()
		.filter(|range| range.root() == root)
		.cloned()
		.collect();
	Ok(stringify(document.tree(), root, &ranges))
}

/// Markup of the children of `element` with `ranges` drawn in.
pub fn stringify(tree: &Tree, element: NodeId, ranges: &[Range]) -> String {
	let mut boundaries = Vec::new();
	for range in ranges {
		if range.is_collapsed() {
			boundaries.push((range.start.clone(), "[]"));
		} else {
			boundaries.push((range.start.clone(), "["));
			boundaries.push((range.end.clone(), "]"));
		}
	}
	// Closing brackets first where ranges touch.
	boundaries.sort_by_key(|(_, mark)| *mark != "]");
	let mut out = String::new();
	write_children(tree, element, &boundaries, &mut out);
	out
}

fn write_children(tree: &Tree, parent: NodeId, boundaries: &[(Position, &str)], out: &mut String) {
	let root = tree.root_of(parent);
	let path = tree.path_of(parent);
	let mark = |offset: usize, out: &mut String| {
		for (position, mark) in boundaries {
			if position.root == root && position.parent_path() == path.as_slice() && position.offset() == offset {
				out.push_str(mark);
			}
		}
	};
	let mut offset = 0;
	for &child in tree.children(parent) {
		mark(offset, out);
		if let Some(text) = tree.text(child) {
			let attrs = tree.attrs(child);
			if !attrs.is_empty() {
				write_open_tag(TEXT_TAG, attrs, out);
			}
			for (index, ch) in text.chars().enumerate() {
				if index > 0 {
					mark(offset + index, out);
				}
				out.push(ch);
			}
			if !attrs.is_empty() {
				out.push_str("</$text>");
			}
			offset += tree.size(child);
			continue;
		}
		let name = tree.name(child).unwrap_or_default();
		write_open_tag(name, tree.attrs(child), out);
		write_children(tree, child, boundaries, out);
		out.push_str("</");
		out.push_str(name);
		out.push('>');
		offset += 1;
	}
	mark(offset, out);
}

fn write_open_tag(name: &str, attrs: &Attributes, out: &mut String) {
	out.push('<');
	out.push_str(name);
	let mut keys: Vec<&String> = attrs.keys().collect();
	keys.sort();
	for key in keys {
		let value = match &attrs[key.as_str()] {
			Value::String(s) => s.clone(),
			other => other.to_string(),
		};
		out.push_str(&format!(" {key}=\"{}\"", value.replace('"', "&quot;")));
	}
	out.push('>');
}

struct Frame {
	node: NodeId,
	name: String,
	offset: usize,
}

/// Parses markup into a detached fragment. Returns it with the selection
/// boundary paths, relative to the fragment, in document order.
pub fn parse(writer: &mut Writer<'_>, markup: &str) -> Result<(NodeId, Vec<Path>)> {
	let fragment = writer.create_document_fragment();
	let mut stack = vec![Frame {
		node: fragment,
		name: String::new(),
		offset: 0,
	}];
	let mut text_attrs: Option<Attributes> = None;
	let mut boundaries = Vec::new();
	let mut rest = markup;

	while let Some(c) = rest.chars().next() {
		match c {
			'[' | ']' => {
				boundaries.push(stack.iter().map(|frame| frame.offset).collect::<Path>());
				rest = &rest[1..];
			}
			'<' => {
				let end = rest
					.find('>')
					.ok_or_else(|| ModelError::InvalidMarkup("unterminated tag".into()))?;
				let tag = &rest[1..end];
				rest = &rest[end + 1..];
				if let Some(name) = tag.strip_prefix('/') {
					close_tag(name.trim(), &mut stack, &mut text_attrs)?;
					continue;
				}
				let self_closing = tag.ends_with('/');
				let (name, attrs) = parse_tag(tag.trim_end_matches('/'))?;
				if name == TEXT_TAG {
					text_attrs = Some(attrs);
					continue;
				}
				let frame = current(&mut stack)?;
				let element = writer.append_element(&name, attrs, frame.node)?;
				if self_closing {
					frame.offset += 1;
				} else {
					stack.push(Frame {
						node: element,
						name,
						offset: 0,
					});
				}
			}
			_ => {
				let end = rest.find(['<', '[', ']']).unwrap_or(rest.len());
				let text = &rest[..end];
				rest = &rest[end..];
				let frame = current(&mut stack)?;
				writer.append_text(text, text_attrs.clone().unwrap_or_default(), frame.node)?;
				frame.offset += text.chars().count();
			}
		}
	}
	if stack.len() > 1 || text_attrs.is_some() {
		return Err(ModelError::InvalidMarkup("unclosed tag".into()));
	}
	Ok((fragment, boundaries))
}

fn current(stack: &mut [Frame]) -> Result<&mut Frame> {
	stack
		.last_mut()
		.ok_or_else(|| ModelError::InvalidMarkup("closing tag without an opening one".into()))
}

fn close_tag(name: &str, stack: &mut Vec<Frame>, text_attrs: &mut Option<Attributes>) -> Result<()> {
	if name == TEXT_TAG {
		return match text_attrs.take() {
			Some(_) => Ok(()),
			None => Err(ModelError::InvalidMarkup("stray </$text>".into())),
		};
	}
	if stack.len() < 2 || stack.last().is_some_and(|frame| frame.name != name) {
		return Err(ModelError::InvalidMarkup(format!("unexpected </{name}>")));
	}
	stack.pop();
	current(stack)?.offset += 1;
	Ok(())
}

fn parse_tag(tag: &str) -> Result<(String, Attributes)> {
	let tag = tag.trim();
	let (name, mut rest) = tag.split_once(char::is_whitespace).unwrap_or((tag, ""));
	if name.is_empty() {
		return Err(ModelError::InvalidMarkup("empty tag".into()));
	}
	let mut attrs = Attributes::new();
	loop {
		rest = rest.trim_start();
		if rest.is_empty() {
			break;
		}
		let bad = || ModelError::InvalidMarkup(format!("malformed attribute in <{name}>"));
		let (key, after) = rest.split_once("=\"").ok_or_else(bad)?;
		let (raw, after) = after.split_once('"').ok_or_else(bad)?;
		let raw = raw.replace("&quot;", "\"");
		let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
		attrs.insert(key.trim().to_string(), value);
		rest = after;
	}
	Ok((name.to_string(), attrs))
}
