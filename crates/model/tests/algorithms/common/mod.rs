//! Common utilities for algorithm integration tests.

use folio_model::dev_utils::{get_data, parse, set_data};
use folio_model::schema::AttributeProperties;
use folio_model::{ItemDefinition, Model, NodeId, Result, Writer};

/// Model with a small editor-like schema and `markup` in the `main` root.
pub fn model(markup: &str) -> Model {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let mut model = Model::new();
	let schema = model.schema_mut();
	let items = [
		("paragraph", ItemDefinition::new().inherit_all_from("$block").allow_attributes(&["align"])),
		("heading1", ItemDefinition::new().inherit_all_from("$block")),
		("blockQuote", ItemDefinition::new().inherit_all_from("$container")),
		(
			"image",
			ItemDefinition::new().inherit_all_from("$blockObject").allow_attributes(&["src", "align"]),
		),
		("imageInline", ItemDefinition::new().inherit_all_from("$inlineObject")),
		("table", ItemDefinition::new().inherit_all_from("$blockObject")),
		(
			"tableCell",
			ItemDefinition::new().allow_in(&["table"]).allow_content_of(&["$root"]).limit(true),
		),
	];
	for (name, definition) in items {
		schema.register(name, definition).expect("schema item registers");
	}
	schema
		.extend("$text", ItemDefinition::new().allow_attributes(&["bold", "italic"]))
		.expect("$text extends");
	schema.set_attribute_properties("align", AttributeProperties {
		copy_on_replace: Some(true),
		..AttributeProperties::default()
	});
	model.create_root("$root", "main").expect("root is created");
	set(&mut model, markup);
	model
}

pub fn set(model: &mut Model, markup: &str) {
	set_data(model, "main", markup).expect("test markup parses");
}

pub fn data(model: &Model) -> String {
	get_data(model, "main").expect("main root exists")
}

/// Parses markup into a detached fragment inside a change block.
pub fn fragment(writer: &mut Writer<'_>, markup: &str) -> Result<NodeId> {
	parse(writer, markup).map(|(fragment, _)| fragment)
}
