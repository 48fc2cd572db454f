use folio_model::dev_utils::stringify;
use folio_model::{DeleteContentOptions, Position, Range, Selection};
use pretty_assertions::assert_eq;

use crate::common::{data, model};

fn delete(markup: &str, options: DeleteContentOptions) -> String {
	let mut model = model(markup);
	model.delete_content(None, options).expect("content is deleted");
	data(&model)
}

#[test]
fn collapsed_selection_is_left_alone() {
	let mut model = model("<paragraph>fo[]o</paragraph>");
	let version = model.document().version();
	model.delete_content(None, DeleteContentOptions::default()).unwrap();
	assert_eq!(model.document().version(), version);
	assert_eq!(data(&model), "<paragraph>fo[]o</paragraph>");
}

#[test]
fn text_inside_one_block() {
	assert_eq!(
		delete("<paragraph>f[oo b]ar</paragraph>", DeleteContentOptions::default()),
		"<paragraph>f[]ar</paragraph>"
	);
}

#[test]
fn blocks_are_merged() {
	assert_eq!(
		delete("<paragraph>fo[o</paragraph><paragraph>b]ar</paragraph>", DeleteContentOptions::default()),
		"<paragraph>fo[]ar</paragraph>"
	);
	assert_eq!(
		delete("<heading1>fo[o</heading1><paragraph>b]ar</paragraph>", DeleteContentOptions::default()),
		"<heading1>fo[]ar</heading1>"
	);
}

#[test]
fn blocks_stay_apart_when_asked() {
	let options = DeleteContentOptions {
		leave_unmerged: true,
		..DeleteContentOptions::default()
	};
	assert_eq!(
		delete("<paragraph>fo[o</paragraph><paragraph>b]ar</paragraph>", options),
		"<paragraph>fo[]</paragraph><paragraph>ar</paragraph>"
	);
}

#[test]
fn emptied_start_block_takes_the_end_block_type() {
	assert_eq!(
		delete("<heading1>[foo</heading1><paragraph>b]ar</paragraph>", DeleteContentOptions::default()),
		"<paragraph>[]ar</paragraph>"
	);
}

#[test]
fn nested_end_block_is_pulled_into_the_start_branch() {
	assert_eq!(
		delete(
			"<blockQuote><paragraph>fo[o</paragraph></blockQuote><paragraph>b]ar</paragraph>",
			DeleteContentOptions::default()
		),
		"<blockQuote><paragraph>fo[]ar</paragraph></blockQuote>"
	);
}

#[test]
fn block_touched_only_at_its_start_is_not_merged() {
	assert_eq!(
		delete("<paragraph>[foo</paragraph><paragraph>]bar</paragraph>", DeleteContentOptions::default()),
		"<paragraph>[]</paragraph><paragraph>bar</paragraph>"
	);
}

#[test]
fn entire_content_becomes_one_paragraph() {
	assert_eq!(
		delete("<heading1>[foo</heading1><paragraph>bar]</paragraph>", DeleteContentOptions::default()),
		"<paragraph>[]</paragraph>"
	);
	let keep = DeleteContentOptions {
		do_not_reset_entire_content: true,
		..DeleteContentOptions::default()
	};
	assert_eq!(
		delete("<heading1>[foo</heading1><paragraph>bar]</paragraph>", keep),
		"<heading1>[]</heading1>"
	);
}

#[test]
fn removed_object_is_replaced_by_a_paragraph_with_copied_attributes() {
	assert_eq!(
		delete(
			"<paragraph>a</paragraph>[<image align=\"left\" src=\"x.png\"></image>]",
			DeleteContentOptions::default()
		),
		"<paragraph>a</paragraph><paragraph align=\"left\">[]</paragraph>"
	);
}

#[test]
fn limit_elements_are_not_merged_across() {
	assert_eq!(
		delete(
			"<paragraph>fo[o</paragraph><table><tableCell><paragraph>b]ar</paragraph></tableCell></table>",
			DeleteContentOptions::default()
		),
		"<paragraph>fo[]</paragraph><table><tableCell><paragraph>ar</paragraph></tableCell></table>"
	);
}

#[test]
fn detached_selection_is_collapsed_in_place() {
	let mut model = model("<paragraph>[]foobar</paragraph>");
	let root = model.document().root("main").unwrap();
	let mut selection = Selection::from_range(
		Range::new(Position::new(root, [0, 1]), Position::new(root, [0, 4])),
		false,
	);
	model
		.delete_content(Some(&mut selection), DeleteContentOptions::default())
		.unwrap();

	assert_eq!(data(&model), "<paragraph>[]far</paragraph>");
	assert_eq!(
		stringify(model.document().tree(), root, selection.ranges()),
		"<paragraph>f[]ar</paragraph>"
	);
}
