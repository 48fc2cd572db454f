#![allow(unused_crate_dependencies)]

#[path = "algorithms/common/mod.rs"]
mod common;

#[path = "algorithms/delete_content.rs"]
mod delete_content;

#[path = "algorithms/insert_content.rs"]
mod insert_content;

#[path = "algorithms/insert_object.rs"]
mod insert_object;

#[path = "algorithms/modify_selection.rs"]
mod modify_selection;
