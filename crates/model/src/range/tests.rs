use folio_primitives::Stickiness;

use super::*;
use crate::node::Attributes;

fn r() -> NodeId {
	NodeId(0, 0)
}

fn p(path: &[usize]) -> Position {
	Position::new(r(), path.iter().copied())
}

fn range(a: &[usize], b: &[usize]) -> Range {
	Range::new(p(a), p(b))
}

fn paths(ranges: &[Range]) -> Vec<(Vec<usize>, Vec<usize>)> {
	ranges.iter().map(|r| (r.start.path.to_vec(), r.end.path.to_vec())).collect()
}

#[test]
fn new_sets_boundary_stickiness() {
	let open = range(&[0, 1], &[0, 3]);
	assert_eq!(open.start.stickiness, Stickiness::ToNext);
	assert_eq!(open.end.stickiness, Stickiness::ToPrevious);
	let collapsed = range(&[0, 1], &[0, 1]);
	assert_eq!(collapsed.start.stickiness, Stickiness::ToNone);
	let swapped = range(&[1], &[0]);
	assert_eq!(swapped.start.path.as_slice(), &[0]);
}

#[test]
fn containment_and_intersection() {
	let a = range(&[0], &[4]);
	assert!(a.contains_position(&p(&[2, 5])));
	assert!(!a.contains_position(&p(&[0])));
	assert!(a.contains_range(&range(&[0], &[2]), true));
	assert!(!a.contains_range(&range(&[0], &[2]), false));
	assert!(a.is_intersecting(&range(&[3], &[6])));
	assert!(!a.is_intersecting(&range(&[4], &[6])));
	assert_eq!(paths(&a.difference(&range(&[1], &[2]))), vec![(vec![0], vec![1]), (vec![2], vec![4])]);
	assert_eq!(a.intersection(&range(&[3], &[6])), Some(range(&[3], &[4])));
	assert_eq!(a.join(&range(&[4], &[6]), None), Some(range(&[0], &[6])));
	assert_eq!(a.join(&range(&[5], &[6]), None), None);
}

#[test]
fn insertion_inside_keeps_or_spreads() {
	let a = range(&[0, 1], &[0, 4]);
	assert_eq!(paths(&a.transformed_by_insertion(&p(&[0, 2]), 2, false)), vec![(vec![0, 1], vec![0, 6])]);
	assert_eq!(
		paths(&a.transformed_by_insertion(&p(&[0, 2]), 2, true)),
		vec![(vec![0, 1], vec![0, 2]), (vec![0, 4], vec![0, 6])]
	);
	// Insertion at a boundary stays outside.
	assert_eq!(paths(&a.transformed_by_insertion(&p(&[0, 1]), 2, false)), vec![(vec![0, 3], vec![0, 6])]);
	assert_eq!(paths(&a.transformed_by_insertion(&p(&[0, 4]), 2, false)), vec![(vec![0, 1], vec![0, 4])]);
}

#[test]
fn deletion_shrinks_to_point() {
	let a = range(&[0, 2], &[0, 6]);
	assert_eq!(a.transformed_by_deletion(&p(&[0, 1]), 3), Some(range(&[0, 1], &[0, 3])));
	assert_eq!(range(&[0, 2], &[0, 3]).transformed_by_deletion(&p(&[0, 1]), 5), None);
}

#[test]
fn move_splits_into_parts() {
	// Range [0,0]-[0,6], move offsets 2..4 to another parent.
	let a = range(&[0, 0], &[0, 6]);
	let result = a.transformed_by_move(&p(&[0, 2]), &p(&[1, 0]), 2, false);
	assert_eq!(paths(&result), vec![(vec![0, 0], vec![0, 4]), (vec![1, 0], vec![1, 2])]);
	let glued = Range::from_ranges(result).unwrap();
	assert_eq!(glued, range(&[0, 0], &[0, 4]));
}

#[test]
fn minimal_flat_ranges_cover_the_range() {
	let mut tree = Tree::new();
	let root = tree.create_element("$root", Attributes::new());
	let a = tree.create_element("p", Attributes::new());
	let b = tree.create_element("p", Attributes::new());
	let c = tree.create_element("p", Attributes::new());
	for (el, text) in [(a, "abc"), (b, "def"), (c, "ghi")] {
		let t = tree.create_text(text, Attributes::new());
		tree.append(el, &[t]).unwrap();
	}
	tree.append(root, &[a, b, c]).unwrap();
	let range = Range::new(Position::new(root, [0, 1]), Position::new(root, [2, 2]));
	let flat = range.minimal_flat_ranges(&tree).unwrap();
	assert_eq!(paths(&flat), vec![
		(vec![0, 1], vec![0, 3]),
		(vec![1], vec![2]),
		(vec![2, 0], vec![2, 2]),
	]);
	assert_eq!(range.common_ancestor(&tree), Some(root));
	assert!(range.contains_item(&tree, b));
	assert!(!range.contains_item(&tree, a));
}
