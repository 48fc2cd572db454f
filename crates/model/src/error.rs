//! Error types for the document model.

use thiserror::Error;

/// Result alias used across the model crate.
pub type Result<T, E = ModelError> = std::result::Result<T, E>;

/// Contract violations surfaced by the model.
///
/// None of these are recoverable by retrying; they signal a caller passing
/// arguments the model cannot honour.
#[derive(Debug, Error)]
pub enum ModelError {
	/// `register` called twice for the same item.
	#[error("schema item '{0}' is already registered")]
	ItemAlreadyRegistered(String),

	/// `extend` called for an item that was never registered.
	#[error("schema item '{0}' is not registered")]
	ItemNotRegistered(String),

	/// A position does not resolve to a location in its tree.
	#[error("invalid position: {0}")]
	InvalidPosition(String),

	/// Low-level insertion of a node that cannot be placed at the target.
	#[error("cannot insert: {0}")]
	InsertForbidden(String),

	/// Merge requested at a position with no element before it.
	#[error("no element before the merge position")]
	MergeNoElementBefore,

	/// Merge requested at a position with no element after it.
	#[error("no element after the merge position")]
	MergeNoElementAfter,

	/// Split requested on a root or inside a document fragment.
	#[error("the split element has no parent")]
	SplitElementNoParent,

	/// The limit element given to `split` is not an ancestor of the position.
	#[error("the limit element is not an ancestor of the split position")]
	SplitInvalidLimitElement,

	/// Wrap called on a range whose ends do not share a parent.
	#[error("the range to wrap is not flat")]
	WrapRangeNotFlat,

	/// Wrap called with an element that already has children.
	#[error("the wrapping element is not empty")]
	WrapElementNotEmpty,

	/// Wrap called with an element that is already in a tree.
	#[error("the wrapping element is already attached")]
	WrapElementAttached,

	/// Unwrap called on a root element.
	#[error("the element to unwrap has no parent")]
	UnwrapElementNoParent,

	/// Move called on a range whose ends do not share a parent.
	#[error("the range to move is not flat")]
	MoveRangeNotFlat,

	/// Move between a document and a detached tree.
	#[error("cannot move content between different documents")]
	MoveDifferentDocument,

	/// Move from an attached tree into a document fragment.
	#[error("cannot move a node from the document to a document fragment")]
	ForbiddenMove,

	/// An attribute operation whose old value does not match the tree.
	#[error("attribute '{key}' has a different old value")]
	WrongOldAttributeValue {
		/// Attribute key that was checked.
		key: String,
	},

	/// Rename called on something other than an element.
	#[error("only elements can be renamed")]
	RenameNotElement,

	/// An object-only API received a non-object element.
	#[error("element '{0}' is not an object")]
	NotAnObject(String),

	/// No valid insertion position could be found.
	#[error("cannot find a position to insert at")]
	InvalidInsertionPosition,

	/// `add_root` called with a name already in use by an attached root.
	#[error("root '{0}' already exists")]
	RootExists(String),

	/// A root name that the document does not know.
	#[error("root '{0}' does not exist")]
	RootNotFound(String),

	/// An operation was applied out of turn.
	#[error("operation base version {base} does not match document version {current}")]
	OperationVersionMismatch {
		/// Version the operation was computed against.
		base: u64,
		/// Current document version.
		current: u64,
	},

	/// A node id that is not (or no longer) present in the tree.
	#[error("node not found")]
	NodeNotFound,

	/// A range pushed into a selection intersects an existing one.
	#[error("selection ranges intersect")]
	SelectionRangeIntersects,

	/// Focus moved on a selection without ranges.
	#[error("cannot set focus on a selection without an anchor")]
	SelectionNoAnchor,

	/// A selectable that cannot be turned into ranges.
	#[error("invalid selectable: {0}")]
	InvalidSelectable(String),

	/// `restore_selection_gravity` received an unknown token.
	#[error("unknown gravity override token")]
	UnknownGravityToken,

	/// A selection boundary ended up where text and selection are not allowed.
	#[error("selection boundary is not a valid position")]
	InvalidSelectionBoundary,

	/// A marker name that uses the reserved separator.
	#[error("marker name '{0}' contains the reserved separator")]
	InvalidMarkerName(String),

	/// A marker that does not exist.
	#[error("marker '{0}' does not exist")]
	MarkerNotFound(String),

	/// A marker that already exists.
	#[error("marker '{0}' already exists")]
	MarkerExists(String),

	/// Marker options that are incompatible with the marker's current state.
	#[error("invalid options for marker '{0}'")]
	MarkerWrongOptions(String),

	/// A writer used outside of its change block.
	#[error("the writer's change block has already finished")]
	StaleWriter,

	/// A live reference used after it was detached.
	#[error("live reference has been detached")]
	DetachedLiveReference,

	/// JSON (de)serialization of operations failed.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// A serialized operation refers to a root the document does not have.
	#[error("unknown root '{0}' in serialized operation")]
	UnknownRoot(String),

	/// Document markup that `dev_utils::parse` cannot read.
	#[error("invalid markup: {0}")]
	InvalidMarkup(String),

	/// A position in a detached tree cannot be serialized.
	#[error("cannot serialize a position in a detached tree")]
	DetachedPositionSerialization,
}
