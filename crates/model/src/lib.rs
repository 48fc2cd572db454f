//! Consistency-preserving structured document model.
//!
//! A [`Model`] owns a [`Document`]: a forest of named roots holding elements
//! and attributed text. Every change goes through a [`Writer`] as a sequence
//! of versioned operations, which keeps live positions, markers and the
//! document selection valid and lets concurrent changes be transformed
//! against each other.

mod algorithms;
mod batch;
mod config;
pub mod dev_utils;
mod document;
mod emitter;
mod error;
mod history;
mod live;
mod markers;
mod model;
mod node;
pub mod operation;
mod position;
mod range;
pub mod schema;
mod selection;
mod walker;
mod writer;

pub use algorithms::{DeleteContentOptions, InsertObjectOptions, ModifySelectionOptions, ObjectSelection};
pub use batch::{Batch, BatchId, BatchKind};
pub use config::{ConfigError, ModelConfig};
pub use document::{DEFAULT_ROOT_NAME, Document, DocumentEvent};
pub use emitter::{Emitter, Priority, SubscriptionId};
pub use error::{ModelError, Result};
pub use folio_primitives::{Direction, SearchDirection, Stickiness, TextUnit};
pub use history::History;
pub use live::{LiveChange, LiveEvent, LivePosition, LivePositionId, LiveRange, LiveRangeId};
pub use markers::{MARKER_NAME_SEPARATOR, Marker, MarkerCollection, MarkerData, MarkerEvent};
pub use model::{ContentTarget, HasContentOptions, Model};
pub use node::{Attributes, NodeId, NodeKind, NodeSnapshot, Tree};
pub use operation::Operation;
pub use position::{Path, Position, Relation};
pub use range::Range;
pub use schema::{InsertionPlace, ItemDefinition, Schema, SchemaContext};
pub use selection::{DocumentSelection, GravityToken, Offset, Selectable, Selection, SelectionEvent};
pub use walker::{Item, StepKind, TextProxy, TreeWalker, WalkerOptions, WalkerValue};
pub use writer::{MarkerOptions, SplitResult, Target, Writer};
