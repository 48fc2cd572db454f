//! Tree-independent primitives: directions, stickiness, text units and word boundaries.

/// Directional types for walks and searches.
pub mod direction;
/// Grapheme, combining mark and emoji cluster boundary detection.
pub mod graphemes;
/// Unit-stepping helpers for caret movement inside a text run.
pub mod movement;
/// Boundary attachment of positions.
pub mod stickiness;

pub use direction::{Direction, SearchDirection};
pub use movement::{DEFAULT_WORD_BOUNDARIES, TextUnit};
pub use stickiness::Stickiness;
