use serde::{Deserialize, Serialize};

/// Direction of a single walk through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	/// Towards the end of the document.
	#[default]
	Forward,
	/// Towards the start of the document.
	Backward,
}

impl Direction {
	/// Returns the opposite direction.
	pub fn reverse(self) -> Self {
		match self {
			Self::Forward => Self::Backward,
			Self::Backward => Self::Forward,
		}
	}

	/// Returns `true` for [`Direction::Forward`].
	pub fn is_forward(self) -> bool {
		matches!(self, Self::Forward)
	}
}

/// Direction of a search that may alternate between both sides of a start point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDirection {
	Forward,
	Backward,
	/// Alternates backward and forward steps, backward first.
	#[default]
	Both,
}

impl SearchDirection {
	/// Returns whether the search takes backward steps.
	pub fn includes_backward(self) -> bool {
		matches!(self, Self::Backward | Self::Both)
	}

	/// Returns whether the search takes forward steps.
	pub fn includes_forward(self) -> bool {
		matches!(self, Self::Forward | Self::Both)
	}
}

impl From<Direction> for SearchDirection {
	fn from(direction: Direction) -> Self {
		match direction {
			Direction::Forward => Self::Forward,
			Direction::Backward => Self::Backward,
		}
	}
}
