//! Model configuration.

use folio_primitives::DEFAULT_WORD_BOUNDARIES;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading a [`ModelConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// The auto-paragraph element name is empty.
	#[error("paragraph_element must not be empty")]
	EmptyParagraphElement,
}

/// Tunables of the content algorithms.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
	/// Element used when content has to be auto-wrapped in a block.
	pub paragraph_element: String,
	/// Characters that end a word for word-wise caret movement.
	pub word_boundary_characters: String,
	/// Whether a "character" step treats an emoji cluster as one unit.
	pub treat_emoji_as_single_unit: bool,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			paragraph_element: "paragraph".to_string(),
			word_boundary_characters: DEFAULT_WORD_BOUNDARIES.to_string(),
			treat_emoji_as_single_unit: false,
		}
	}
}

impl ModelConfig {
	/// Parses a configuration from TOML, filling unset keys with defaults.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		if config.paragraph_element.is_empty() {
			return Err(ConfigError::EmptyParagraphElement);
		}
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_toml_gives_defaults() {
		let config = ModelConfig::from_toml_str("").unwrap();
		assert_eq!(config, ModelConfig::default());
		assert_eq!(config.word_boundary_characters, " ,.?!:;\"-()");
	}

	#[test]
	fn overrides_are_applied() {
		let config = ModelConfig::from_toml_str(
			"paragraph_element = \"block\"\ntreat_emoji_as_single_unit = true\n",
		)
		.unwrap();
		assert_eq!(config.paragraph_element, "block");
		assert!(config.treat_emoji_as_single_unit);
	}

	#[test]
	fn unknown_keys_and_empty_paragraph_are_rejected() {
		assert!(ModelConfig::from_toml_str("nope = 1").is_err());
		assert!(matches!(
			ModelConfig::from_toml_str("paragraph_element = \"\""),
			Err(ConfigError::EmptyParagraphElement)
		));
	}
}
