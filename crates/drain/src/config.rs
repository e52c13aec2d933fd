//! Drain engine configuration loaded from TOML.
//!
//! ```toml
//! # "indefinite", "immediate", or a whole number of seconds
//! poll_timeout = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::strategy::PollTimeout;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The document is not valid TOML or does not match the schema.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A poll timeout keyword was not recognised.
	#[error("invalid poll timeout '{0}' (expected 'indefinite', 'immediate' or whole seconds)")]
	InvalidPollTimeout(String),
}

/// Startup configuration for a drain engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrainConfig {
	/// Waiting discipline used when no latch is installed.
	pub poll_timeout: PollTimeout,
}

impl DrainConfig {
	/// Parses a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&source)
	}
}

/// On-disk form of [`PollTimeout`].
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum PollTimeoutRepr {
	Seconds(u64),
	Keyword(String),
}

impl TryFrom<PollTimeoutRepr> for PollTimeout {
	type Error = ConfigError;

	fn try_from(repr: PollTimeoutRepr) -> Result<Self, Self::Error> {
		match repr {
			PollTimeoutRepr::Seconds(secs) => Ok(Self::Limit(Duration::from_secs(secs))),
			PollTimeoutRepr::Keyword(word) => match word.as_str() {
				"indefinite" => Ok(Self::Indefinite),
				"immediate" => Ok(Self::Limit(Duration::ZERO)),
				_ => Err(ConfigError::InvalidPollTimeout(word)),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_uses_defaults() {
		let config = DrainConfig::from_toml_str("").unwrap();
		assert_eq!(config, DrainConfig::default());
		assert_eq!(config.poll_timeout, PollTimeout::Limit(Duration::ZERO));
	}

	#[test]
	fn parses_each_timeout_form() {
		let cases = [
			("poll_timeout = \"indefinite\"", PollTimeout::Indefinite),
			("poll_timeout = \"immediate\"", PollTimeout::Limit(Duration::ZERO)),
			("poll_timeout = 30", PollTimeout::Limit(Duration::from_secs(30))),
		];
		for (source, expected) in cases {
			let config = DrainConfig::from_toml_str(source).unwrap();
			assert_eq!(config.poll_timeout, expected, "{source}");
		}
	}

	#[test]
	fn rejects_unknown_keyword() {
		let err = DrainConfig::from_toml_str("poll_timeout = \"forever\"").unwrap_err();
		assert!(err.to_string().contains("forever"), "got: {err}");
	}

	#[test]
	fn rejects_unknown_fields() {
		assert!(DrainConfig::from_toml_str("poll_timeout = 1\nworkers = 4").is_err());
	}

	#[test]
	fn load_reports_missing_file_path() {
		let err = DrainConfig::load("/nonexistent/sluice/drain.toml").unwrap_err();
		assert!(matches!(err, ConfigError::Io { ref path, .. } if path.ends_with("drain.toml")));
	}
}
