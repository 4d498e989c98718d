//! Loader configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! callback_namespace = "google.loader.callbacks"
//!
//! [endpoints]
//! service_base = "http://www.google.com/uds"
//! api_key = "notsupplied"
//! secure = false
//!
//! [stats]
//! batch_threshold = 5
//! timing_sample_percent = 1
//! ```

use std::path::Path;
use std::time::Duration;

use ferry_catalog::Endpoints;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Telemetry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
	/// Buffer and send usage events.
	pub enabled: bool,
	/// Buffer length above which a flush is scheduled immediately.
	pub batch_threshold: usize,
	/// Flush delay for smaller buffers.
	pub batch_delay_ms: u64,
	/// Send sampled load timings.
	pub timing_enabled: bool,
	/// Delay before a timing beacon is sent.
	pub timing_delay_ms: u64,
	/// Share of first loads that report timing, in percent.
	pub timing_sample_percent: u8,
	/// Collection endpoint for timing beacons.
	pub timing_base: String,
}

impl Default for StatsConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			batch_threshold: 5,
			batch_delay_ms: 15_000,
			timing_enabled: true,
			timing_delay_ms: 10_000,
			timing_sample_percent: 1,
			timing_base: "http://csi.gstatic.com/csi".to_string(),
		}
	}
}

impl StatsConfig {
	/// Sampling gate for a first load started at `started_ms`.
	pub fn samples(&self, started_ms: u64) -> bool {
		started_ms % 100 < u64::from(self.timing_sample_percent)
	}
}

/// Top-level loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
	pub endpoints: Endpoints,
	/// Prefix of the callback entry names embedded in provider URLs.
	pub callback_namespace: String,
	/// Poll interval when the host has no reliable load event.
	pub ready_poll_interval_ms: u64,
	pub stats: StatsConfig,
}

impl Default for LoaderConfig {
	fn default() -> Self {
		Self {
			endpoints: Endpoints::default(),
			callback_namespace: "google.loader.callbacks".to_string(),
			ready_poll_interval_ms: 10,
			stats: StatsConfig::default(),
		}
	}
}

impl LoaderConfig {
	/// Parses a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&source)
	}

	/// Entry name a provider script invokes when `module` is ready.
	pub fn callback_entry(&self, module: &str) -> String {
		format!("{}.{}", self.callback_namespace, module)
	}

	/// Recovers the module name from a callback entry name.
	pub fn module_for_entry<'a>(&self, entry: &'a str) -> Option<&'a str> {
		entry
			.strip_prefix(self.callback_namespace.as_str())
			.and_then(|rest| rest.strip_prefix('.'))
			.filter(|module| !module.is_empty())
	}

	pub fn ready_poll_interval(&self) -> Duration {
		Duration::from_millis(self.ready_poll_interval_ms.max(1))
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_document_is_default() {
		assert_eq!(LoaderConfig::from_toml_str("").unwrap(), LoaderConfig::default());
	}

	#[test]
	fn partial_sections_keep_defaults() {
		let config = LoaderConfig::from_toml_str(
			r#"
			callback_namespace = "app.cb"

			[endpoints]
			secure = true
			api_key = "abc"

			[stats]
			timing_sample_percent = 100
			"#,
		)
		.unwrap();
		assert!(config.endpoints.secure);
		assert_eq!(config.endpoints.api_key, "abc");
		assert_eq!(config.endpoints.service_base, "http://www.google.com/uds");
		assert_eq!(config.stats.batch_threshold, 5);
		assert!(config.stats.samples(1_234_567));
		assert_eq!(config.callback_entry("maps"), "app.cb.maps");
	}

	#[test]
	fn malformed_toml_is_an_error() {
		assert!(matches!(LoaderConfig::from_toml_str("stats = 3"), Err(ConfigError::Toml(_))));
	}

	#[test]
	fn entry_names_round_trip() {
		let config = LoaderConfig::default();
		assert_eq!(config.module_for_entry("google.loader.callbacks.maps"), Some("maps"));
		assert_eq!(config.module_for_entry("google.loader.callbacks."), None);
		assert_eq!(config.module_for_entry("other.maps"), None);
	}

	#[test]
	fn default_sampling_is_one_percent() {
		let stats = StatsConfig::default();
		let sampled = (0..10_000u64).filter(|t| stats.samples(*t)).count();
		assert_eq!(sampled, 100);
	}
}
