use serde::{Deserialize, Serialize};

/// Service locations and credentials shared by every URL the loader builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
	/// Base of the module service hosting simple modules and the stats sink.
	pub service_base: String,
	/// Base of the hosted library mirror.
	pub apis_base: String,
	/// API key passed to providers declaring a key template.
	pub api_key: String,
	/// Prefer secure-transport endpoints where a rule defines one.
	pub secure: bool,
	/// Raw query fragment appended to every simple-module URL.
	///
	/// A non-empty value also disables the fast-path table.
	pub additional_params: String,
}

impl Default for Endpoints {
	fn default() -> Self {
		Self {
			service_base: "http://www.google.com/uds".to_string(),
			apis_base: "http://ajax.googleapis.com/ajax".to_string(),
			api_key: "notsupplied".to_string(),
			secure: false,
			additional_params: String::new(),
		}
	}
}
