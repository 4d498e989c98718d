//! Wire shapes of the catalog configuration payloads.
//!
//! Object keys may carry a leading `:`, a convention of the payload
//! generator that kept keys clear of object prototype names. The prefix is
//! stripped when payloads are folded into a [`Catalog`](crate::Catalog).

use indexmap::IndexMap;
use serde::Deserialize;

use crate::spec::{FastPathEntry, LibraryFiles, ParamTemplate};

/// Payload listing module specifications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecsPayload {
	/// Entries in declaration order.
	#[serde(default)]
	pub specs: Vec<SpecEntry>,
}

/// One entry of [`SpecsPayload::specs`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SpecEntry {
	/// Bare name of a simple module.
	Name(String),
	/// Provider module with explicit rules.
	Provider(ProviderPayload),
}

/// Provider module record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPayload {
	/// Module name.
	pub name: String,
	/// Rule used when no override matches.
	pub base_spec: RulePayload,
	/// Version-guarded overrides.
	#[serde(default)]
	pub custom_specs: Vec<RulePayload>,
}

/// Provider rule as written in the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RulePayload {
	pub uri: String,
	#[serde(default)]
	pub ssl: Option<String>,
	#[serde(default)]
	pub key: Option<ParamTemplate>,
	#[serde(default)]
	pub version: Option<ParamTemplate>,
	#[serde(default)]
	pub deferred: bool,
	#[serde(default)]
	pub params: IndexMap<String, ParamTemplate>,
	/// Regular expression guarding an override rule.
	#[serde(default)]
	pub pattern: Option<String>,
}

/// Hosted library record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryPayload {
	#[serde(default)]
	pub versions: IndexMap<String, LibraryFiles>,
	#[serde(default)]
	pub aliases: IndexMap<String, String>,
}

/// All three payloads in one document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPayload {
	#[serde(default)]
	pub specs: Vec<SpecEntry>,
	/// Fast-path layouts keyed by module.
	#[serde(default)]
	pub fast_path: IndexMap<String, FastPathEntry>,
	/// Hosted libraries keyed by module.
	#[serde(default)]
	pub libraries: IndexMap<String, LibraryPayload>,
}

/// Strips the legacy `:` key prefix.
pub(crate) fn strip_key(key: &str) -> &str {
	key.strip_prefix(':').unwrap_or(key)
}

/// Rebuilds a map with stripped keys, keeping the first of any collision.
pub(crate) fn strip_keys<T>(map: IndexMap<String, T>) -> IndexMap<String, T> {
	let mut out = IndexMap::with_capacity(map.len());
	for (key, value) in map {
		out.entry(strip_key(&key).to_string()).or_insert(value);
	}
	out
}
