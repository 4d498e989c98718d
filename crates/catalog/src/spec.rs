//! Module specifications and their resolution rules.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encode;

/// How a parameter value is embedded into a provider URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamTemplate {
	/// Literal `name=value` query parameter.
	#[serde(rename = "string")]
	Query(String),
	/// Replacement text where `$1` receives the raw value.
	#[serde(rename = "regex")]
	Rewrite(String),
}

impl ParamTemplate {
	/// Renders `value` through this template, without the leading `&`.
	pub fn render(&self, value: &str) -> String {
		match self {
			Self::Query(name) => format!("{}={}", encode::component(name), encode::component(value)),
			Self::Rewrite(replacement) => replacement.replace("$1", value),
		}
	}
}

/// One resolution rule for a provider-hosted module.
#[derive(Debug, Clone)]
pub struct ProviderRule {
	/// Plain-transport endpoint.
	pub uri: String,
	/// Secure-transport endpoint, when the provider offers one.
	pub ssl: Option<String>,
	/// Template carrying the API key.
	pub key: Option<ParamTemplate>,
	/// Template carrying the requested version.
	pub version: Option<ParamTemplate>,
	/// Whether completion is reported asynchronously through a callback.
	pub deferred: bool,
	/// Caller options recognised by this provider.
	pub params: IndexMap<String, ParamTemplate>,
	/// Version guard for override rules. `None` on the base rule.
	pub pattern: Option<Regex>,
}

impl ProviderRule {
	/// Returns the endpoint for the requested transport.
	pub fn endpoint(&self, secure: bool) -> &str {
		match (&self.ssl, secure) {
			(Some(ssl), true) => ssl,
			_ => &self.uri,
		}
	}

	/// Returns true when this override's guard accepts `version`.
	pub fn matches(&self, version: &str) -> bool {
		self.pattern.as_ref().is_some_and(|pattern| pattern.is_match(version))
	}
}

/// Base rule plus version-guarded overrides.
#[derive(Debug, Clone)]
pub struct ProviderRules {
	/// Rule applied when no override matches.
	pub base: ProviderRule,
	/// Overrides tried in declaration order.
	pub overrides: Vec<ProviderRule>,
}

impl ProviderRules {
	/// Picks the first override whose pattern matches, else the base rule.
	pub fn select(&self, version: &str) -> &ProviderRule {
		self.overrides.iter().find(|rule| rule.matches(version)).unwrap_or(&self.base)
	}
}

/// Compressed and uncompressed files for one hosted library version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryFiles {
	/// Minified asset path.
	pub compressed: String,
	/// Development asset path.
	pub uncompressed: String,
}

/// Version and alias tables for a hosted library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionTable {
	/// Canonical version to files.
	pub versions: IndexMap<String, LibraryFiles>,
	/// Short version token to canonical version.
	pub aliases: IndexMap<String, String>,
}

impl VersionTable {
	/// Resolves a requested token through the alias table, then the version table.
	pub fn resolve(&self, version: &str) -> Option<(&str, &LibraryFiles)> {
		let canonical = self.aliases.get(version).map(String::as_str).unwrap_or(version);
		self.versions.get_key_value(canonical).map(|(key, files)| (key.as_str(), files))
	}
}

/// Pre-baked asset layout for a simple module served from the module service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FastPathEntry {
	/// Versions this layout satisfies.
	#[serde(default)]
	pub versions: IndexMap<String, String>,
	/// Directory under the service base, with leading and trailing slash.
	pub path: String,
	/// Script file inside [`Self::path`].
	pub js: String,
	/// Optional stylesheet file inside [`Self::path`].
	#[serde(default)]
	pub css: Option<String>,
	/// Properties copied onto the module namespace when this layout is used.
	#[serde(default)]
	pub properties: IndexMap<String, Value>,
}

impl FastPathEntry {
	/// Returns true when this layout serves `version`.
	pub fn serves(&self, version: &str) -> bool {
		self.versions.contains_key(version)
	}
}

/// Discriminates how a module name turns into assets.
#[derive(Debug, Clone)]
pub enum ResolutionKind {
	/// Served by the module service; asset path follows from the name.
	Simple,
	/// Hosted library selected from a version table.
	Versioned(VersionTable),
	/// Third-party provider with pattern-restricted overrides.
	Restricted(ProviderRules),
}

/// Immutable specification of one loadable module.
#[derive(Debug, Clone)]
pub struct ModuleSpec {
	/// Module name as requested by callers.
	pub name: String,
	/// Resolution rule.
	pub kind: ResolutionKind,
}

impl ModuleSpec {
	/// Creates a simple module spec.
	pub fn simple(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind: ResolutionKind::Simple,
		}
	}

	/// Returns whether a load of `version` can complete after page parsing.
	///
	/// Hosted libraries are written into the document and must finish before
	/// the page is ready. Providers follow their selected rule.
	pub fn deferrable(&self, version: &str) -> bool {
		match &self.kind {
			ResolutionKind::Simple => true,
			ResolutionKind::Versioned(_) => false,
			ResolutionKind::Restricted(rules) => rules.select(version).deferred,
		}
	}

	/// Short label for the resolution kind.
	pub fn kind_label(&self) -> &'static str {
		match self.kind {
			ResolutionKind::Simple => "simple",
			ResolutionKind::Versioned(_) => "versioned",
			ResolutionKind::Restricted(_) => "provider",
		}
	}
}
