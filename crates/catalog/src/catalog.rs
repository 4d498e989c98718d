//! Read-only module catalog.

use indexmap::IndexMap;
use indexmap::map::Entry;
use regex::Regex;

use crate::payload::{CatalogPayload, LibraryPayload, RulePayload, SpecEntry, SpecsPayload, strip_key, strip_keys};
use crate::spec::{FastPathEntry, ModuleSpec, ProviderRule, ProviderRules, ResolutionKind, VersionTable};
use crate::{CatalogError, Result};

#[cfg(test)]
mod tests;

/// Catalog bundled with the crate.
const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// Process-wide table of module specifications.
///
/// Built once from configuration payloads and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
	modules: IndexMap<String, ModuleSpec>,
	fast_path: IndexMap<String, FastPathEntry>,
}

impl Catalog {
	/// Starts an empty builder.
	pub fn builder() -> CatalogBuilder {
		CatalogBuilder::default()
	}

	/// Parses a combined [`CatalogPayload`] document.
	pub fn from_json(json: &str) -> Result<Self> {
		let payload: CatalogPayload = serde_json::from_str(json)?;
		Ok(Self::builder().payload(payload)?.build())
	}

	/// Returns the catalog shipped with this crate.
	pub fn builtin() -> Result<Self> {
		Self::from_json(BUILTIN_CATALOG)
	}

	/// Looks up a module by name.
	pub fn resolve(&self, name: &str) -> Option<&ModuleSpec> {
		self.modules.get(name)
	}

	/// Looks up the fast-path layout of a simple module.
	pub fn fast_path(&self, name: &str) -> Option<&FastPathEntry> {
		self.fast_path.get(name)
	}

	/// Iterates modules in registration order.
	pub fn modules(&self) -> impl Iterator<Item = &ModuleSpec> {
		self.modules.values()
	}

	/// Number of registered modules.
	pub fn len(&self) -> usize {
		self.modules.len()
	}

	/// Returns true when no module is registered.
	pub fn is_empty(&self) -> bool {
		self.modules.is_empty()
	}
}

/// Accumulates payloads into a [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
	modules: IndexMap<String, ModuleSpec>,
	fast_path: IndexMap<String, FastPathEntry>,
}

impl CatalogBuilder {
	/// Adds module specifications. A later entry replaces an earlier one of the same name.
	pub fn specs(mut self, payload: SpecsPayload) -> Result<Self> {
		for entry in payload.specs {
			let spec = match entry {
				SpecEntry::Name(name) => ModuleSpec::simple(name),
				SpecEntry::Provider(provider) => {
					let base = compile_rule(&provider.name, provider.base_spec)?;
					let overrides = provider
						.custom_specs
						.into_iter()
						.map(|rule| compile_rule(&provider.name, rule))
						.collect::<Result<Vec<_>>>()?;
					ModuleSpec {
						name: provider.name,
						kind: ResolutionKind::Restricted(ProviderRules { base, overrides }),
					}
				}
			};
			tracing::trace!(module = %spec.name, kind = spec.kind_label(), "catalog.spec");
			self.modules.insert(spec.name.clone(), spec);
		}
		Ok(self)
	}

	/// Parses and adds a [`SpecsPayload`] document.
	pub fn specs_json(self, json: &str) -> Result<Self> {
		let payload: SpecsPayload = serde_json::from_str(json)?;
		self.specs(payload)
	}

	/// Replaces the fast-path table.
	pub fn fast_path(mut self, table: IndexMap<String, FastPathEntry>) -> Self {
		self.fast_path = strip_keys(table)
			.into_iter()
			.map(|(name, mut entry)| {
				entry.versions = strip_keys(entry.versions);
				entry.properties = strip_keys(entry.properties);
				(name, entry)
			})
			.collect();
		self
	}

	/// Adds hosted libraries. Names already registered keep their definition.
	pub fn libraries(mut self, table: IndexMap<String, LibraryPayload>) -> Self {
		for (key, library) in table {
			let name = strip_key(&key);
			if name.is_empty() {
				continue;
			}
			if let Entry::Vacant(slot) = self.modules.entry(name.to_string()) {
				let table = VersionTable {
					versions: strip_keys(library.versions),
					aliases: strip_keys(library.aliases),
				};
				slot.insert(ModuleSpec {
					name: name.to_string(),
					kind: ResolutionKind::Versioned(table),
				});
			}
		}
		self
	}

	/// Folds a combined payload: specifications, then fast path, then libraries.
	pub fn payload(self, payload: CatalogPayload) -> Result<Self> {
		let builder = self.specs(SpecsPayload { specs: payload.specs })?;
		Ok(builder.fast_path(payload.fast_path).libraries(payload.libraries))
	}

	/// Freezes the catalog.
	pub fn build(self) -> Catalog {
		tracing::debug!(modules = self.modules.len(), fast_path = self.fast_path.len(), "catalog.build");
		Catalog {
			modules: self.modules,
			fast_path: self.fast_path,
		}
	}
}

fn compile_rule(module: &str, rule: RulePayload) -> Result<ProviderRule> {
	let pattern = match rule.pattern {
		Some(source) => Some(Regex::new(&source).map_err(|error| CatalogError::InvalidPattern {
			module: module.to_string(),
			pattern: source.clone(),
			error,
		})?),
		None => None,
	};
	Ok(ProviderRule {
		uri: rule.uri,
		ssl: rule.ssl,
		key: rule.key,
		version: rule.version,
		deferred: rule.deferred,
		params: rule.params,
		pattern,
	})
}
