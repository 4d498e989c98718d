//! Asset URL construction.
//!
//! [`UrlResolver`] is pure: the same spec, version and parameters always
//! produce the same URL. State the loader tracks between loads (packages
//! already fetched, the hash exported by a previous load) is passed in
//! through [`LoadHistory`].

use indexmap::IndexMap;
use url::Url;

use crate::encode;
use crate::error::ResolveError;
use crate::spec::{FastPathEntry, ModuleSpec, ProviderRule, ResolutionKind, VersionTable};
use crate::Endpoints;

#[cfg(test)]
mod tests;

/// Caller-supplied values that may appear in an asset URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
	/// Interface language (`hl`).
	pub language: Option<String>,
	/// Callback marker. Simple modules only test presence; providers embed the value.
	pub callback: Option<String>,
	/// Sub-packages to fetch, emitted sorted.
	pub packages: Vec<String>,
	/// Presentation style.
	pub style: Option<String>,
	pub nocss: Option<bool>,
	pub nooldnames: Option<bool>,
	/// Raw query fragment appended verbatim.
	pub other_params: Option<String>,
	/// Replaces the domain of a provider endpoint.
	pub base_domain: Option<String>,
	/// Select the uncompressed file of a hosted library.
	pub uncompressed: bool,
	/// Additional provider parameters in insertion order.
	pub extra: IndexMap<String, String>,
}

impl UrlParams {
	/// Flattens the parameters into the order providers see them.
	fn provider_entries(&self) -> Vec<(&str, String)> {
		let mut entries = Vec::new();
		if let Some(language) = &self.language {
			entries.push(("language", language.clone()));
		}
		if let Some(callback) = &self.callback {
			entries.push(("callback", callback.clone()));
		}
		if !self.packages.is_empty() {
			entries.push(("packages", sorted_packages(&self.packages)));
		}
		if let Some(style) = &self.style {
			entries.push(("style", style.clone()));
		}
		if let Some(nocss) = self.nocss {
			entries.push(("nocss", nocss.to_string()));
		}
		if let Some(nooldnames) = self.nooldnames {
			entries.push(("nooldnames", nooldnames.to_string()));
		}
		if self.uncompressed {
			entries.push(("uncompressed", "true".to_string()));
		}
		for (name, value) in &self.extra {
			entries.push((name.as_str(), value.clone()));
		}
		if let Some(other) = &self.other_params {
			entries.push(("other_params", other.clone()));
		}
		if let Some(domain) = &self.base_domain {
			entries.push(("base_domain", domain.clone()));
		}
		entries
	}
}

/// What a simple module has already fetched, for URLs after its first load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadHistory {
	/// Packages loaded or in flight.
	pub have: Vec<String>,
	/// Hash exported by the module namespace, if any.
	pub signature: Option<String>,
}

/// Script and stylesheet served from a fast-path layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastPathAssets {
	pub script: String,
	pub stylesheet: Option<String>,
}

/// Builds asset URLs against one set of [`Endpoints`].
#[derive(Debug, Clone, Copy)]
pub struct UrlResolver<'a> {
	endpoints: &'a Endpoints,
}

impl<'a> UrlResolver<'a> {
	pub fn new(endpoints: &'a Endpoints) -> Self {
		Self { endpoints }
	}

	/// Builds the URL for a load of `spec` at `version`.
	///
	/// `history` is only consulted for simple modules.
	pub fn build_url(
		&self,
		spec: &ModuleSpec,
		version: &str,
		params: &UrlParams,
		history: Option<&LoadHistory>,
	) -> Result<String, ResolveError> {
		match &spec.kind {
			ResolutionKind::Simple => Ok(self.simple_url(&spec.name, version, params, history)),
			ResolutionKind::Versioned(table) => self.library_url(&spec.name, table, version, params),
			ResolutionKind::Restricted(rules) => self.provider_url(rules.select(version), version, params),
		}
	}

	/// URL of a simple module on the module service.
	pub fn simple_url(&self, name: &str, version: &str, params: &UrlParams, history: Option<&LoadHistory>) -> String {
		let mut url = format!(
			"{}/?file={}&v={}{}",
			self.endpoints.service_base, name, version, self.endpoints.additional_params
		);
		if let Some(language) = &params.language {
			push_query(&mut url, "hl", language);
		}
		if let Some(nocss) = params.nocss {
			push_query(&mut url, "output", &format!("nocss={nocss}"));
		}
		if let Some(nooldnames) = params.nooldnames {
			push_query(&mut url, "nooldnames", &nooldnames.to_string());
		}
		if !params.packages.is_empty() {
			push_query(&mut url, "packages", &sorted_packages(&params.packages));
		}
		if params.callback.is_some() {
			url.push_str("&async=2");
		}
		if let Some(style) = &params.style {
			push_query(&mut url, "style", style);
		}
		if let Some(other) = &params.other_params {
			url.push('&');
			url.push_str(other);
		}
		if let Some(history) = history {
			if let Some(signature) = &history.signature {
				push_query(&mut url, "sig", signature);
			}
			push_query(&mut url, "have", &history.have.join(","));
		}
		url
	}

	/// URL of a hosted library file.
	pub fn library_url(
		&self,
		name: &str,
		table: &VersionTable,
		version: &str,
		params: &UrlParams,
	) -> Result<String, ResolveError> {
		let (canonical, files) = table.resolve(version).ok_or_else(|| ResolveError::VersionNotFound {
			module: name.to_string(),
			version: version.to_string(),
		})?;
		let file = if params.uncompressed { &files.uncompressed } else { &files.compressed };
		Ok(format!("{}/libs/{}/{}/{}", self.endpoints.apis_base, name, canonical, file))
	}

	/// URL of a provider script for the selected rule.
	pub fn provider_url(&self, rule: &ProviderRule, version: &str, params: &UrlParams) -> Result<String, ResolveError> {
		let mut query = String::new();
		if let Some(key) = &rule.key {
			query.push('&');
			query.push_str(&key.render(&self.endpoints.api_key));
		}
		if let Some(template) = &rule.version {
			query.push('&');
			query.push_str(&template.render(version));
		}

		let mut endpoint = rule.endpoint(self.endpoints.secure).to_string();
		for (name, value) in params.provider_entries() {
			if let Some(template) = rule.params.get(name) {
				query.push('&');
				query.push_str(&template.render(&value));
			} else if name == "other_params" {
				query.push('&');
				query.push_str(&value);
			} else if name == "base_domain" {
				endpoint = replace_domain(&endpoint, &value)?;
			}
		}

		if !endpoint.contains('?') && !query.is_empty() {
			query.replace_range(..1, "?");
		}
		endpoint.push_str(&query);
		Ok(endpoint)
	}

	/// Assets of a fast-path layout.
	pub fn fast_path_assets(&self, entry: &FastPathEntry) -> FastPathAssets {
		let base = format!("{}{}", self.endpoints.service_base, entry.path);
		FastPathAssets {
			script: format!("{base}{}", entry.js),
			stylesheet: entry.css.as_ref().map(|css| format!("{base}{css}")),
		}
	}
}

fn push_query(url: &mut String, name: &str, value: &str) {
	url.push('&');
	url.push_str(name);
	url.push('=');
	url.push_str(&encode::component(value));
}

fn sorted_packages(packages: &[String]) -> String {
	let mut sorted = packages.to_vec();
	sorted.sort();
	sorted.join(",")
}

/// Swaps the host and port of `endpoint` for `domain`, keeping scheme, path
/// and query. `domain` may carry a `:port` suffix.
fn replace_domain(endpoint: &str, domain: &str) -> Result<String, ResolveError> {
	let invalid = || ResolveError::InvalidBaseDomain {
		domain: domain.to_string(),
	};
	let mut url = Url::parse(endpoint).map_err(|_| ResolveError::InvalidEndpoint {
		uri: endpoint.to_string(),
	})?;
	let (host, port) = match domain.rsplit_once(':') {
		Some((host, port)) => (host, Some(port.parse::<u16>().map_err(|_| invalid())?)),
		None => (domain, None),
	};
	url.set_host(Some(host)).map_err(|_| invalid())?;
	url.set_port(port).map_err(|_| invalid())?;
	Ok(url.to_string())
}
