//! Request-side types: what to load and how.

use ferry_catalog::UrlParams;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::callbacks::{Callback, CallbackToken};
use crate::error::{LoadError, Result};

/// Package tracked when a request names none.
pub const DEFAULT_PACKAGE: &str = "default";

/// Module identifier(s) of a load request.
///
/// An identifier is `module` or `module.package`. A list may name several
/// packages of the same module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleRequest {
	Single(String),
	Many(Vec<String>),
}

impl From<&str> for ModuleRequest {
	fn from(name: &str) -> Self {
		Self::Single(name.to_string())
	}
}

impl From<String> for ModuleRequest {
	fn from(name: String) -> Self {
		Self::Single(name)
	}
}

impl From<Vec<String>> for ModuleRequest {
	fn from(names: Vec<String>) -> Self {
		Self::Many(names)
	}
}

impl From<&[&str]> for ModuleRequest {
	fn from(names: &[&str]) -> Self {
		Self::Many(names.iter().map(|name| name.to_string()).collect())
	}
}

/// Module name and sub-packages named by a [`ModuleRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
	pub module: String,
	pub packages: Vec<String>,
}

impl ModuleRequest {
	pub(crate) fn target(&self) -> Result<Target> {
		let ids: &[String] = match self {
			Self::Single(name) => std::slice::from_ref(name),
			Self::Many(names) => names,
		};
		let mut target: Option<Target> = None;
		for id in ids {
			let (module, package) = split_id(id)?;
			match &mut target {
				None => {
					target = Some(Target {
						module: module.to_string(),
						packages: package.into_iter().map(str::to_string).collect(),
					});
				}
				Some(existing) if existing.module == module => existing.packages.extend(package.map(str::to_string)),
				Some(existing) => {
					return Err(LoadError::MixedModules {
						first: existing.module.clone(),
						second: module.to_string(),
					});
				}
			}
		}
		target.ok_or(LoadError::EmptyRequest)
	}
}

fn split_id(id: &str) -> Result<(&str, Option<&str>)> {
	let mut parts = id.split('.');
	let module = parts.next().unwrap_or_default();
	let package = parts.next();
	if parts.next().is_some() {
		return Err(LoadError::ModuleNotFound(id.to_string()));
	}
	Ok((module, package))
}

/// Trims and lower-cases package names, falling back to [`DEFAULT_PACKAGE`].
pub(crate) fn normalize_packages(packages: &[String]) -> Vec<String> {
	let mut out = normalize_components(packages);
	if out.is_empty() {
		out.push(DEFAULT_PACKAGE.to_string());
	}
	out
}

/// Trimmed, lower-cased and de-duplicated names; blanks are dropped.
pub(crate) fn normalize_components(names: &[String]) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(names.len());
	for name in names {
		let name = name.trim().to_lowercase();
		if !name.is_empty() && !out.contains(&name) {
			out.push(name);
		}
	}
	out
}

/// Options accompanying a load request.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
	pub language: Option<String>,
	/// Used as [`Self::language`] when that is unset.
	pub locale: Option<String>,
	/// Fired once the request is satisfied.
	pub callback: Option<Callback>,
	pub packages: Vec<String>,
	pub style: Option<String>,
	/// Raw query fragment appended verbatim.
	pub other_params: Option<String>,
	pub nocss: Option<bool>,
	pub nooldnames: Option<bool>,
	/// Domain override for provider endpoints.
	pub base_domain: Option<String>,
	/// Prefer the uncompressed file of a hosted library.
	pub uncompressed: bool,
	/// The asset is already on the page; track state without injecting.
	pub autoloaded: bool,
	/// Provider-specific parameters.
	pub extra: IndexMap<String, String>,
}

impl LoadOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn callback(mut self, f: impl Fn() + 'static) -> Self {
		self.callback = Some(Callback::new(f));
		self
	}

	pub fn callback_token(mut self, token: CallbackToken) -> Self {
		self.callback = Some(Callback::Token(token));
		self
	}

	pub fn language(mut self, language: impl Into<String>) -> Self {
		self.language = Some(language.into());
		self
	}

	pub fn packages<I, S>(mut self, packages: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.packages.extend(packages.into_iter().map(Into::into));
		self
	}

	pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra.insert(name.into(), value.into());
		self
	}

	/// Returns true when no option is set. Only such requests may take the fast path.
	pub fn is_empty(&self) -> bool {
		self.language.is_none()
			&& self.locale.is_none()
			&& self.callback.is_none()
			&& self.packages.is_empty()
			&& self.style.is_none()
			&& self.other_params.is_none()
			&& self.nocss.is_none()
			&& self.nooldnames.is_none()
			&& self.base_domain.is_none()
			&& !self.uncompressed
			&& !self.autoloaded
			&& self.extra.is_empty()
	}

	/// Folds `locale` into `language`.
	pub(crate) fn normalize(&mut self) {
		if self.language.is_none() {
			self.language = self.locale.take();
		}
	}

	/// URL parameters for this request.
	///
	/// `callback` is the marker placed in the URL; `packages` the packages to fetch.
	pub(crate) fn url_params(&self, callback: Option<String>, packages: Vec<String>) -> UrlParams {
		UrlParams {
			language: self.language.clone(),
			callback,
			packages,
			style: self.style.clone(),
			nocss: self.nocss,
			nooldnames: self.nooldnames,
			other_params: self.other_params.clone(),
			base_domain: self.base_domain.clone(),
			uncompressed: self.uncompressed,
			extra: self.extra.clone(),
		}
	}
}

/// Self-report sent by a loaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetReport {
	pub module: String,
	#[serde(default)]
	pub components: Vec<String>,
}

impl AssetReport {
	pub fn new<I, S>(module: impl Into<String>, components: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			module: module.into(),
			components: components.into_iter().map(Into::into).collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case::bare(ModuleRequest::from("search"), "search", &[])]
	#[case::dotted(ModuleRequest::from("visualization.piechart"), "visualization", &["piechart"])]
	#[case::list(
		ModuleRequest::from(&["visualization.piechart", "visualization.table"][..]),
		"visualization",
		&["piechart", "table"]
	)]
	fn targets(#[case] request: ModuleRequest, #[case] module: &str, #[case] packages: &[&str]) {
		let target = request.target().unwrap();
		assert_eq!(target.module, module);
		assert_eq!(target.packages, packages.iter().map(|p| p.to_string()).collect::<Vec<_>>());
	}

	#[test]
	fn rejects_deep_and_mixed_ids() {
		assert_eq!(
			ModuleRequest::from("a.b.c").target(),
			Err(LoadError::ModuleNotFound("a.b.c".to_string()))
		);
		assert_eq!(
			ModuleRequest::from(&["maps.x", "search.y"][..]).target(),
			Err(LoadError::MixedModules {
				first: "maps".to_string(),
				second: "search".to_string()
			})
		);
		assert_eq!(ModuleRequest::Many(Vec::new()).target(), Err(LoadError::EmptyRequest));
	}

	#[test]
	fn packages_normalize() {
		let raw = vec![" PieChart ".to_string(), "piechart".to_string(), "table".to_string()];
		assert_eq!(normalize_packages(&raw), vec!["piechart", "table"]);
		assert_eq!(normalize_packages(&[]), vec![DEFAULT_PACKAGE]);
	}

	#[test]
	fn locale_backfills_language() {
		let mut options = LoadOptions {
			locale: Some("en_GB".to_string()),
			..LoadOptions::default()
		};
		options.normalize();
		assert_eq!(options.language.as_deref(), Some("en_GB"));
		assert!(!options.is_empty());
		assert!(LoadOptions::new().is_empty());
	}

	#[test]
	fn report_decodes_from_json() {
		let report: AssetReport = serde_json::from_str(r#"{"module":"search","components":["default"]}"#).unwrap();
		assert_eq!(report, AssetReport::new("search", ["default"]));
	}
}
