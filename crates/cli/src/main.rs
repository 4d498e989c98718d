//! `ferry` command line tool.
//!
//! Every command runs against the built-in catalog unless `--catalog` names
//! another one. Loads are dry runs on a [`SimulatedPage`]; nothing is fetched.

mod cli;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use ferry_catalog::{Catalog, ResolutionKind, Theme};
use ferry_loader::{
	AssetReport, Host, LoadOptions, Loader, LoaderConfig, ModuleRequest, ModuleSnapshot, SimulatedPage,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let default_level = if cli.verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();

	let catalog = match &cli.catalog {
		Some(path) => {
			let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
			Catalog::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
		}
		None => Catalog::builtin().context("built-in catalog")?,
	};
	let config = match &cli.config {
		Some(path) => LoaderConfig::load(path)?,
		None => LoaderConfig::default(),
	};
	tracing::debug!(modules = catalog.len(), "catalog ready");

	let lines = match cli.command {
		Command::Modules => list_modules(&catalog),
		Command::Themes => list_themes(),
		Command::Resolve {
			module,
			version,
			secure,
			language,
			callback,
			params,
		} => {
			let mut config = config;
			config.endpoints.secure |= secure;
			let mut options = LoadOptions::new();
			options.language = language;
			if callback {
				options = options.callback(|| {});
			}
			for (name, value) in params {
				options = options.param(name, value);
			}
			resolve(config, catalog, &module, &version, options)?
		}
		Command::Simulate {
			modules,
			version,
			after_ready,
		} => simulate(config, catalog, &modules, &version, after_ready)?,
	};
	for line in lines {
		println!("{line}");
	}
	Ok(())
}

fn list_modules(catalog: &Catalog) -> Vec<String> {
	let mut modules: Vec<_> = catalog.modules().collect();
	modules.sort_by(|a, b| a.name.cmp(&b.name));
	modules
		.into_iter()
		.map(|spec| {
			let detail = match &spec.kind {
				ResolutionKind::Simple if catalog.fast_path(&spec.name).is_some() => "fast path".to_string(),
				ResolutionKind::Simple => String::new(),
				ResolutionKind::Versioned(table) => format!("{} versions", table.versions.len()),
				ResolutionKind::Restricted(rules) => format!("{} overrides", rules.overrides.len()),
			};
			format!("{:<16} {:<10} {detail}", spec.name, spec.kind_label())
				.trim_end()
				.to_string()
		})
		.collect()
}

fn list_themes() -> Vec<String> {
	Theme::ALL
		.into_iter()
		.map(|theme| format!("{:<12} {}", theme.as_str(), theme.stylesheet_url()))
		.collect()
}

/// URLs a first load of `module` would fetch.
fn resolve(
	config: LoaderConfig,
	catalog: Catalog,
	module: &str,
	version: &str,
	options: LoadOptions,
) -> anyhow::Result<Vec<String>> {
	let page = Rc::new(SimulatedPage::new());
	let loader = Loader::new(config, catalog, Host::from_page(page.clone()));
	loader.load(module, version, options)?;
	Ok(page.requested_urls())
}

/// Loads every module with a callback and reports each one loaded.
///
/// Returns one line per observed page event.
fn simulate(
	config: LoaderConfig,
	catalog: Catalog,
	modules: &[String],
	version: &str,
	after_ready: bool,
) -> anyhow::Result<Vec<String>> {
	let page = Rc::new(SimulatedPage::new());
	let loader = Loader::new(config, catalog, Host::from_page(page.clone()));
	if after_ready {
		page.fire_load();
		loader.notify_page_ready();
	}

	let lines = Rc::new(RefCell::new(Vec::new()));
	for id in modules {
		let label = id.clone();
		let log = lines.clone();
		let options = LoadOptions::new().callback(move || log.borrow_mut().push(format!("callback  {label}")));
		if let Err(error) = loader.load(ModuleRequest::from(id.as_str()), version, options) {
			lines.borrow_mut().push(format!("error     {error}"));
		}
	}
	{
		let mut lines = lines.borrow_mut();
		lines.extend(page.written().into_iter().map(|markup| format!("write     {markup}")));
		lines.extend(page.head().into_iter().map(|node| format!("append    {:?} {}", node.kind, node.url)));
	}

	for id in modules {
		let (module, package) = id.split_once('.').unwrap_or((id.as_str(), ferry_loader::DEFAULT_PACKAGE));
		match loader.snapshot(module) {
			Some(ModuleSnapshot::Packages { .. }) => loader.loaded(AssetReport::new(module, [package])),
			Some(ModuleSnapshot::Provider { in_flight: true, .. }) => {
				let entry = loader.config().callback_entry(module);
				loader.invoke_callback_entry(&entry)?;
			}
			_ => {}
		}
	}
	page.run_pending();
	loader.shutdown();
	page.run_until_idle();
	let mut lines = lines.take();
	lines.extend(page.beacons().into_iter().map(|beacon| format!("beacon    {beacon}")));
	Ok(lines)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn builtin() -> Catalog {
		Catalog::builtin().unwrap()
	}

	#[test]
	fn modules_are_listed_by_name() {
		let lines = list_modules(&builtin());
		assert!(lines.iter().any(|line| line.starts_with("jquery") && line.contains("versioned")));
		assert!(lines.iter().any(|line| line.starts_with("search") && line.ends_with("fast path")));
		let mut sorted = lines.clone();
		sorted.sort();
		assert_eq!(lines, sorted);
	}

	#[test]
	fn themes_list_stylesheets() {
		let lines = list_themes();
		assert_eq!(lines.len(), Theme::ALL.len());
		assert_eq!(lines[0], "bubblegum    http://www.google.com/cse/style/look/bubblegum.css");
	}

	#[test]
	fn resolve_prints_first_load_urls() {
		let urls = resolve(LoaderConfig::default(), builtin(), "jquery", "1", LoadOptions::new()).unwrap();
		assert_eq!(urls, vec!["http://ajax.googleapis.com/ajax/libs/jquery/1.4.2/jquery.min.js".to_string()]);

		let urls = resolve(LoaderConfig::default(), builtin(), "search", "1", LoadOptions::new()).unwrap();
		assert_eq!(urls.len(), 2, "fast path fetches script and stylesheet");
	}

	#[test]
	fn resolve_surfaces_load_errors() {
		let error = resolve(LoaderConfig::default(), builtin(), "doesnotexist", "1", LoadOptions::new()).unwrap_err();
		assert_eq!(error.to_string(), "Module: 'doesnotexist' not found!");
	}

	#[test]
	fn simulate_reports_each_step() {
		let lines = simulate(LoaderConfig::default(), builtin(), &["feeds".to_string()], "1", false).unwrap();
		assert_eq!(lines.len(), 3, "{lines:?}");
		assert_eq!(lines[0], "append    Script http://www.google.com/uds/?file=feeds&v=1&async=2");
		assert_eq!(lines[1], "callback  feeds");
		assert!(lines[2].starts_with("beacon    http://www.google.com/uds/stats?r0=hl%7Cfeeds&nc="), "{}", lines[2]);
	}

	#[test]
	fn simulate_after_ready_rejects_synchronous_modules() {
		let lines = simulate(LoaderConfig::default(), builtin(), &["jquery".to_string()], "1", true).unwrap();
		assert_eq!(lines, vec!["error     Module: 'jquery' must be loaded before DOM onLoad!".to_string()]);
	}
}
