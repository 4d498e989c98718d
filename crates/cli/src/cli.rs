use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(about = "Inspect module catalogs and dry-run loads")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Catalog JSON to use instead of the built-in one
	#[arg(long, value_name = "FILE", global = true)]
	pub catalog: Option<PathBuf>,

	/// Loader configuration TOML
	#[arg(long, value_name = "FILE", global = true)]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// List catalog modules and their resolution kind
	Modules,
	/// List stock search result stylesheets
	Themes,
	/// Print the URLs a first load would fetch
	Resolve {
		/// Module identifier, optionally `module.package`
		module: String,

		/// Requested version
		#[arg(long, default_value = "1")]
		version: String,

		/// Use secure endpoints
		#[arg(long)]
		secure: bool,

		/// Interface language
		#[arg(long, short)]
		language: Option<String>,

		/// Request with a completion callback
		#[arg(long)]
		callback: bool,

		/// Provider parameter, repeatable
		#[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
		params: Vec<(String, String)>,
	},
	/// Run loads against a simulated page and print what happened
	Simulate {
		/// Module identifiers
		#[arg(required = true)]
		modules: Vec<String>,

		/// Requested version
		#[arg(long, default_value = "1")]
		version: String,

		/// Complete the page before loading
		#[arg(long)]
		after_ready: bool,
	},
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
	let (name, value) = raw
		.split_once('=')
		.ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
	if name.is_empty() {
		return Err(format!("empty parameter name in '{raw}'"));
	}
	Ok((name.to_string(), value.to_string()))
}
