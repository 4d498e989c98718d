//! Error types for catalog ingestion and URL resolution.

use thiserror::Error;

/// Errors raised while building a [`Catalog`](crate::Catalog).
#[derive(Debug, Error)]
pub enum CatalogError {
	/// A payload was not valid catalog JSON.
	#[error("invalid catalog payload: {0}")]
	Json(#[from] serde_json::Error),

	/// An override rule carried a pattern that does not compile.
	#[error("module '{module}': invalid version pattern '{pattern}': {error}")]
	InvalidPattern {
		/// Module owning the override.
		module: String,
		/// Pattern source as written in the payload.
		pattern: String,
		/// Compiler diagnostic.
		error: regex::Error,
	},
}

/// Errors raised while turning a module request into an asset URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
	/// The version (or alias) is absent from a hosted library's table.
	#[error("Module: '{module}' with version '{version}' not found!")]
	VersionNotFound {
		/// Library name.
		module: String,
		/// Requested version token.
		version: String,
	},

	/// A provider endpoint could not be parsed for a domain override.
	#[error("invalid endpoint uri: {uri}")]
	InvalidEndpoint {
		/// Endpoint as configured.
		uri: String,
	},

	/// A `base_domain` override was not a valid host.
	#[error("invalid base domain: {domain}")]
	InvalidBaseDomain {
		/// Domain supplied by the caller.
		domain: String,
	},
}

/// Result type for catalog construction.
pub type Result<T> = std::result::Result<T, CatalogError>;
