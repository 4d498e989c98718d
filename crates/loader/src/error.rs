//! Loader error types.

use std::path::PathBuf;

use ferry_catalog::ResolveError;
use thiserror::Error;

use crate::callbacks::CallbackToken;

/// Errors raised synchronously to the caller of a load request.
///
/// Asset fetch failures are not among them: a module whose asset never
/// reports readiness simply stays pending.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
	/// The module name is absent from the catalog.
	#[error("Module: '{0}' not found!")]
	ModuleNotFound(String),

	/// The version is absent from a hosted library's tables.
	#[error("Module: '{module}' with version '{version}' not found!")]
	VersionNotFound {
		/// Library name.
		module: String,
		/// Requested version token.
		version: String,
	},

	/// A module that must be written into the parse stream was first
	/// requested after the page finished loading.
	#[error("Module: '{0}' must be loaded before DOM onLoad!")]
	MustLoadBeforePageReady(String),

	/// A list request named sub-packages of different modules.
	#[error("request mixes modules '{first}' and '{second}'")]
	MixedModules {
		/// Module named first.
		first: String,
		/// Conflicting module.
		second: String,
	},

	/// A list request had no entries.
	#[error("empty module request")]
	EmptyRequest,

	/// A callback token was never registered or was unregistered.
	#[error("unknown callback token: {0:?}")]
	UnknownCallback(CallbackToken),

	/// A callback entry name does not belong to a provider module.
	#[error("unknown callback entry: {0}")]
	UnknownCallbackEntry(String),

	/// URL construction failed for another reason.
	#[error(transparent)]
	Resolve(ResolveError),
}

impl From<ResolveError> for LoadError {
	fn from(error: ResolveError) -> Self {
		match error {
			ResolveError::VersionNotFound { module, version } => Self::VersionNotFound { module, version },
			other => Self::Resolve(other),
		}
	}
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors reading a [`LoaderConfig`](crate::LoaderConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The document is not valid configuration TOML.
	#[error("invalid config: {0}")]
	Toml(#[from] toml::de::Error),
}
