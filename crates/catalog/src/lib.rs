//! Module catalog and asset URL resolution for the ferry loader.
//!
//! The catalog is inert configuration: a table from module name to the rule
//! that turns a requested version into assets. Three resolution kinds exist:
//!
//! * **Simple** modules live on the module service. A fast-path table may
//!   map a version straight to a pre-built script and stylesheet.
//! * **Versioned** modules are hosted libraries picked from a version table,
//!   with short aliases such as `1` mapping to `1.4.2`.
//! * **Restricted** modules belong to third-party providers. A base rule may
//!   be shadowed by overrides guarded by a version pattern.
//!
//! Nothing here performs I/O. [`UrlResolver`] is a pure function of its
//! inputs and is shared by the loader and the command line tools.

mod catalog;
pub mod encode;
mod endpoints;
mod error;
pub mod payload;
mod resolve;
pub mod spec;
mod themes;

pub use catalog::{Catalog, CatalogBuilder};
pub use endpoints::Endpoints;
pub use error::{CatalogError, ResolveError, Result};
pub use resolve::{FastPathAssets, LoadHistory, UrlParams, UrlResolver};
pub use spec::{FastPathEntry, LibraryFiles, ModuleSpec, ParamTemplate, ProviderRule, ProviderRules, ResolutionKind, VersionTable};
pub use themes::{THEME_BASE, Theme};
