//! Dynamic module loader.
//!
//! A [`Loader`] turns module requests into asset injections and calls each
//! requester back exactly once when what it asked for has loaded. Overlapping
//! requests share one fetch per sub-package; a callback spanning several
//! sub-packages fires after the last of them reports in.
//!
//! The loader is single-threaded and cooperative. It reaches the page only
//! through the [`host`] seams, and every callback runs on a later turn of
//! the host scheduler, never inside the call that released it.
//!
//! ```no_run
//! use std::rc::Rc;
//!
//! use ferry_catalog::Catalog;
//! use ferry_loader::{AssetReport, Host, LoadOptions, Loader, LoaderConfig, SimulatedPage};
//!
//! let page = Rc::new(SimulatedPage::new());
//! let loader = Loader::new(LoaderConfig::default(), Catalog::builtin()?, Host::from_page(page.clone()));
//! loader.load("visualization.piechart", "1", LoadOptions::new().callback(|| println!("ready")))?;
//! loader.loaded(AssetReport::new("visualization", ["piechart"]));
//! page.run_pending();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod barrier;
mod callbacks;
mod config;
mod error;
pub mod host;
mod injector;
mod loader;
mod module;
mod ready;
mod request;
pub mod sim;
mod stats;
mod tokio_host;

pub use barrier::Barrier;
pub use callbacks::{Callback, CallbackHandle, CallbackToken};
pub use config::{LoaderConfig, StatsConfig};
pub use error::{ConfigError, LoadError, Result};
pub use host::{AssetKind, BeaconSink, Document, Host, ReadyState, ResourceNode, Scheduler, Task};
pub use injector::{InjectMode, Injector};
pub use loader::{Loader, Namespace};
pub use module::ModuleSnapshot;
pub use request::{AssetReport, DEFAULT_PACKAGE, LoadOptions, ModuleRequest};
pub use sim::SimulatedPage;
pub use stats::{StatsBuffer, StatsReporter, sanitize, timing_url};
pub use tokio_host::TokioScheduler;
