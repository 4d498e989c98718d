//! Seams between the loader and the page it runs in.
//!
//! The loader never touches a document, a timer or the network directly.
//! Hosts implement these traits; [`SimulatedPage`](crate::sim::SimulatedPage)
//! implements all three for tests and dry runs.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Unit of deferred work run on a later turn of the host event loop.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Timer and clock of the cooperative event loop.
pub trait Scheduler {
	/// Wall-clock milliseconds since the Unix epoch.
	fn now_ms(&self) -> u64;

	/// Queues `task` to run after `delay`.
	///
	/// Implementations must never run `task` inline: a zero delay still means
	/// "after the current call stack has unwound".
	fn schedule(&self, delay: Duration, task: Task);
}

/// Parse phase of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
	/// Initial synchronous parse; direct stream writes are legal.
	Loading,
	/// Parsing finished, subresources still loading.
	Interactive,
	/// The page load event has fired.
	Complete,
}

/// Kind of asset a module resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
	Script,
	Stylesheet,
}

/// Resource element handed to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
	pub kind: AssetKind,
	pub url: String,
}

impl ResourceNode {
	pub fn new(kind: AssetKind, url: impl Into<String>) -> Self {
		Self { kind, url: url.into() }
	}

	/// Markup equivalent of this node for direct stream writes.
	pub fn markup(&self) -> String {
		let url = escape_attribute(&self.url);
		match self.kind {
			AssetKind::Script => format!("<script src=\"{url}\" type=\"text/javascript\"></script>"),
			AssetKind::Stylesheet => format!("<link href=\"{url}\" type=\"text/css\" rel=\"stylesheet\"></link>"),
		}
	}
}

fn escape_attribute(value: &str) -> String {
	value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Document the loader injects assets into.
pub trait Document {
	/// Current parse phase.
	fn ready_state(&self) -> ReadyState;

	/// Writes markup at the current parse position.
	fn write(&self, markup: &str);

	/// Returns true when the document has a head container.
	fn has_head(&self) -> bool;

	/// Creates the head container.
	fn create_head(&self);

	/// Appends a resource node to the head, starting an asynchronous fetch.
	fn append_to_head(&self, node: ResourceNode);

	/// Registers `task` for the page load event.
	///
	/// Returns false when the platform offers no reliable load event; the
	/// loader then polls [`Self::ready_state`] instead.
	fn on_load(&self, task: Task) -> bool;
}

/// Fire-and-forget telemetry transport.
pub trait BeaconSink {
	/// Sends one beacon. Failures are not observable.
	fn send(&self, url: &str);
}

/// Bundle of host seams owned by a [`Loader`](crate::Loader).
#[derive(Clone)]
pub struct Host {
	pub scheduler: Rc<dyn Scheduler>,
	pub document: Rc<dyn Document>,
	pub beacons: Rc<dyn BeaconSink>,
}

impl Host {
	pub fn new(scheduler: Rc<dyn Scheduler>, document: Rc<dyn Document>, beacons: Rc<dyn BeaconSink>) -> Self {
		Self {
			scheduler,
			document,
			beacons,
		}
	}

	/// Uses one object for every seam.
	pub fn from_page<P>(page: Rc<P>) -> Self
	where
		P: Scheduler + Document + BeaconSink + 'static,
	{
		Self {
			scheduler: page.clone(),
			document: page.clone(),
			beacons: page,
		}
	}
}

impl fmt::Debug for Host {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Host").finish_non_exhaustive()
	}
}
