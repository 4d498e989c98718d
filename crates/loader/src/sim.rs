//! Deterministic in-memory page.
//!
//! [`SimulatedPage`] implements every host seam on a virtual clock. Timers
//! run only when the owner drives them, in due order and then in
//! scheduling order. Writes, appended nodes and beacons are recorded.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::host::{BeaconSink, Document, ReadyState, ResourceNode, Scheduler, Task};

/// Virtual clock origin, in Unix milliseconds.
pub const DEFAULT_EPOCH_MS: u64 = 1_262_304_000_042;

/// Upper bound on tasks run by one drive call.
const MAX_STEPS: usize = 10_000;

static MARKUP_URL: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"(?:src|href)="([^"]*)""#).expect("static pattern"));

/// In-memory page with a virtual clock.
pub struct SimulatedPage {
	now_ms: Cell<u64>,
	seq: Cell<u64>,
	timers: RefCell<BTreeMap<(u64, u64), Task>>,
	ready_state: Cell<ReadyState>,
	head: RefCell<Option<Vec<ResourceNode>>>,
	written: RefCell<Vec<String>>,
	beacons: RefCell<Vec<String>>,
	load_event: bool,
	load_listeners: RefCell<Vec<Task>>,
}

impl Default for SimulatedPage {
	fn default() -> Self {
		Self::new()
	}
}

impl SimulatedPage {
	/// A page still parsing, with a head and a load event.
	pub fn new() -> Self {
		Self::at(DEFAULT_EPOCH_MS)
	}

	/// Same as [`Self::new`] with the clock starting at `epoch_ms`.
	pub fn at(epoch_ms: u64) -> Self {
		Self {
			now_ms: Cell::new(epoch_ms),
			seq: Cell::new(0),
			timers: RefCell::new(BTreeMap::new()),
			ready_state: Cell::new(ReadyState::Loading),
			head: RefCell::new(Some(Vec::new())),
			written: RefCell::new(Vec::new()),
			beacons: RefCell::new(Vec::new()),
			load_event: true,
			load_listeners: RefCell::new(Vec::new()),
		}
	}

	pub fn without_head(self) -> Self {
		self.head.replace(None);
		self
	}

	/// Whether [`Document::on_load`] is supported.
	pub fn with_load_event(mut self, supported: bool) -> Self {
		self.load_event = supported;
		self
	}

	pub fn set_ready_state(&self, state: ReadyState) {
		self.ready_state.set(state);
	}

	/// Completes the page and runs load listeners.
	pub fn fire_load(&self) {
		self.ready_state.set(ReadyState::Complete);
		let listeners = std::mem::take(&mut *self.load_listeners.borrow_mut());
		for listener in listeners {
			listener();
		}
	}

	/// Runs every task already due, including ones they schedule with no delay.
	pub fn run_pending(&self) -> usize {
		self.drive(self.now_ms.get())
	}

	/// Moves the clock forward by `by`, running timers as they come due.
	pub fn advance(&self, by: Duration) -> usize {
		let target = self.now_ms.get().saturating_add(millis(by));
		let ran = self.drive(target);
		self.now_ms.set(target);
		ran
	}

	/// Runs timers until none remain, moving the clock as needed.
	pub fn run_until_idle(&self) -> usize {
		self.drive(u64::MAX)
	}

	fn drive(&self, until_ms: u64) -> usize {
		let mut ran = 0;
		while ran < MAX_STEPS {
			let next = {
				let mut timers = self.timers.borrow_mut();
				let due = timers.first_key_value().map(|(&(due, _), _)| due);
				match due {
					Some(due) if due <= until_ms => timers.pop_first(),
					_ => None,
				}
			};
			let Some(((due, _), task)) = next else {
				return ran;
			};
			if due > self.now_ms.get() {
				self.now_ms.set(due);
			}
			task();
			ran += 1;
		}
		tracing::warn!(steps = ran, "sim.step_limit");
		ran
	}

	/// Timers not yet run.
	pub fn pending_timers(&self) -> usize {
		self.timers.borrow().len()
	}

	/// Markup written into the parse stream.
	pub fn written(&self) -> Vec<String> {
		self.written.borrow().clone()
	}

	/// Nodes appended to the head.
	pub fn head(&self) -> Vec<ResourceNode> {
		self.head.borrow().clone().unwrap_or_default()
	}

	/// Every asset URL requested so far: stream writes first, then head nodes.
	pub fn requested_urls(&self) -> Vec<String> {
		let written = self.written.borrow();
		let mut urls: Vec<String> = written
			.iter()
			.flat_map(|markup| MARKUP_URL.captures_iter(markup))
			.map(|captures| unescape(&captures[1]))
			.collect();
		urls.extend(self.head().into_iter().map(|node| node.url));
		urls
	}

	/// Beacons sent so far.
	pub fn beacons(&self) -> Vec<String> {
		self.beacons.borrow().clone()
	}
}

fn millis(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn unescape(value: &str) -> String {
	value.replace("&quot;", "\"").replace("&amp;", "&")
}

impl Scheduler for SimulatedPage {
	fn now_ms(&self) -> u64 {
		self.now_ms.get()
	}

	fn schedule(&self, delay: Duration, task: Task) {
		let due = self.now_ms.get().saturating_add(millis(delay));
		let seq = self.seq.get();
		self.seq.set(seq + 1);
		self.timers.borrow_mut().insert((due, seq), task);
	}
}

impl Document for SimulatedPage {
	fn ready_state(&self) -> ReadyState {
		self.ready_state.get()
	}

	fn write(&self, markup: &str) {
		self.written.borrow_mut().push(markup.to_string());
	}

	fn has_head(&self) -> bool {
		self.head.borrow().is_some()
	}

	fn create_head(&self) {
		self.head.borrow_mut().get_or_insert_with(Vec::new);
	}

	fn append_to_head(&self, node: ResourceNode) {
		self.head.borrow_mut().get_or_insert_with(Vec::new).push(node);
	}

	fn on_load(&self, task: Task) -> bool {
		if !self.load_event {
			return false;
		}
		self.load_listeners.borrow_mut().push(task);
		true
	}
}

impl BeaconSink for SimulatedPage {
	fn send(&self, url: &str) {
		self.beacons.borrow_mut().push(url.to_string());
	}
}
