//! Batched usage telemetry.
//!
//! Events are buffered and sent as a single beacon once the buffer grows
//! past a threshold, after a delay otherwise, and on shutdown. Beacons are
//! fire-and-forget.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::LazyLock;
use std::time::Duration;

use ferry_catalog::encode;
use regex::Regex;

use crate::config::{LoaderConfig, StatsConfig};
use crate::host::{BeaconSink, Host, Scheduler};

static UNSAFE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_.]+").expect("static pattern"));

/// Lower-cases `value` and collapses runs of characters outside `[a-z0-9_.]` to `_`.
pub fn sanitize(value: &str) -> String {
	UNSAFE_RUN.replace_all(&value.to_lowercase(), "_").into_owned()
}

/// Builds the standalone timing beacon URL.
pub fn timing_url(base: &str, action: &str, label: &str) -> String {
	format!(
		"{base}?s=uds&v=2&action={}&it={}",
		encode::component(&sanitize(action)),
		encode::component(&sanitize(label))
	)
}

/// Encoded event records awaiting a flush, with the deadline of the armed flush.
#[derive(Debug, Clone)]
pub struct StatsBuffer {
	records: Vec<String>,
	started_ms: u64,
	deadline_ms: Option<u64>,
}

impl StatsBuffer {
	/// Creates an empty buffer; `started_ms` anchors the uptime reported on flush.
	pub fn new(started_ms: u64) -> Self {
		Self {
			records: Vec::new(),
			started_ms,
			deadline_ms: None,
		}
	}

	/// Appends one event and returns the new buffer length.
	pub fn push(&mut self, category: &str, label: &str) -> usize {
		let entry = if label.is_empty() {
			category.to_string()
		} else {
			format!("{category}|{label}")
		};
		let index = self.records.len();
		self.records.push(format!("r{index}={}", encode::component(&entry)));
		self.records.len()
	}

	/// Arms a flush at `due_ms` unless one is already due no later.
	///
	/// Returns true when the caller must schedule the flush.
	pub fn arm(&mut self, due_ms: u64) -> bool {
		if self.deadline_ms.is_some_and(|deadline| deadline <= due_ms) {
			return false;
		}
		self.deadline_ms = Some(due_ms);
		true
	}

	pub fn deadline(&self) -> Option<u64> {
		self.deadline_ms
	}

	/// Drains the buffer into one beacon URL, or `None` when empty.
	///
	/// Disarms any pending deadline.
	pub fn take_batch(&mut self, service_base: &str, now_ms: u64) -> Option<String> {
		self.deadline_ms = None;
		if self.records.is_empty() {
			return None;
		}
		let uptime = now_ms.saturating_sub(self.started_ms);
		let url = format!("{service_base}/stats?{}&nc={now_ms}_{uptime}", self.records.join("&"));
		self.records.clear();
		Some(url)
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

struct ReporterInner {
	config: StatsConfig,
	service_base: String,
	secure: bool,
	scheduler: Rc<dyn Scheduler>,
	beacons: Rc<dyn BeaconSink>,
	buffer: RefCell<StatsBuffer>,
	shut_down: Cell<bool>,
}

/// Schedules flushes of a [`StatsBuffer`] on the host event loop.
#[derive(Clone)]
pub struct StatsReporter {
	inner: Rc<ReporterInner>,
}

impl StatsReporter {
	pub fn new(config: &LoaderConfig, host: &Host) -> Self {
		Self {
			inner: Rc::new(ReporterInner {
				config: config.stats.clone(),
				service_base: config.endpoints.service_base.clone(),
				secure: config.endpoints.secure,
				scheduler: host.scheduler.clone(),
				beacons: host.beacons.clone(),
				buffer: RefCell::new(StatsBuffer::new(host.scheduler.now_ms())),
				shut_down: Cell::new(false),
			}),
		}
	}

	/// Buffers one event and arms a flush.
	pub fn record(&self, category: &str, label: &str) {
		let inner = &self.inner;
		if !inner.config.enabled || inner.shut_down.get() {
			return;
		}
		let mut buffer = inner.buffer.borrow_mut();
		let len = buffer.push(category, label);
		let delay_ms = if len > inner.config.batch_threshold { 0 } else { inner.config.batch_delay_ms };
		let due = inner.scheduler.now_ms().saturating_add(delay_ms);
		let armed = buffer.arm(due);
		drop(buffer);
		tracing::trace!(category, label, len, armed, "stats.record");
		if armed {
			let reporter = self.clone();
			inner
				.scheduler
				.schedule(Duration::from_millis(delay_ms), Box::new(move || reporter.flush_due(due)));
		}
	}

	/// Flushes if the flush armed for `due` is still the current one.
	fn flush_due(&self, due: u64) {
		if self.inner.buffer.borrow().deadline() == Some(due) {
			self.flush();
		}
	}

	/// Sends a load-timing sample as its own beacon after the configured delay.
	pub fn timing(&self, action: &str, label: &str) {
		let inner = &self.inner;
		if !inner.config.timing_enabled || inner.secure || inner.shut_down.get() {
			return;
		}
		let url = timing_url(&inner.config.timing_base, action, label);
		tracing::debug!(%url, "stats.timing");
		let beacons = inner.beacons.clone();
		inner
			.scheduler
			.schedule(Duration::from_millis(inner.config.timing_delay_ms), Box::new(move || beacons.send(&url)));
	}

	/// Sends every buffered event now.
	pub fn flush(&self) {
		let now = self.inner.scheduler.now_ms();
		let batch = self.inner.buffer.borrow_mut().take_batch(&self.inner.service_base, now);
		if let Some(url) = batch {
			tracing::debug!(%url, "stats.flush");
			self.inner.beacons.send(&url);
		}
	}

	/// Flushes once and stops accepting events. Later calls do nothing.
	pub fn shutdown(&self) {
		if self.inner.shut_down.replace(true) {
			return;
		}
		self.flush();
	}

	/// Buffered event count.
	pub fn pending(&self) -> usize {
		self.inner.buffer.borrow().len()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::sim::SimulatedPage;

	fn reporter(page: &Rc<SimulatedPage>, config: LoaderConfig) -> StatsReporter {
		StatsReporter::new(&config, &Host::from_page(page.clone()))
	}

	#[test]
	fn sanitize_collapses_runs() {
		assert_eq!(sanitize("AL_Maps"), "al_maps");
		assert_eq!(sanitize("jl. 12 ms//x"), "jl._12_ms_x");
	}

	#[test]
	fn buffer_encodes_and_clears() {
		let mut buffer = StatsBuffer::new(1_000);
		assert_eq!(buffer.push("el", "maps"), 1);
		assert_eq!(buffer.push("hl", ""), 2);
		assert_eq!(
			buffer.take_batch("http://svc", 1_500).as_deref(),
			Some("http://svc/stats?r0=el%7Cmaps&r1=hl&nc=1500_500")
		);
		assert!(buffer.is_empty());
		assert!(buffer.take_batch("http://svc", 1_600).is_none());
	}

	#[test]
	fn burst_coalesces_into_one_delayed_beacon() {
		let page = Rc::new(SimulatedPage::new());
		let stats = reporter(&page, LoaderConfig::default());
		stats.record("el", "a");
		stats.record("el", "b");
		page.advance(Duration::from_millis(14_999));
		assert!(page.beacons().is_empty());
		page.advance(Duration::from_millis(1));
		let beacons = page.beacons();
		assert_eq!(beacons.len(), 1);
		assert!(beacons[0].contains("r0=el%7Ca&r1=el%7Cb"), "{}", beacons[0]);
		page.run_until_idle();
		assert_eq!(page.beacons().len(), 1);
	}

	#[test]
	fn burst_arms_a_single_flush() {
		let page = Rc::new(SimulatedPage::new());
		let stats = reporter(&page, LoaderConfig::default());
		for i in 0..5 {
			stats.record("el", &format!("m{i}"));
		}
		assert_eq!(page.pending_timers(), 1);

		stats.record("el", "m5");
		assert_eq!(page.pending_timers(), 2, "threshold arms an earlier flush");
		page.run_pending();
		assert_eq!(page.beacons().len(), 1);

		page.advance(Duration::from_millis(15_000));
		assert_eq!(page.beacons().len(), 1, "superseded flush sends nothing");
		assert_eq!(page.pending_timers(), 0);
	}

	#[test]
	fn buffer_keeps_the_earliest_deadline() {
		let mut buffer = StatsBuffer::new(0);
		assert!(buffer.arm(500));
		assert!(!buffer.arm(900));
		assert!(buffer.arm(100));
		assert_eq!(buffer.deadline(), Some(100));
		buffer.take_batch("http://svc", 100);
		assert_eq!(buffer.deadline(), None);
	}

	#[test]
	fn large_buffer_flushes_on_next_turn() {
		let page = Rc::new(SimulatedPage::new());
		let stats = reporter(&page, LoaderConfig::default());
		for i in 0..6 {
			stats.record("el", &format!("m{i}"));
		}
		page.run_pending();
		assert_eq!(page.beacons().len(), 1);
		assert_eq!(stats.pending(), 0);
	}

	#[test]
	fn shutdown_flushes_once_and_is_idempotent() {
		let page = Rc::new(SimulatedPage::new());
		let stats = reporter(&page, LoaderConfig::default());
		stats.record("hl", "search");
		stats.shutdown();
		stats.shutdown();
		stats.record("hl", "late");
		page.run_until_idle();
		assert_eq!(page.beacons().len(), 1);
	}

	#[test]
	fn timing_is_suppressed_when_secure() {
		let page = Rc::new(SimulatedPage::new());
		let mut config = LoaderConfig::default();
		config.endpoints.secure = true;
		let stats = reporter(&page, config);
		stats.timing("al_search", "jl.42");
		page.run_until_idle();
		assert!(page.beacons().is_empty());
	}

	#[test]
	fn timing_beacon_after_delay() {
		let page = Rc::new(SimulatedPage::new());
		let stats = reporter(&page, LoaderConfig::default());
		stats.timing("al_search", "jl.42");
		page.advance(Duration::from_millis(10_000));
		assert_eq!(
			page.beacons(),
			vec!["http://csi.gstatic.com/csi?s=uds&v=2&action=al_search&it=jl.42".to_string()]
		);
	}
}
