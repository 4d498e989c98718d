//! Per-module load state.
//!
//! Each package moves `unrequested -> pending -> loaded` and never back. A
//! package is never both pending and loaded.

use std::collections::HashMap;

use ferry_catalog::{ModuleSpec, ResolutionKind};
use indexmap::IndexSet;

use crate::barrier::Barrier;
use crate::callbacks::CallbackHandle;
use crate::host::Scheduler;


/// State of one module, shaped by its resolution kind.
pub(crate) enum ModuleState {
	Simple(PackageState),
	Provider(ProviderState),
	Library(LibraryState),
}

impl ModuleState {
	pub fn for_spec(spec: &ModuleSpec) -> Self {
		match spec.kind {
			ResolutionKind::Simple => Self::Simple(PackageState::default()),
			ResolutionKind::Restricted(_) => Self::Provider(ProviderState::default()),
			ResolutionKind::Versioned(_) => Self::Library(LibraryState::default()),
		}
	}

	pub fn snapshot(&self) -> ModuleSnapshot {
		match self {
			Self::Simple(state) => ModuleSnapshot::Packages {
				loaded: state.loaded.iter().cloned().collect(),
				pending: state.pending.iter().cloned().collect(),
				waiters: state.waiters.values().map(Vec::len).sum(),
			},
			Self::Provider(state) => ModuleSnapshot::Provider {
				loaded_plain: state.loaded_plain,
				loaded_async: state.loaded_async,
				in_flight: state.in_flight,
				queued: state.callbacks.len(),
			},
			Self::Library(state) => ModuleSnapshot::Library {
				requested: state.requested,
			},
		}
	}
}

/// Read-only view of a module's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSnapshot {
	/// Package-tracked module on the module service.
	Packages {
		loaded: Vec<String>,
		pending: Vec<String>,
		/// Barrier registrations still waiting.
		waiters: usize,
	},
	/// Third-party provider.
	Provider {
		loaded_plain: bool,
		loaded_async: bool,
		in_flight: bool,
		queued: usize,
	},
	/// Hosted library.
	Library { requested: bool },
}

/// Package bookkeeping of a simple module.
#[derive(Default)]
pub(crate) struct PackageState {
	loaded: IndexSet<String>,
	pending: IndexSet<String>,
	waiters: HashMap<String, Vec<Barrier>>,
	/// Components in report order, exported on the namespace.
	reported: Vec<String>,
	requested: bool,
	timing_started: Option<u64>,
}

/// Result of [`PackageState::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Admission {
	/// Packages that must be fetched now.
	pub fresh: Vec<String>,
	/// Packages loaded or in flight before this request.
	pub have: Vec<String>,
	/// True when this is the module's first fetch.
	pub first: bool,
}

/// Result of [`PackageState::complete`].
pub(crate) struct Completion {
	released: Vec<(String, Vec<Barrier>)>,
	/// Start of a sampled first load, if one was pending.
	pub timing_started: Option<u64>,
	/// Every component reported so far.
	pub packages: Vec<String>,
}

impl Completion {
	/// Releases waiting barriers. Returns how many fired.
	pub fn release(self, scheduler: &dyn Scheduler) -> usize {
		let mut fired = 0;
		for (package, barriers) in self.released {
			for barrier in barriers {
				if barrier.release(&package, scheduler) {
					fired += 1;
				}
			}
		}
		fired
	}
}

impl PackageState {
	/// Requested packages not yet loaded, in request order.
	pub fn unloaded(&self, requested: &[String]) -> Vec<String> {
		requested
			.iter()
			.filter(|package| !self.loaded.contains(package.as_str()))
			.cloned()
			.collect()
	}

	/// Registers a request for `requested`, which must all be unloaded.
	///
	/// `barrier` tracks every requested package and waits on each. Packages
	/// already in flight are not fetched again; the rest become pending.
	pub fn admit(&mut self, requested: &[String], barrier: Option<&Barrier>) -> Admission {
		let mut fresh = Vec::new();
		for package in requested {
			if let Some(barrier) = barrier {
				barrier.track(package);
			}
			if self.pending.contains(package) {
				if let Some(barrier) = barrier {
					self.waiters.entry(package.clone()).or_default().push(barrier.clone());
				}
			} else if !fresh.contains(package) {
				fresh.push(package.clone());
			}
		}

		let have = self.loaded.iter().chain(self.pending.iter()).cloned().collect();
		let first = !self.requested;
		for package in &fresh {
			let waiters = self.waiters.entry(package.clone()).or_default();
			if let Some(barrier) = barrier {
				waiters.push(barrier.clone());
			}
			self.pending.insert(package.clone());
		}
		if !fresh.is_empty() {
			self.requested = true;
		}
		Admission { fresh, have, first }
	}

	/// Arms load timing for the first fetch.
	pub fn start_timing(&mut self, now_ms: u64) {
		self.timing_started = Some(now_ms);
	}

	/// Marks `components` loaded and hands back the barriers waiting on them.
	///
	/// Components that were never requested are marked loaded as well.
	pub fn complete(&mut self, components: &[String]) -> Completion {
		let mut released = Vec::new();
		for component in components {
			self.pending.shift_remove(component);
			self.loaded.insert(component.clone());
			self.reported.push(component.clone());
			if let Some(barriers) = self.waiters.remove(component) {
				released.push((component.clone(), barriers));
			}
		}
		Completion {
			released,
			timing_started: self.timing_started.take(),
			packages: self.reported.clone(),
		}
	}
}

/// State of a provider module.
///
/// A plain load counts as done once injected. A load with a callback is
/// done when the provider invokes its callback entry.
#[derive(Default)]
pub(crate) struct ProviderState {
	loaded_plain: bool,
	loaded_async: bool,
	in_flight: bool,
	callbacks: Vec<CallbackHandle>,
}

impl ProviderState {
	pub fn is_satisfied(&self, with_callback: bool) -> bool {
		if with_callback { self.loaded_async } else { self.loaded_plain }
	}

	pub fn is_in_flight(&self) -> bool {
		self.in_flight
	}

	/// Queues a callback for the next callback entry invocation.
	pub fn queue(&mut self, callback: CallbackHandle) {
		self.callbacks.push(callback);
	}

	/// Queues `callback` and marks a callback load in flight.
	pub fn begin(&mut self, callback: CallbackHandle) {
		self.queue(callback);
		self.in_flight = true;
	}

	pub fn mark_plain(&mut self) {
		self.loaded_plain = true;
	}

	/// Marks the provider loaded and drains queued callbacks.
	pub fn complete(&mut self) -> Vec<CallbackHandle> {
		self.loaded_async = true;
		self.in_flight = false;
		std::mem::take(&mut self.callbacks)
	}
}

/// State of a hosted library: fetched at most once.
#[derive(Default)]
pub(crate) struct LibraryState {
	pub requested: bool,
}
