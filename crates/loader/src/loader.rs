//! The loader facade.
//!
//! Every entry point follows the same shape: decide under a short borrow of
//! the shared state, release it, then perform side effects. Assets may
//! report readiness synchronously while being injected, so no borrow may be
//! held across [`Injector::inject`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use ferry_catalog::{Catalog, LoadHistory, ModuleSpec, UrlResolver};
use indexmap::IndexMap;
use serde_json::Value;

use crate::barrier::Barrier;
use crate::callbacks::{Callback, CallbackHandle, CallbackRegistry, CallbackToken};
use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};
use crate::host::{AssetKind, Host, ReadyState, Task};
use crate::injector::Injector;
use crate::module::{Completion, ModuleSnapshot, ModuleState, PackageState, ProviderState};
use crate::ready::{ReadyQueue, Registration};
use crate::request::{normalize_components, normalize_packages, AssetReport, LoadOptions, ModuleRequest};
use crate::stats::StatsReporter;


/// Load-event task shared between the event listener and the poll fallback.
type LoadSlot = Rc<Cell<Option<Task>>>;

/// Namespace property holding the hash a module exports after loading.
const SIGNATURE_PROPERTY: &str = "JSHash";

/// Exported surface of a module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
	/// Properties copied from the fast-path table.
	pub properties: IndexMap<String, Value>,
	/// Packages reported loaded, in report order.
	pub packages: Vec<String>,
}

#[derive(Default)]
struct LoaderState {
	modules: HashMap<String, ModuleState>,
	namespaces: HashMap<String, Namespace>,
	callbacks: CallbackRegistry,
	ready: ReadyQueue,
}

/// Side effect decided while the state was borrowed.
enum Action {
	Inject { kind: AssetKind, url: String, deferred: bool },
	Record { category: &'static str, label: String },
	Notify(CallbackHandle),
}

struct LoaderInner {
	config: LoaderConfig,
	catalog: Catalog,
	host: Host,
	injector: Injector,
	stats: StatsReporter,
	state: RefCell<LoaderState>,
}

/// Resolves module requests, injects assets and sequences completion callbacks.
///
/// Cheap to clone; clones share state. All methods must be called from the
/// host event loop thread.
#[derive(Clone)]
pub struct Loader {
	inner: Rc<LoaderInner>,
}

enum Reported {
	Packages(Completion),
	Provider(Vec<CallbackHandle>),
	Ignored,
}

/// One load request after option normalisation.
struct Plan<'a> {
	spec: &'a ModuleSpec,
	version: &'a str,
	options: &'a LoadOptions,
	callback: Option<CallbackHandle>,
	/// No option was supplied.
	plain: bool,
}

impl Loader {
	pub fn new(config: LoaderConfig, catalog: Catalog, host: Host) -> Self {
		let injector = Injector::new(host.document.clone());
		let stats = StatsReporter::new(&config, &host);
		Self {
			inner: Rc::new(LoaderInner {
				config,
				catalog,
				host,
				injector,
				stats,
				state: RefCell::new(LoaderState::default()),
			}),
		}
	}

	pub fn config(&self) -> &LoaderConfig {
		&self.inner.config
	}

	pub fn catalog(&self) -> &Catalog {
		&self.inner.catalog
	}

	/// Requests `request` at `version`.
	///
	/// Errors are raised before any state changes or injections. The
	/// callback in `options`, if any, runs on a later turn once every
	/// requested package is loaded.
	pub fn load(&self, request: impl Into<ModuleRequest>, version: &str, options: LoadOptions) -> Result<()> {
		let target = request.into().target()?;
		let mut options = options;
		options.packages.extend(target.packages);
		options.normalize();
		let plain = options.is_empty();

		let spec = self
			.inner
			.catalog
			.resolve(&target.module)
			.ok_or_else(|| LoadError::ModuleNotFound(target.module.clone()))?;
		let callback = options.callback.take().map(|callback| self.callback_handle(callback)).transpose()?;

		tracing::debug!(module = %spec.name, version, kind = spec.kind_label(), "load");
		let plan = Plan {
			spec,
			version,
			options: &options,
			callback,
			plain,
		};
		let actions = self.plan(plan)?;
		self.act(actions);
		Ok(())
	}

	fn callback_handle(&self, callback: Callback) -> Result<CallbackHandle> {
		match callback {
			Callback::Handle(handle) => Ok(handle),
			Callback::Token(token) => self
				.inner
				.state
				.borrow()
				.callbacks
				.get(token)
				.ok_or(LoadError::UnknownCallback(token)),
		}
	}

	fn page_finished(&self, state: &LoaderState) -> bool {
		state.ready.is_fired() || self.inner.host.document.ready_state() == ReadyState::Complete
	}

	fn plan(&self, mut plan: Plan<'_>) -> Result<Vec<Action>> {
		let mut guard = self.inner.state.borrow_mut();
		let page_finished = self.page_finished(&guard);
		let state = &mut *guard;
		let spec = plan.spec;
		let name = spec.name.as_str();
		let module = state
			.modules
			.entry(name.to_string())
			.or_insert_with(|| ModuleState::for_spec(spec));
		let namespace = state.namespaces.entry(name.to_string()).or_default();

		// A non-deferrable module loads synchronously; its callback runs on
		// the turn after the write.
		let deferrable = spec.deferrable(plan.version);
		let after_write = if deferrable { None } else { plan.callback.take() };

		let packages = normalize_packages(&plan.options.packages);
		let satisfied = match &*module {
			ModuleState::Simple(packages_state) => packages_state.unloaded(&packages).is_empty(),
			ModuleState::Provider(provider) => provider.is_satisfied(plan.callback.is_some()),
			ModuleState::Library(library) => library.requested,
		};
		if !deferrable && !satisfied && page_finished {
			return Err(LoadError::MustLoadBeforePageReady(name.to_string()));
		}
		if satisfied {
			tracing::trace!(module = %name, "load.satisfied");
			return Ok(plan.callback.or(after_write).map(Action::Notify).into_iter().collect());
		}

		let mut actions = match module {
			ModuleState::Simple(packages_state) => self.plan_simple(packages_state, namespace, &plan, &packages),
			ModuleState::Provider(provider) => self.plan_provider(provider, namespace, plan)?,
			ModuleState::Library(library) => {
				let params = plan.options.url_params(None, Vec::new());
				let url = self.resolver().build_url(spec, plan.version, &params, None)?;
				library.requested = true;
				let mut actions = vec![Action::Record {
					category: "el",
					label: name.to_string(),
				}];
				if !plan.options.autoloaded {
					actions.push(Action::Inject {
						kind: AssetKind::Script,
						url,
						deferred: false,
					});
				}
				actions
			}
		};
		actions.extend(after_write.map(Action::Notify));
		Ok(actions)
	}

	fn plan_simple(&self, state: &mut PackageState, namespace: &mut Namespace, plan: &Plan<'_>, packages: &[String]) -> Vec<Action> {
		let name = plan.spec.name.as_str();
		let unloaded = state.unloaded(packages);
		let barrier = plan.callback.clone().map(Barrier::new);
		let admission = state.admit(&unloaded, barrier.as_ref());
		if admission.fresh.is_empty() {
			tracing::trace!(module = %name, "load.joined");
			return Vec::new();
		}

		let deferred = barrier.is_some();
		let endpoints = &self.inner.config.endpoints;
		let resolver = self.resolver();
		let fast_path = self
			.inner
			.catalog
			.fast_path(name)
			.filter(|entry| plan.plain && admission.first && endpoints.additional_params.is_empty() && entry.serves(plan.version));

		let mut actions = Vec::new();
		if let Some(entry) = fast_path {
			namespace
				.properties
				.extend(entry.properties.iter().map(|(key, value)| (key.clone(), value.clone())));
			let assets = resolver.fast_path_assets(entry);
			actions.push(Action::Inject {
				kind: AssetKind::Script,
				url: assets.script,
				deferred,
			});
			if let Some(stylesheet) = assets.stylesheet {
				actions.push(Action::Inject {
					kind: AssetKind::Stylesheet,
					url: stylesheet,
					deferred,
				});
			}
			return actions;
		}

		if plan.options.autoloaded {
			return actions;
		}
		let history = (!admission.first).then(|| LoadHistory {
			have: admission.have.clone(),
			signature: namespace
				.properties
				.get(SIGNATURE_PROPERTY)
				.and_then(Value::as_str)
				.map(str::to_string),
		});
		let marker = barrier.as_ref().map(|_| self.inner.config.callback_entry(name));
		// The implied default package is never spelled out in the URL.
		let fetch = if plan.options.packages.is_empty() { Vec::new() } else { admission.fresh.clone() };
		let params = plan.options.url_params(marker, fetch);
		actions.push(Action::Inject {
			kind: AssetKind::Script,
			url: resolver.simple_url(name, plan.version, &params, history.as_ref()),
			deferred,
		});

		if admission.first {
			let now = self.inner.host.scheduler.now_ms();
			if self.inner.config.stats.samples(now) {
				state.start_timing(now);
			}
		}
		actions
	}

	fn plan_provider(&self, state: &mut ProviderState, namespace: &mut Namespace, plan: Plan<'_>) -> Result<Vec<Action>> {
		let name = plan.spec.name.as_str();
		if let Some(callback) = &plan.callback
			&& state.is_in_flight()
		{
			tracing::trace!(module = %name, "load.queued");
			state.queue(callback.clone());
			return Ok(Vec::new());
		}

		let marker = plan.callback.as_ref().map(|_| self.inner.config.callback_entry(name));
		let params = plan.options.url_params(marker, plan.options.packages.clone());
		let url = self.resolver().build_url(plan.spec, plan.version, &params, None)?;

		let deferred = plan.callback.is_some();
		match plan.callback {
			Some(callback) => state.begin(callback),
			None => state.mark_plain(),
		}
		*namespace = Namespace::default();

		let mut actions = Vec::new();
		if !plan.options.autoloaded {
			actions.push(Action::Inject {
				kind: AssetKind::Script,
				url,
				deferred,
			});
		}
		actions.push(Action::Record {
			category: "el",
			label: name.to_string(),
		});
		Ok(actions)
	}

	fn resolver(&self) -> UrlResolver<'_> {
		UrlResolver::new(&self.inner.config.endpoints)
	}

	fn act(&self, actions: Vec<Action>) {
		for action in actions {
			match action {
				Action::Inject { kind, url, deferred } => {
					let mode = self.inner.injector.inject(kind, &url, deferred);
					tracing::debug!(%url, ?mode, "load.inject");
				}
				Action::Record { category, label } => self.inner.stats.record(category, &label),
				Action::Notify(callback) => self.schedule(Box::new(move || callback())),
			}
		}
	}

	fn schedule(&self, task: Task) {
		self.inner.host.scheduler.schedule(Duration::ZERO, task);
	}

	/// Self-report of a loaded asset.
	///
	/// Reports for modules absent from the catalog are ignored.
	pub fn loaded(&self, report: AssetReport) {
		let Some(spec) = self.inner.catalog.resolve(&report.module) else {
			tracing::warn!(module = %report.module, "loaded.unknown_module");
			return;
		};
		let name = spec.name.as_str();
		let components = normalize_components(&report.components);
		let reported = {
			let mut guard = self.inner.state.borrow_mut();
			let state = &mut *guard;
			let module = state
				.modules
				.entry(name.to_string())
				.or_insert_with(|| ModuleState::for_spec(spec));
			match module {
				ModuleState::Simple(packages) => {
					let completion = packages.complete(&components);
					state.namespaces.entry(name.to_string()).or_default().packages = completion.packages.clone();
					Reported::Packages(completion)
				}
				ModuleState::Provider(provider) => Reported::Provider(provider.complete()),
				ModuleState::Library(_) => Reported::Ignored,
			}
		};

		match reported {
			Reported::Packages(completion) => {
				let timing = completion.timing_started;
				let fired = completion.release(self.inner.host.scheduler.as_ref());
				tracing::debug!(module = %name, ?components, fired, "loaded");
				if let Some(started) = timing {
					let elapsed = self.inner.host.scheduler.now_ms().saturating_sub(started);
					self.inner.stats.timing(&format!("al_{name}"), &format!("jl.{elapsed}"));
				}
				self.inner.stats.record("hl", name);
			}
			Reported::Provider(callbacks) => self.notify_all(name, callbacks),
			Reported::Ignored => tracing::trace!(module = %name, "loaded.library"),
		}
	}

	/// Invocation of a provider callback entry such as `google.loader.callbacks.maps`.
	pub fn invoke_callback_entry(&self, entry: &str) -> Result<()> {
		let module = self
			.inner
			.config
			.module_for_entry(entry)
			.ok_or_else(|| LoadError::UnknownCallbackEntry(entry.to_string()))?;
		let callbacks = match self.inner.state.borrow_mut().modules.get_mut(module) {
			Some(ModuleState::Provider(provider)) => provider.complete(),
			_ => return Err(LoadError::UnknownCallbackEntry(entry.to_string())),
		};
		self.notify_all(module, callbacks);
		Ok(())
	}

	fn notify_all(&self, module: &str, callbacks: Vec<CallbackHandle>) {
		tracing::debug!(module = %module, callbacks = callbacks.len(), "provider.ready");
		for callback in callbacks {
			self.schedule(Box::new(move || callback()));
		}
	}

	/// Runs `f` once the page has finished loading.
	///
	/// After that point `f` runs on the next turn.
	pub fn on_ready(&self, f: impl FnOnce() + 'static) {
		let registration = {
			let mut state = self.inner.state.borrow_mut();
			let registration = state.ready.register(Box::new(f));
			tracing::trace!(queued = state.ready.pending(), "ready.register");
			registration
		};
		match registration {
			Registration::Immediate(task) => self.schedule(task),
			Registration::Queued { arm: true } => self.arm_ready_watch(),
			Registration::Queued { arm: false } => {}
		}
	}

	fn arm_ready_watch(&self) {
		let document = &self.inner.host.document;
		if document.ready_state() == ReadyState::Complete {
			let weak = Rc::downgrade(&self.inner);
			self.schedule(Box::new(move || notify(&weak)));
			return;
		}
		let weak = Rc::downgrade(&self.inner);
		if !document.on_load(Box::new(move || notify(&weak))) {
			tracing::debug!("ready.poll");
			self.poll_ready();
		}
	}

	fn poll_ready(&self) {
		let weak = Rc::downgrade(&self.inner);
		let interval = self.inner.config.ready_poll_interval();
		self.inner.host.scheduler.schedule(
			interval,
			Box::new(move || {
				let Some(inner) = weak.upgrade() else {
					return;
				};
				let loader = Loader { inner };
				if loader.inner.host.document.ready_state() == ReadyState::Complete {
					loader.notify_page_ready();
				} else if !loader.inner.state.borrow().ready.is_fired() {
					loader.poll_ready();
				}
			}),
		);
	}

	/// Runs `f` on a turn after the page load event.
	///
	/// Unlike [`Self::on_ready`], `f` bypasses the ready queue and does not
	/// run on [`Self::notify_page_ready`].
	pub fn on_load(&self, f: impl FnOnce() + 'static) {
		let document = &self.inner.host.document;
		if document.ready_state() == ReadyState::Complete {
			self.schedule(Box::new(f));
			return;
		}
		let task: Task = Box::new(f);
		let slot: LoadSlot = Rc::new(Cell::new(Some(task)));
		let listener = slot.clone();
		let weak = Rc::downgrade(&self.inner);
		let registered = document.on_load(Box::new(move || {
			if let (Some(inner), Some(task)) = (weak.upgrade(), listener.take()) {
				Loader { inner }.schedule(task);
			}
		}));
		if !registered {
			tracing::debug!("load.poll");
			self.poll_load(slot);
		}
	}

	fn poll_load(&self, slot: LoadSlot) {
		let weak = Rc::downgrade(&self.inner);
		let interval = self.inner.config.ready_poll_interval();
		self.inner.host.scheduler.schedule(
			interval,
			Box::new(move || {
				let Some(inner) = weak.upgrade() else {
					return;
				};
				let loader = Loader { inner };
				if loader.inner.host.document.ready_state() != ReadyState::Complete {
					loader.poll_load(slot);
				} else if let Some(task) = slot.take() {
					task();
				}
			}),
		);
	}

	/// Marks the page ready and runs queued [`Self::on_ready`] callbacks in order.
	///
	/// Only the first call has an effect.
	pub fn notify_page_ready(&self) {
		let tasks = self.inner.state.borrow_mut().ready.fire();
		tracing::debug!(queued = tasks.len(), "ready.fire");
		for task in tasks {
			self.schedule(task);
		}
	}

	pub fn is_page_ready(&self) -> bool {
		self.inner.state.borrow().ready.is_fired()
	}

	/// Registers a callback that requests can name by token.
	pub fn register_callback(&self, f: impl Fn() + 'static) -> CallbackToken {
		self.inner.state.borrow_mut().callbacks.register(Rc::new(f))
	}

	pub fn unregister_callback(&self, token: CallbackToken) -> bool {
		self.inner.state.borrow_mut().callbacks.unregister(token)
	}

	/// Snapshot of a module's namespace.
	pub fn namespace(&self, name: &str) -> Option<Namespace> {
		self.inner.state.borrow().namespaces.get(name).cloned()
	}

	/// Snapshot of a module's load state, if it was ever referenced.
	pub fn snapshot(&self, name: &str) -> Option<ModuleSnapshot> {
		self.inner.state.borrow().modules.get(name).map(ModuleState::snapshot)
	}

	/// Flushes buffered telemetry. Idempotent; the host calls it on teardown.
	pub fn shutdown(&self) {
		self.inner.stats.shutdown();
	}
}

fn notify(weak: &Weak<LoaderInner>) {
	if let Some(inner) = weak.upgrade() {
		Loader { inner }.notify_page_ready();
	}
}
