use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::callbacks::CallbackHandle;
use crate::host::Scheduler;

struct BarrierState {
	callback: Option<CallbackHandle>,
	outstanding: HashSet<String>,
}

/// Fires one callback once every tracked sub-package has completed.
///
/// Clones share state, so the same barrier can wait on several packages.
/// A barrier that never tracks anything never fires.
#[derive(Clone)]
pub struct Barrier {
	inner: Rc<RefCell<BarrierState>>,
}

impl Barrier {
	pub fn new(callback: CallbackHandle) -> Self {
		Self {
			inner: Rc::new(RefCell::new(BarrierState {
				callback: Some(callback),
				outstanding: HashSet::new(),
			})),
		}
	}

	/// Adds `package` to the countdown. Tracking the same package twice counts once.
	pub fn track(&self, package: &str) {
		self.inner.borrow_mut().outstanding.insert(package.to_string());
	}

	/// Marks `package` complete.
	///
	/// When the countdown reaches zero the callback is scheduled for the next
	/// turn and true is returned. Untracked packages are ignored.
	pub fn release(&self, package: &str, scheduler: &dyn Scheduler) -> bool {
		let callback = {
			let mut state = self.inner.borrow_mut();
			if !state.outstanding.remove(package) || !state.outstanding.is_empty() {
				return false;
			}
			state.callback.take()
		};
		match callback {
			Some(callback) => {
				scheduler.schedule(Duration::ZERO, Box::new(move || callback()));
				true
			}
			None => false,
		}
	}

	/// Outstanding package count.
	pub fn remaining(&self) -> usize {
		self.inner.borrow().outstanding.len()
	}

	/// Returns true once the callback has been scheduled.
	pub fn is_fired(&self) -> bool {
		self.inner.borrow().callback.is_none()
	}
}

impl fmt::Debug for Barrier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Barrier")
			.field("remaining", &self.remaining())
			.field("fired", &self.is_fired())
			.finish()
	}
}
