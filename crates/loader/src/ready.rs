//! Page-ready callback queue.

use crate::host::Task;

/// Outcome of [`ReadyQueue::register`].
pub enum Registration {
	/// The page is already ready; run the task on the next turn.
	Immediate(Task),
	/// The task was queued. `arm` is true for the first queued task, which
	/// must start watching for the load event.
	Queued { arm: bool },
}

/// Callbacks waiting for the page load event.
///
/// `fired` flips to true exactly once. Tasks queued before that run in
/// registration order when it flips; later tasks bypass the queue.
#[derive(Default)]
pub struct ReadyQueue {
	fired: bool,
	armed: bool,
	queue: Vec<Task>,
}

impl ReadyQueue {
	pub fn register(&mut self, task: Task) -> Registration {
		if self.fired {
			return Registration::Immediate(task);
		}
		self.queue.push(task);
		let arm = !self.armed;
		self.armed = true;
		Registration::Queued { arm }
	}

	/// Marks the page ready and hands back queued tasks in order.
	///
	/// Returns nothing after the first call.
	pub fn fire(&mut self) -> Vec<Task> {
		if self.fired {
			return Vec::new();
		}
		self.fired = true;
		std::mem::take(&mut self.queue)
	}

	pub fn is_fired(&self) -> bool {
		self.fired
	}

	/// Number of queued tasks.
	pub fn pending(&self) -> usize {
		self.queue.len()
	}
}
