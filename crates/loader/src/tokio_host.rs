//! [`Scheduler`] backed by a tokio [`LocalSet`](tokio::task::LocalSet).

use std::time::Duration;

use web_time::{SystemTime, UNIX_EPOCH};

use crate::host::{Scheduler, Task};

/// Runs loader tasks as local tokio tasks.
///
/// Must be used from within a `LocalSet`; tasks are not `Send`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
	pub fn new() -> Self {
		Self
	}
}

impl Scheduler for TokioScheduler {
	fn now_ms(&self) -> u64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
			.unwrap_or_default()
	}

	fn schedule(&self, delay: Duration, task: Task) {
		tokio::task::spawn_local(async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
			task();
		});
	}
}
