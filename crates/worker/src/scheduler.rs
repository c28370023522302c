use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::idle::IdleProbe;

/// Default interval at which the scheduler re-checks the probe while
/// waiting for the host to become idle.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs deferred work after a delay, optionally gated on host idleness.
///
/// Work is keyed. Scheduling a key that is already pending supersedes the
/// earlier request, so a burst of identical triggers collapses into a
/// single run after the last trigger's delay.
#[derive(Clone)]
pub struct IdleScheduler {
	inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
	probe: Arc<dyn IdleProbe>,
	poll_interval: Duration,
	pending: Mutex<HashMap<String, u64>>,
	generation: AtomicU64,
}

impl IdleScheduler {
	pub fn new(probe: Arc<dyn IdleProbe>) -> Self {
		Self::with_poll_interval(probe, IDLE_POLL_INTERVAL)
	}

	/// Scheduler with a custom idle re-check interval.
	pub fn with_poll_interval(probe: Arc<dyn IdleProbe>, poll_interval: Duration) -> Self {
		Self {
			inner: Arc::new(SchedulerInner {
				probe,
				poll_interval,
				pending: Mutex::new(HashMap::new()),
				generation: AtomicU64::new(0),
			}),
		}
	}

	/// Schedules `work` to run once after `delay`.
	///
	/// With `idle_only` set, the run additionally waits until the probe
	/// reports idle, re-checking at the poll interval. Scheduling a key
	/// that is already pending replaces the pending run.
	pub fn schedule(
		&self,
		key: impl Into<String>,
		delay: Duration,
		idle_only: bool,
		work: impl FnOnce() + Send + 'static,
	) {
		let key = key.into();
		let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
		if self.inner.pending.lock().insert(key.clone(), generation).is_some() {
			trace!(key = %key, "worker.delayed.replaced");
		}
		trace!(key = %key, delay_ms = delay.as_millis() as u64, idle_only, "worker.delayed.scheduled");

		let inner = Arc::clone(&self.inner);
		crate::spawn(async move {
			tokio::time::sleep(delay).await;
			if idle_only {
				while !inner.probe.is_idle() {
					if !inner.is_current(&key, generation) {
						trace!(key = %key, "worker.delayed.superseded");
						return;
					}
					tokio::time::sleep(inner.poll_interval).await;
				}
			}
			if !inner.take_current(&key, generation) {
				trace!(key = %key, "worker.delayed.superseded");
				return;
			}
			work();
		});
	}

	/// Whether a run for `key` is still pending.
	pub fn is_scheduled(&self, key: &str) -> bool {
		self.inner.pending.lock().contains_key(key)
	}
}

impl SchedulerInner {
	fn is_current(&self, key: &str, generation: u64) -> bool {
		self.pending.lock().get(key) == Some(&generation)
	}

	/// Claims the pending slot for this run; fails if a newer schedule
	/// replaced it while the timer was waiting.
	fn take_current(&self, key: &str, generation: u64) -> bool {
		let mut pending = self.pending.lock();
		if pending.get(key) == Some(&generation) {
			pending.remove(key);
			true
		} else {
			false
		}
	}
}
