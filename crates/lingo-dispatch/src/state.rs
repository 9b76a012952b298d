use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counters for dispatch activity.
///
/// Read by the metrics exporter and by tests asserting interaction counts
/// (e.g. that a refused request never touched the worker pool).
#[derive(Default)]
pub struct DispatchStats {
	// Gateway
	pub requests_submitted: AtomicU64,
	pub rejected_not_translatable: AtomicU64,
	pub validation_failures: AtomicU64,
	pub short_circuits: AtomicU64,
	pub cache_hits: AtomicU64,

	// Pool
	pub jobs_enqueued: AtomicU64,
	pub jobs_rejected: AtomicU64,
	pub batches_flushed: AtomicU64,
	pub results_completed: AtomicU64,
	pub inference_failures: AtomicU64,

	// Wait bridge
	pub wait_timeouts: AtomicU64,
	pub wait_cancellations: AtomicU64,

	// Live gauges
	pub queue_depth: AtomicUsize,
	pub workers_active: AtomicUsize,
	pub workers_busy: AtomicUsize,
}

impl DispatchStats {
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn incr(counter: &AtomicU64) {
		counter.fetch_add(1, Ordering::Relaxed);
	}

	#[must_use]
	pub fn read(counter: &AtomicU64) -> u64 {
		counter.load(Ordering::Relaxed)
	}

	pub fn set_queue_depth(&self, depth: usize) {
		self.queue_depth.store(depth, Ordering::Relaxed);
	}

	pub fn worker_started(&self) {
		self.workers_active.fetch_add(1, Ordering::Relaxed);
	}

	pub fn worker_stopped(&self) {
		self.workers_active.fetch_sub(1, Ordering::Relaxed);
	}

	pub fn set_worker_busy(&self, busy: bool) {
		if busy {
			self.workers_busy.fetch_add(1, Ordering::Relaxed);
		} else {
			self.workers_busy.fetch_sub(1, Ordering::Relaxed);
		}
	}

	#[must_use]
	pub fn workers_active(&self) -> usize {
		self.workers_active.load(Ordering::Relaxed)
	}

	#[must_use]
	pub fn workers_busy(&self) -> usize {
		self.workers_busy.load(Ordering::Relaxed)
	}

	#[must_use]
	pub fn queue_depth(&self) -> usize {
		self.queue_depth.load(Ordering::Relaxed)
	}
}
