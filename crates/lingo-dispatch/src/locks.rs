use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// One mutual-exclusion lock per logical model identifier.
///
/// The loaded inference models are not safe for concurrent invocation:
/// overlapping calls against the same model corrupt results or crash the
/// process. The lock protects that single external resource, not any data
/// structure, which is also why it serializes all inference on a tier.
/// Cross-tier requests still run in parallel; restoring same-tier
/// throughput is the batching accumulator's job.
///
/// Locks are created lazily on first reference and live for the rest of the
/// process. Acquisition is scoped: the guard releases on every exit path,
/// including a panic inside the inference call.
pub struct ModelLockRegistry {
	locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ModelLockRegistry {
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new(Self { locks: DashMap::new() })
	}

	/// Waits for and takes the lock for `model_id`.
	///
	/// All inference against that model must happen while the returned guard
	/// is alive.
	pub async fn acquire(&self, model_id: &str) -> OwnedMutexGuard<()> {
		let handle = self.handle(model_id);
		handle.lock_owned().await
	}

	/// Non-blocking probe, used by tests and diagnostics.
	#[must_use]
	pub fn try_acquire(&self, model_id: &str) -> Option<OwnedMutexGuard<()>> {
		self.handle(model_id).try_lock_owned().ok()
	}

	/// Number of distinct model locks created so far.
	#[must_use]
	pub fn lock_count(&self) -> usize {
		self.locks.len()
	}

	fn handle(&self, model_id: &str) -> Arc<Mutex<()>> {
		if let Some(existing) = self.locks.get(model_id) {
			return existing.value().clone();
		}

		let entry = self.locks.entry(model_id.to_owned()).or_insert_with(|| {
			debug!(model_id, "🔒 Created inference lock");
			Arc::new(Mutex::new(()))
		});
		entry.value().clone()
	}
}
