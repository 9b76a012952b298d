use crate::types::{ResultKey, StoredOutcome};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct StoredEntry {
	outcome: StoredOutcome,
	stored_at: Instant,
}

/// Short-lived keyed store bridging workers and waiters.
///
/// Workers write exactly one outcome per `(request_id, target_language)`
/// key; any number of readers poll it afterwards. Entries are evicted after
/// a retention window rather than on first read, so a caller that retries,
/// or reads late after abandoning its wait, sees the same outcome again.
pub struct ResultStore {
	entries: DashMap<ResultKey, StoredEntry>,
	retention: Duration,
}

impl ResultStore {
	#[must_use]
	pub fn new(retention: Duration) -> Arc<Self> {
		Arc::new(Self {
			entries: DashMap::new(),
			retention,
		})
	}

	/// Records the outcome for a key. First write wins: a duplicate
	/// completion (e.g. a redelivered job) does not clobber the original,
	/// which keeps completion exactly-once-observable per request.
	pub fn put(&self, key: ResultKey, outcome: StoredOutcome) -> bool {
		let mut inserted = false;
		self.entries.entry(key).or_insert_with(|| {
			inserted = true;
			StoredEntry {
				outcome,
				stored_at: Instant::now(),
			}
		});
		inserted
	}

	/// Overwrite for an explicit retranslation of the same request id.
	pub fn replace(&self, key: ResultKey, outcome: StoredOutcome) {
		self.entries.insert(
			key,
			StoredEntry {
				outcome,
				stored_at: Instant::now(),
			},
		);
	}

	#[must_use]
	pub fn get(&self, key: &ResultKey) -> Option<StoredOutcome> {
		self.entries.get(key).map(|entry| entry.outcome.clone())
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Drops entries older than the retention window.
	pub fn sweep(&self) -> usize {
		let before = self.entries.len();
		self.entries.retain(|_, entry| entry.stored_at.elapsed() < self.retention);
		let evicted = before - self.entries.len();
		if evicted > 0 {
			debug!(evicted, remaining = self.entries.len(), "🧹 Evicted expired translation results");
		}
		evicted
	}

	/// Spawns the background sweeper that enforces the retention window.
	pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, cancellation_token: CancellationToken) -> JoinHandle<()> {
		let store = Arc::clone(self);
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
			loop {
				tokio::select! {
					_ = cancellation_token.cancelled() => {
						info!("🛑 Result store sweeper shutting down");
						break;
					}
					_ = ticker.tick() => {
						store.sweep();
					}
				}
			}
		})
	}
}
