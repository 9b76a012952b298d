use crate::events::DispatchEvent;
use crate::pool::{WorkerJob, WorkerPool};
use crate::state::DispatchStats;
use crate::types::{ModelTier, ResultKey, StoredOutcome, TranslationRequest};
use lingo_transport::Transport;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

/// Batching parameters.
#[derive(Debug, Clone)]
pub struct BatchConfig {
	/// How long a batch accumulates before it is flushed.
	pub window: Duration,
	/// A batch flushes early once it reaches this many requests.
	pub max_size: usize,
	/// Delay before the single internal retry when the pool queue is full
	/// at flush time.
	pub retry_delay: Duration,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			window: Duration::from_millis(50),
			max_size: 10,
			retry_delay: Duration::from_millis(100),
		}
	}
}

/// Requests sharing a key can be translated in one model invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
	/// `None` groups auto-detect requests; the engine resolves per segment.
	pub source: Option<String>,
	pub target: String,
	pub tier: ModelTier,
}

impl BatchKey {
	#[must_use]
	pub fn for_request(request: &TranslationRequest) -> Self {
		Self {
			source: request.source_language.clone(),
			target: request.target_language.clone(),
			tier: request.resolved_tier(),
		}
	}

	#[must_use]
	pub fn label(&self) -> String {
		format!("{}→{}/{}", self.source.as_deref().unwrap_or("auto"), self.target, self.tier)
	}
}

/// One request waiting inside a batch.
#[derive(Debug)]
pub struct PendingItem {
	pub request: TranslationRequest,
	pub enqueued_at: Instant,
	pub(crate) done: oneshot::Sender<StoredOutcome>,
}

impl PendingItem {
	#[must_use]
	pub fn key(&self) -> ResultKey {
		ResultKey::new(self.request.request_id, self.request.target_language.clone())
	}

	pub(crate) fn resolve(self, outcome: StoredOutcome) {
		// The waiter may have gone away; the store still holds the outcome
		let _ = self.done.send(outcome);
	}
}

/// Lifecycle of one batch bucket.
///
/// Once a bucket leaves `Accumulating` it accepts no more requests; late
/// arrivals for the same key start a fresh bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
	Accumulating,
	Flushing,
	Dispatched,
}

struct Bucket {
	items: Vec<PendingItem>,
	state: BatchState,
	opened_at: Instant,
	epoch: u64,
}

/// Groups requests arriving within a short window into one model invocation.
///
/// The model lock serializes same-tier inference for correctness; batching
/// restores the lost throughput, because a single inference call processes
/// several inputs without needing several concurrent lock holders. Every
/// pool job is a batch (single requests are batches of one), so the
/// acceptance path is the same for both.
pub struct BatchAccumulator<T>
where
	T: Transport<DispatchEvent>,
{
	buckets: Mutex<HashMap<BatchKey, Bucket>>,
	epochs: AtomicU64,
	config: BatchConfig,
	pool: Arc<WorkerPool<T>>,
	stats: Arc<DispatchStats>,
}

impl<T> BatchAccumulator<T>
where
	T: Transport<DispatchEvent>,
{
	#[must_use]
	pub fn new(config: BatchConfig, pool: Arc<WorkerPool<T>>, stats: Arc<DispatchStats>) -> Arc<Self> {
		Arc::new(Self {
			buckets: Mutex::new(HashMap::new()),
			epochs: AtomicU64::new(0),
			config,
			pool,
			stats,
		})
	}

	/// Adds a request to the accumulator and returns its completion future.
	///
	/// The future resolves individually from the batch's combined result, in
	/// input order.
	pub async fn enqueue(self: &Arc<Self>, request: TranslationRequest) -> oneshot::Receiver<StoredOutcome> {
		let (done_tx, done_rx) = oneshot::channel();
		let key = BatchKey::for_request(&request);
		let item = PendingItem {
			request,
			enqueued_at: Instant::now(),
			done: done_tx,
		};

		let full_bucket = {
			let mut buckets = self.buckets.lock().await;
			let bucket = buckets.entry(key.clone()).or_insert_with(|| {
				let epoch = self.epochs.fetch_add(1, Ordering::Relaxed);
				self.spawn_flush_timer(key.clone(), epoch);
				Bucket {
					items: Vec::new(),
					state: BatchState::Accumulating,
					opened_at: Instant::now(),
					epoch,
				}
			});
			bucket.items.push(item);
			let full = bucket.items.len() >= self.config.max_size;

			if full {
				buckets.remove(&key)
			} else {
				None
			}
		};

		if let Some(bucket) = full_bucket {
			debug!(batch = %key.label(), "📦 Batch reached size threshold");
			self.flush(key, bucket).await;
		}

		done_rx
	}

	/// Number of buckets currently accumulating, for diagnostics.
	pub async fn open_buckets(&self) -> usize {
		self.buckets.lock().await.len()
	}

	fn spawn_flush_timer(self: &Arc<Self>, key: BatchKey, epoch: u64) {
		let accumulator = Arc::clone(self);
		tokio::spawn(async move {
			tokio::time::sleep(accumulator.config.window).await;

			let expired = {
				let mut buckets = accumulator.buckets.lock().await;
				// Only flush the bucket this timer was armed for; a size-flush
				// may already have replaced it with a younger one
				if buckets.get(&key).is_some_and(|bucket| bucket.epoch == epoch) {
					buckets.remove(&key)
				} else {
					None
				}
			};

			if let Some(bucket) = expired {
				accumulator.flush(key, bucket).await;
			}
		});
	}

	async fn flush(&self, key: BatchKey, mut bucket: Bucket) {
		bucket.state = BatchState::Flushing;
		DispatchStats::incr(&self.stats.batches_flushed);
		debug!(
			batch = %key.label(),
			size = bucket.items.len(),
			age_ms = bucket.opened_at.elapsed().as_millis() as u64,
			"📤 Flushing batch"
		);

		let job = WorkerJob {
			key: key.clone(),
			items: std::mem::take(&mut bucket.items),
		};

		match self.pool.try_submit(job) {
			Ok(()) => {
				bucket.state = BatchState::Dispatched;
				debug!(batch = %key.label(), state = ?bucket.state, "Batch handed to worker pool");
			}
			Err(job) => {
				// Queue full: one internal retry, then surface per item
				tokio::time::sleep(self.config.retry_delay).await;
				match self.pool.try_submit(job) {
					Ok(()) => {
						bucket.state = BatchState::Dispatched;
						debug!(batch = %key.label(), state = ?bucket.state, "Batch handed to worker pool after retry");
					}
					Err(job) => {
						warn!(batch = %key.label(), size = job.items.len(), "🚧 Worker queue full, rejecting batch");
						DispatchStats::incr(&self.stats.jobs_rejected);
						self.pool.reject_job(job).await;
					}
				}
			}
		}
	}
}
