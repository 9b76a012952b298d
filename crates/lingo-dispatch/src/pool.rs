use crate::batch::{BatchKey, PendingItem};
use crate::cache::{CachedTranslation, TranslationCache};
use crate::engine::{EngineOutput, EngineRegistry};
use crate::events::DispatchEvent;
use crate::locks::ModelLockRegistry;
use crate::state::DispatchStats;
use crate::store::ResultStore;
use crate::types::{FailureKind, FailureRecord, ModelTier, SourcePayload, StoredOutcome, TranslationResult};
use lingo_transport::Transport;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One unit of pool work: a batch of requests sharing a language pair and
/// tier, translated in a single model invocation.
#[derive(Debug)]
pub struct WorkerJob {
	pub key: BatchKey,
	pub items: Vec<PendingItem>,
}

impl WorkerJob {
	#[must_use]
	pub fn len(&self) -> usize {
		self.items.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}

/// Worker pool parameters.
#[derive(Debug, Clone)]
pub struct PoolConfig {
	/// Bounded job queue capacity; a full queue is backpressure, not a
	/// hidden overload.
	pub queue_capacity: usize,
	pub initial_workers: usize,
	pub min_workers: usize,
	pub max_workers: usize,
	/// Queue depth above which the supervisor scales up.
	pub scale_up_depth: usize,
	/// Queue depth below which the supervisor scales down.
	pub scale_down_depth: usize,
	pub scaling_interval: Duration,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			queue_capacity: 64,
			initial_workers: 2,
			min_workers: 1,
			max_workers: 8,
			scale_up_depth: 32,
			scale_down_depth: 2,
			scaling_interval: Duration::from_secs(30),
		}
	}
}

enum Pulled {
	Job(Box<WorkerJob>),
	Idle,
	Shutdown,
}

/// Pool of model-backed translation workers.
///
/// Workers pull batches from a shared bounded queue and run inference inside
/// `spawn_blocking` while holding the tier's model lock. A worker that has
/// started a batch always runs it to completion: partial inference cannot be
/// safely interrupted, so cancellation only stops the pull loop.
///
/// The worker count floats between `min_workers` and `max_workers` under a
/// supervisor that watches queue depth and utilization; nothing in the
/// interface assumes a fixed count.
pub struct WorkerPool<T>
where
	T: Transport<DispatchEvent>,
{
	tx: mpsc::Sender<WorkerJob>,
	rx: Arc<Mutex<mpsc::Receiver<WorkerJob>>>,
	engines: Arc<EngineRegistry>,
	locks: Arc<ModelLockRegistry>,
	store: Arc<ResultStore>,
	cache: Arc<TranslationCache>,
	transport: T,
	stats: Arc<DispatchStats>,
	config: PoolConfig,
	target_workers: AtomicUsize,
	worker_seq: AtomicUsize,
	cancellation_token: CancellationToken,
}

impl<T> WorkerPool<T>
where
	T: Transport<DispatchEvent>,
{
	/// Builds the pool and starts the initial workers and the scaling
	/// supervisor.
	#[allow(clippy::too_many_arguments)]
	pub fn start(
		config: PoolConfig,
		engines: Arc<EngineRegistry>,
		locks: Arc<ModelLockRegistry>,
		store: Arc<ResultStore>,
		cache: Arc<TranslationCache>,
		transport: T,
		stats: Arc<DispatchStats>,
		cancellation_token: CancellationToken,
	) -> Arc<Self> {
		let (tx, rx) = mpsc::channel(config.queue_capacity);
		let initial = config.initial_workers;

		let pool = Arc::new(Self {
			tx,
			rx: Arc::new(Mutex::new(rx)),
			engines,
			locks,
			store,
			cache,
			transport,
			stats,
			config,
			target_workers: AtomicUsize::new(initial),
			worker_seq: AtomicUsize::new(0),
			cancellation_token,
		});

		info!(workers = initial, queue_capacity = pool.config.queue_capacity, "🏭 Starting translation worker pool");
		for _ in 0..initial {
			pool.spawn_worker();
		}
		pool.spawn_supervisor();

		pool
	}

	/// Non-blocking enqueue. Returns the job back on a full or closed queue
	/// so the caller decides what to surface.
	pub fn try_submit(&self, job: WorkerJob) -> Result<(), WorkerJob> {
		match self.tx.try_send(job) {
			Ok(()) => {
				DispatchStats::incr(&self.stats.jobs_enqueued);
				self.stats.set_queue_depth(self.queue_depth());
				Ok(())
			}
			Err(mpsc::error::TrySendError::Full(job) | mpsc::error::TrySendError::Closed(job)) => Err(job),
		}
	}

	/// Current number of jobs waiting in the queue.
	#[must_use]
	pub fn queue_depth(&self) -> usize {
		self.tx.max_capacity() - self.tx.capacity()
	}

	/// Whether the queue has no room for another job right now.
	#[must_use]
	pub fn is_saturated(&self) -> bool {
		self.tx.capacity() == 0
	}

	/// Writes a typed failure for every item of a job the queue refused.
	pub(crate) async fn reject_job(&self, job: WorkerJob) {
		for item in job.items {
			let record = FailureRecord::new(FailureKind::WorkerUnavailable, "worker queue full");
			self.store.put(item.key(), StoredOutcome::Failed(record.clone()));
			self
				.publish(DispatchEvent::Failed {
					request_id: item.request.request_id,
					target_language: item.request.target_language.clone(),
					kind: FailureKind::WorkerUnavailable,
				})
				.await;
			item.resolve(StoredOutcome::Failed(record));
		}
	}

	fn spawn_worker(self: &Arc<Self>) {
		let pool = Arc::clone(self);
		let worker_id = self.worker_seq.fetch_add(1, Ordering::Relaxed);
		tokio::spawn(async move {
			pool.worker_loop(worker_id).await;
		});
	}

	async fn worker_loop(self: Arc<Self>, worker_id: usize) {
		self.stats.worker_started();
		info!(worker = worker_id, "🔄 Worker started, waiting for batches...");

		loop {
			if self.cancellation_token.is_cancelled() {
				info!(worker = worker_id, "🛑 Worker shutting down (cancellation requested)");
				break;
			}

			// Scale-down: surplus workers retire between jobs
			if self.stats.workers_active() > self.target_workers.load(Ordering::Relaxed) {
				info!(worker = worker_id, "📉 Worker retiring (scaled down)");
				break;
			}

			let pulled = {
				let mut rx = self.rx.lock().await;
				tokio::select! {
					() = self.cancellation_token.cancelled() => Pulled::Shutdown,
					job = rx.recv() => job.map_or(Pulled::Shutdown, |job| Pulled::Job(Box::new(job))),
					() = tokio::time::sleep(Duration::from_secs(1)) => Pulled::Idle,
				}
			};

			match pulled {
				Pulled::Job(job) => {
					self.stats.set_queue_depth(self.queue_depth());
					self.stats.set_worker_busy(true);
					self.process_job(*job).await;
					self.stats.set_worker_busy(false);
				}
				Pulled::Idle => {}
				Pulled::Shutdown => {
					info!(worker = worker_id, "🛑 Worker shutting down (queue closed)");
					break;
				}
			}
		}

		self.stats.worker_stopped();
		info!(worker = worker_id, "✅ Worker exiting");
	}

	async fn process_job(&self, job: WorkerJob) {
		let Some((tier, engine)) = self.engines.resolve(job.key.tier) else {
			warn!(tier = %job.key.tier, "⚠️ No model loaded for tier, failing batch");
			self.fail_job(job, "no model loaded").await;
			return;
		};

		if tier != job.key.tier {
			info!(requested = %job.key.tier, using = %tier, "Model for requested tier not loaded, substituting");
		}

		let queue_latency_ms = job.items.first().map_or(0, |item| item.enqueued_at.elapsed().as_millis());
		debug!(
			batch = %job.key.label(),
			size = job.len(),
			queue_latency_ms = queue_latency_ms as u64,
			model = engine.model_name(),
			"📥 Processing batch"
		);

		let segments: Vec<String> = job
			.items
			.iter()
			.map(|item| match &item.request.source {
				SourcePayload::Text(text) => text.clone(),
				SourcePayload::AudioRef(audio_ref) => audio_ref.clone(),
			})
			.collect();
		let source = job.key.source.clone();
		let target = job.key.target.clone();

		// The loaded model is not reentrant: hold its lock for the whole
		// invocation, and only for the invocation.
		let guard = self.locks.acquire(tier.as_str()).await;
		let started = Instant::now();
		let engine_call = Arc::clone(&engine);
		let outcome = tokio::task::spawn_blocking(move || engine_call.translate_batch(&segments, source.as_deref(), &target)).await;
		drop(guard);

		match outcome {
			Ok(Ok(outputs)) => self.complete_job(job, tier, outputs, started.elapsed()).await,
			Ok(Err(err)) => {
				error!(batch = %job.key.label(), error = %err, "❌ Inference failed");
				self.fail_job(job, err.to_string()).await;
			}
			Err(join_err) => {
				error!(batch = %job.key.label(), error = %join_err, "❌ Inference task panicked");
				self.fail_job(job, "inference task panicked").await;
			}
		}
	}

	async fn complete_job(&self, job: WorkerJob, tier: ModelTier, outputs: Vec<EngineOutput>, elapsed: Duration) {
		let processing_time_seconds = elapsed.as_secs_f64();
		let batch_label = job.key.label();
		let mut outputs = outputs.into_iter();

		for item in job.items {
			let Some(output) = outputs.next() else {
				// The engine returned fewer outputs than segments
				error!(batch = %batch_label, request_id = %item.request.request_id, "❌ Missing output for batch member");
				self.fail_item(item, "model returned short batch").await;
				continue;
			};

			let result = TranslationResult {
				request_id: item.request.request_id,
				translated_text: output.translated_text,
				source_language: output.detected_source,
				target_language: item.request.target_language.clone(),
				confidence: output.confidence,
				model_used: tier.as_str().to_owned(),
				processing_time_seconds,
				from_cache: false,
			};

			if let Some(text) = item.request.source.text() {
				self.cache.insert(
					text,
					&result.source_language,
					&result.target_language,
					tier,
					CachedTranslation {
						translated_text: result.translated_text.clone(),
						source_language: result.source_language.clone(),
						confidence: result.confidence,
						model_used: result.model_used.clone(),
					},
				);
			}

			self.store.put(item.key(), StoredOutcome::Ready(result.clone()));
			self
				.publish(DispatchEvent::Completed {
					request_id: result.request_id,
					target_language: result.target_language.clone(),
					model_used: result.model_used.clone(),
					processing_time_seconds,
				})
				.await;
			DispatchStats::incr(&self.stats.results_completed);
			item.resolve(StoredOutcome::Ready(result));
		}

		debug!(batch = %batch_label, seconds = processing_time_seconds, "✨ Batch completed");
	}

	async fn fail_job(&self, job: WorkerJob, detail: impl Into<String>) {
		let detail = detail.into();
		for item in job.items {
			self.fail_item(item, detail.clone()).await;
		}
	}

	async fn fail_item(&self, item: PendingItem, detail: impl Into<String>) {
		DispatchStats::incr(&self.stats.inference_failures);
		let record = FailureRecord::new(FailureKind::Inference, detail);
		self.store.put(item.key(), StoredOutcome::Failed(record.clone()));
		self
			.publish(DispatchEvent::Failed {
				request_id: item.request.request_id,
				target_language: item.request.target_language.clone(),
				kind: FailureKind::Inference,
			})
			.await;
		item.resolve(StoredOutcome::Failed(record));
	}

	async fn publish(&self, event: DispatchEvent) {
		if let Err(err) = self.transport.publish(event).await {
			debug!(error = %err, "Event publish failed");
		}
	}

	fn spawn_supervisor(self: &Arc<Self>) {
		let pool = Arc::clone(self);
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(pool.config.scaling_interval);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
			loop {
				tokio::select! {
					() = pool.cancellation_token.cancelled() => {
						info!("🛑 Pool supervisor shutting down");
						break;
					}
					_ = ticker.tick() => {
						pool.check_scaling();
					}
				}
			}
		});
	}

	/// Adjusts the worker target from queue depth and utilization.
	fn check_scaling(self: &Arc<Self>) {
		let depth = self.queue_depth();
		let target = self.target_workers.load(Ordering::Relaxed);
		let active = self.stats.workers_active();
		let utilization = if target == 0 { 0.0 } else { self.stats.workers_busy() as f64 / target as f64 };

		if depth > self.config.scale_up_depth && utilization > 0.8 && target < self.config.max_workers {
			let new_target = (target + 2).min(self.config.max_workers);
			self.target_workers.store(new_target, Ordering::Relaxed);
			info!(depth, from = target, to = new_target, "⬆️ Scaling worker pool up");
			for _ in active..new_target {
				self.spawn_worker();
			}
		} else if depth < self.config.scale_down_depth && utilization < 0.3 && target > self.config.min_workers {
			let new_target = (target - 1).max(self.config.min_workers);
			self.target_workers.store(new_target, Ordering::Relaxed);
			info!(depth, from = target, to = new_target, "⬇️ Scaling worker pool down");
			// Surplus workers retire on their own at the top of their loop
		}
	}
}
