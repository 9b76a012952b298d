// tests/dispatch_flow.rs
// End-to-end tests for the dispatch core against an instrumented engine

use lingo_dispatch::{
	BatchAccumulator, BatchConfig, DispatchError, DispatchEvent, DispatchGateway, DispatchStats, EncryptionMode, EngineError, EngineOutput, EngineRegistry,
	GatewayConfig, ModelLockRegistry, ModelTier, PoolConfig, ResultKey, ResultStore, SourcePayload, StoredOutcome, Submission, TranslationCache, TranslationEngine,
	TranslationRequest, TranslationResult, WaitBridge, WaitConfig, WorkerPool,
};
use lingo_transport::{InMemTransport, Transport};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ============================================================================
// Instrumented engine
// ============================================================================

/// Deterministic engine that records call concurrency and timing windows so
/// tests can assert serialization and parallelism.
struct MockEngine {
	name: String,
	delay: Duration,
	fail_next: AtomicBool,
	panic_next: AtomicBool,
	calls: AtomicUsize,
	active: AtomicUsize,
	peak_active: AtomicUsize,
	spans: Mutex<Vec<(Instant, Instant)>>,
}

impl MockEngine {
	fn new(name: &str, delay: Duration) -> Arc<Self> {
		Arc::new(Self {
			name: name.to_owned(),
			delay,
			fail_next: AtomicBool::new(false),
			panic_next: AtomicBool::new(false),
			calls: AtomicUsize::new(0),
			active: AtomicUsize::new(0),
			peak_active: AtomicUsize::new(0),
			spans: Mutex::new(Vec::new()),
		})
	}

	fn peak(&self) -> usize {
		self.peak_active.load(Ordering::SeqCst)
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn spans(&self) -> Vec<(Instant, Instant)> {
		self.spans.lock().unwrap().clone()
	}
}

impl TranslationEngine for MockEngine {
	fn model_name(&self) -> &str {
		&self.name
	}

	fn detect_language(&self, text: &str) -> Option<String> {
		let lowered = text.to_lowercase();
		if lowered.contains("bonjour") {
			Some("fr".to_owned())
		} else {
			Some("en".to_owned())
		}
	}

	fn translate_batch(&self, segments: &[String], source: Option<&str>, target: &str) -> Result<Vec<EngineOutput>, EngineError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak_active.fetch_max(now_active, Ordering::SeqCst);
		let started = Instant::now();

		std::thread::sleep(self.delay);

		self.spans.lock().unwrap().push((started, Instant::now()));
		self.active.fetch_sub(1, Ordering::SeqCst);

		if self.fail_next.swap(false, Ordering::SeqCst) {
			return Err(EngineError::Model("synthetic model failure".to_owned()));
		}
		if self.panic_next.swap(false, Ordering::SeqCst) {
			panic!("synthetic model panic");
		}

		Ok(
			segments
				.iter()
				.map(|segment| EngineOutput {
					translated_text: format!("[{target}] {segment}"),
					detected_source: source.map(str::to_owned).or_else(|| self.detect_language(segment)).unwrap_or_else(|| "en".to_owned()),
					confidence: 0.9,
				})
				.collect(),
		)
	}
}

// ============================================================================
// Test harness
// ============================================================================

struct TestCore {
	gateway: DispatchGateway<InMemTransport<DispatchEvent>>,
	bridge: WaitBridge,
	store: Arc<ResultStore>,
	stats: Arc<DispatchStats>,
	transport: InMemTransport<DispatchEvent>,
	cancellation_token: CancellationToken,
	engines: HashMap<ModelTier, Arc<MockEngine>>,
	pool: Arc<WorkerPool<InMemTransport<DispatchEvent>>>,
}

struct TestCoreOptions {
	engine_delay: Duration,
	batch_window: Duration,
	wait_timeout: Duration,
	queue_capacity: usize,
	initial_workers: usize,
}

impl Default for TestCoreOptions {
	fn default() -> Self {
		Self {
			engine_delay: Duration::from_millis(50),
			batch_window: Duration::from_millis(20),
			wait_timeout: Duration::from_secs(3),
			queue_capacity: 64,
			initial_workers: 4,
		}
	}
}

impl TestCore {
	fn new(options: TestCoreOptions) -> Self {
		let stats = DispatchStats::new();
		let store = ResultStore::new(Duration::from_secs(60));
		let cache = Arc::new(TranslationCache::new(Duration::from_secs(60), 128));
		let locks = ModelLockRegistry::new();
		let transport = InMemTransport::<DispatchEvent>::new(64);
		let cancellation_token = CancellationToken::new();

		let mut engines = HashMap::new();
		let mut registry = EngineRegistry::new();
		for tier in [ModelTier::Basic, ModelTier::Medium, ModelTier::Premium] {
			let engine = MockEngine::new(&format!("mock-{tier}"), options.engine_delay);
			engines.insert(tier, engine.clone());
			registry = registry.with_engine(tier, engine);
		}

		let pool = WorkerPool::start(
			PoolConfig {
				queue_capacity: options.queue_capacity,
				initial_workers: options.initial_workers,
				min_workers: 1,
				max_workers: 8,
				scale_up_depth: 32,
				scale_down_depth: 2,
				scaling_interval: Duration::from_secs(30),
			},
			Arc::new(registry),
			locks,
			store.clone(),
			cache.clone(),
			transport.clone(),
			stats.clone(),
			cancellation_token.clone(),
		);

		let batcher = BatchAccumulator::new(
			BatchConfig {
				window: options.batch_window,
				max_size: 10,
				retry_delay: Duration::from_millis(20),
			},
			pool.clone(),
			stats.clone(),
		);

		let gateway = DispatchGateway::new(
			GatewayConfig {
				admission_delay: Duration::from_millis(100),
			},
			batcher,
			pool.clone(),
			cache,
			stats.clone(),
		);

		let bridge = WaitBridge::new(
			WaitConfig {
				timeout: options.wait_timeout,
				poll_interval: Duration::from_millis(50),
			},
			store.clone(),
			stats.clone(),
		);

		Self {
			gateway,
			bridge,
			store,
			stats,
			transport,
			cancellation_token,
			engines,
			pool,
		}
	}

	fn engine(&self, tier: ModelTier) -> &Arc<MockEngine> {
		&self.engines[&tier]
	}

	/// Submit and wait, the way a request handler would.
	async fn translate(&self, request: TranslationRequest) -> Result<TranslationResult, DispatchError> {
		match self.gateway.submit(request).await? {
			Submission::Completed(result) => Ok(result),
			Submission::Pending(ticket) => self.bridge.wait_for(ticket, &self.cancellation_token).await,
		}
	}
}

fn request(text: &str, source: Option<&str>, target: &str) -> TranslationRequest {
	TranslationRequest {
		request_id: Uuid::new_v4(),
		conversation_id: "conv-1".to_owned(),
		source: SourcePayload::Text(text.to_owned()),
		source_language: source.map(str::to_owned),
		target_language: target.to_owned(),
		model_tier: None,
		encryption_mode: EncryptionMode::None,
	}
}

fn overlaps(a: (Instant, Instant), b: (Instant, Instant)) -> bool {
	a.0 < b.1 && b.0 < a.1
}

// ============================================================================
// Scenarios and properties
// ============================================================================

#[tokio::test]
async fn scenario_a_auto_detects_source_on_small_model() {
	let core = TestCore::new(TestCoreOptions::default());

	let result = core.translate(request("Hello", None, "fr")).await.unwrap();

	assert_eq!(result.source_language, "en");
	assert_eq!(result.target_language, "fr");
	assert_eq!(result.model_used, "basic");
	assert!(!result.from_cache);
}

#[tokio::test]
async fn scenario_b_same_language_short_circuits() {
	let core = TestCore::new(TestCoreOptions::default());

	let outcome = core.gateway.submit(request("Bonjour", Some("fr"), "fr")).await.unwrap();
	let Submission::Completed(result) = outcome else {
		panic!("expected an immediate result");
	};

	assert_eq!(result.translated_text, "Bonjour");
	assert_eq!(result.model_used, "none");
	assert_eq!(result.confidence, 1.0);
	assert_eq!(result.processing_time_seconds, 0.0);
	// The worker pool was never touched
	assert_eq!(DispatchStats::read(&core.stats.jobs_enqueued), 0);
	assert_eq!(core.engine(ModelTier::Basic).calls(), 0);
}

#[tokio::test]
async fn scenario_c_same_tier_requests_serialize() {
	let delay = Duration::from_millis(200);
	let core = TestCore::new(TestCoreOptions {
		engine_delay: delay,
		..TestCoreOptions::default()
	});

	// Same tier, different language pairs: two separate model invocations
	let a = request("a message of medium size here", Some("en"), "fr");
	let b = request("another medium sized message", Some("en"), "de");
	assert_eq!(a.resolved_tier(), ModelTier::Medium);
	assert_eq!(b.resolved_tier(), ModelTier::Medium);

	let started = Instant::now();
	let (ra, rb) = tokio::join!(core.translate(a), core.translate(b));
	let elapsed = started.elapsed();

	assert_eq!(ra.unwrap().model_used, "medium");
	assert_eq!(rb.unwrap().model_used, "medium");

	let engine = core.engine(ModelTier::Medium);
	assert_eq!(engine.calls(), 2);
	// The model lock never admitted two overlapping invocations,
	// so total wall time is the sum, not the max
	assert_eq!(engine.peak(), 1);
	assert!(elapsed >= delay * 2, "expected serialized execution, finished in {elapsed:?}");
}

#[tokio::test]
async fn p2_cross_tier_requests_run_in_parallel() {
	let delay = Duration::from_millis(200);
	let core = TestCore::new(TestCoreOptions {
		engine_delay: delay,
		..TestCoreOptions::default()
	});

	let small = request("short text", Some("en"), "fr");
	let large = request(&"long passage ".repeat(20), Some("en"), "fr");
	assert_eq!(small.resolved_tier(), ModelTier::Basic);
	assert_eq!(large.resolved_tier(), ModelTier::Premium);

	let (rs, rl) = tokio::join!(core.translate(small), core.translate(large));
	rs.unwrap();
	rl.unwrap();

	let basic_spans = core.engine(ModelTier::Basic).spans();
	let premium_spans = core.engine(ModelTier::Premium).spans();
	assert_eq!(basic_spans.len(), 1);
	assert_eq!(premium_spans.len(), 1);
	assert!(
		overlaps(basic_spans[0], premium_spans[0]),
		"expected cross-tier invocations to overlap in time"
	);
}

#[tokio::test]
async fn p4_wait_is_bounded_and_degrades_to_pass_through() {
	let core = TestCore::new(TestCoreOptions {
		engine_delay: Duration::from_millis(1500),
		wait_timeout: Duration::from_millis(300),
		..TestCoreOptions::default()
	});

	let started = Instant::now();
	let result = core.translate(request("Hello there my friend", Some("en"), "fr")).await.unwrap();
	let elapsed = started.elapsed();

	assert!(elapsed < Duration::from_secs(1), "wait was not bounded: {elapsed:?}");
	assert_eq!(result.model_used, "fallback");
	assert_eq!(result.translated_text, "Hello there my friend");
	assert_eq!(result.source_language, "en");
	assert!(result.confidence < 0.1);
	assert_eq!(DispatchStats::read(&core.stats.wait_timeouts), 1);
}

#[tokio::test]
async fn scenario_e_e2ee_is_refused_without_touching_the_pool() {
	let core = TestCore::new(TestCoreOptions::default());

	let mut encrypted = request("secret text", Some("en"), "fr");
	encrypted.encryption_mode = EncryptionMode::E2ee;

	let err = core.gateway.submit(encrypted).await.unwrap_err();
	assert_eq!(err, DispatchError::NotTranslatable);

	assert_eq!(DispatchStats::read(&core.stats.rejected_not_translatable), 1);
	assert_eq!(DispatchStats::read(&core.stats.jobs_enqueued), 0);
	assert_eq!(core.pool.queue_depth(), 0);
	for tier in [ModelTier::Basic, ModelTier::Medium, ModelTier::Premium] {
		assert_eq!(core.engine(tier).calls(), 0);
	}
}

#[tokio::test]
async fn p6_failed_inference_releases_the_model_lock() {
	let core = TestCore::new(TestCoreOptions::default());
	core.engine(ModelTier::Medium).fail_next.store(true, Ordering::SeqCst);

	// First request fails open with the pass-through fallback
	let degraded = core.translate(request("a message of medium size here", Some("en"), "fr")).await.unwrap();
	assert_eq!(degraded.model_used, "fallback");
	assert_eq!(DispatchStats::read(&core.stats.inference_failures), 1);

	// The tier is usable again: a second request translates normally
	let ok = core.translate(request("another medium sized message", Some("en"), "fr")).await.unwrap();
	assert_eq!(ok.model_used, "medium");
	assert!(ok.translated_text.starts_with("[fr]"));
}

#[tokio::test]
async fn p6_panicking_inference_releases_the_model_lock() {
	let core = TestCore::new(TestCoreOptions::default());
	core.engine(ModelTier::Basic).panic_next.store(true, Ordering::SeqCst);

	let degraded = core.translate(request("Hello", Some("en"), "fr")).await.unwrap();
	assert_eq!(degraded.model_used, "fallback");

	let ok = core.translate(request("Hi again", Some("en"), "fr")).await.unwrap();
	assert_eq!(ok.model_used, "basic");
}

#[tokio::test]
async fn scenario_d_worker_completes_after_caller_abandons() {
	let core = TestCore::new(TestCoreOptions {
		engine_delay: Duration::from_millis(200),
		..TestCoreOptions::default()
	});

	let req = request("Hello out there", Some("en"), "fr");
	let request_id = req.request_id;

	let Submission::Pending(ticket) = core.gateway.submit(req).await.unwrap() else {
		panic!("expected a pending ticket");
	};

	// Caller goes away immediately
	let caller_gone = CancellationToken::new();
	caller_gone.cancel();
	let err = core.bridge.wait_for(ticket, &caller_gone).await.unwrap_err();
	assert_eq!(err, DispatchError::Cancelled);

	// The worker still runs to completion and writes the store
	tokio::time::sleep(Duration::from_millis(600)).await;
	let key = ResultKey::new(request_id, "fr");
	match core.store.get(&key) {
		Some(StoredOutcome::Ready(result)) => assert_eq!(result.translated_text, "[fr] Hello out there"),
		other => panic!("expected a stored result, got {other:?}"),
	}
	// And the read stays idempotent
	assert!(core.store.get(&key).is_some());
}

#[tokio::test]
async fn requests_in_one_window_share_a_model_invocation() {
	let core = TestCore::new(TestCoreOptions {
		batch_window: Duration::from_millis(100),
		..TestCoreOptions::default()
	});

	let texts = ["first one", "second one", "third one"];
	let mut waits = Vec::new();
	for text in texts {
		let Submission::Pending(ticket) = core.gateway.submit(request(text, Some("en"), "fr")).await.unwrap() else {
			panic!("expected a pending ticket");
		};
		waits.push(core.bridge.wait_for(ticket, &core.cancellation_token));
	}

	let results = futures::future::join_all(waits).await;
	for (text, result) in texts.iter().zip(results) {
		let result = result.unwrap();
		assert_eq!(result.translated_text, format!("[fr] {text}"));
		assert_eq!(result.model_used, "basic");
	}

	// One window, one batch, one invocation
	assert_eq!(DispatchStats::read(&core.stats.batches_flushed), 1);
	assert_eq!(DispatchStats::read(&core.stats.jobs_enqueued), 1);
	assert_eq!(core.engine(ModelTier::Basic).calls(), 1);
}

#[tokio::test]
async fn late_arrival_starts_a_new_batch() {
	let core = TestCore::new(TestCoreOptions {
		batch_window: Duration::from_millis(40),
		..TestCoreOptions::default()
	});

	core.translate(request("early bird", Some("en"), "fr")).await.unwrap();
	tokio::time::sleep(Duration::from_millis(80)).await;
	core.translate(request("late riser", Some("en"), "fr")).await.unwrap();

	assert_eq!(DispatchStats::read(&core.stats.batches_flushed), 2);
	assert_eq!(core.engine(ModelTier::Basic).calls(), 2);
}

#[tokio::test]
async fn repeated_request_is_served_from_cache() {
	let core = TestCore::new(TestCoreOptions::default());

	let first = core.translate(request("Good morning dear friends", Some("en"), "fr")).await.unwrap();
	assert!(!first.from_cache);

	let outcome = core.gateway.submit(request("Good morning dear friends", Some("en"), "fr")).await.unwrap();
	let Submission::Completed(second) = outcome else {
		panic!("expected a cache hit to complete immediately");
	};

	assert!(second.from_cache);
	assert_eq!(second.translated_text, first.translated_text);
	assert_eq!(second.processing_time_seconds, 0.0);
	assert_eq!(DispatchStats::read(&core.stats.cache_hits), 1);
	assert_eq!(core.engine(ModelTier::Medium).calls(), 1);
}

#[tokio::test]
async fn completion_events_reach_transport_subscribers() {
	let core = TestCore::new(TestCoreOptions::default());
	let mut subscription = core.transport.subscribe();

	let req = request("Hello", Some("en"), "fr");
	let request_id = req.request_id;
	core.translate(req).await.unwrap();

	let event = tokio::time::timeout(Duration::from_secs(2), subscription.recv()).await.unwrap().unwrap();
	match event {
		DispatchEvent::Completed {
			request_id: seen,
			ref target_language,
			ref model_used,
			..
		} => {
			assert_eq!(seen, request_id);
			assert_eq!(target_language, "fr");
			assert_eq!(model_used, "basic");
		}
		other => panic!("unexpected event: {other:?}"),
	}
}

#[tokio::test]
async fn saturated_pool_refuses_admission() {
	let core = TestCore::new(TestCoreOptions {
		engine_delay: Duration::from_millis(2000),
		batch_window: Duration::from_millis(10),
		queue_capacity: 1,
		initial_workers: 1,
		..TestCoreOptions::default()
	});

	// First request occupies the worker, second fills the queue
	let _a = core.gateway.submit(request("first long enough message", Some("en"), "fr")).await.unwrap();
	tokio::time::sleep(Duration::from_millis(100)).await;
	let _b = core.gateway.submit(request("second long enough message", Some("en"), "de")).await.unwrap();
	tokio::time::sleep(Duration::from_millis(100)).await;

	let err = core.gateway.submit(request("third long enough message", Some("en"), "es")).await.unwrap_err();
	assert_eq!(err, DispatchError::WorkerUnavailable);
	assert!(DispatchStats::read(&core.stats.jobs_rejected) >= 1);
}

#[tokio::test]
async fn validation_rejects_malformed_requests() {
	let core = TestCore::new(TestCoreOptions::default());

	let empty = core.gateway.submit(request("   ", Some("en"), "fr")).await.unwrap_err();
	assert!(matches!(empty, DispatchError::Validation(_)));

	let bad_target = core.gateway.submit(request("Hello", Some("en"), "f!")).await.unwrap_err();
	assert!(matches!(bad_target, DispatchError::Validation(_)));

	let bad_source = core.gateway.submit(request("Hello", Some("english-us"), "fr")).await.unwrap_err();
	assert!(matches!(bad_source, DispatchError::Validation(_)));

	assert_eq!(DispatchStats::read(&core.stats.validation_failures), 3);
	assert_eq!(DispatchStats::read(&core.stats.jobs_enqueued), 0);
}
