use lingo_dispatch::DispatchStats;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::atomic::Ordering;

/// Prometheus view over the dispatch core.
///
/// `http_requests_total` counts at the HTTP surface; the remaining series
/// mirror the core's atomic counters at scrape time.
pub struct TranslatorMetrics {
	registry: Registry,
	pub http_requests_total: IntCounter,
	results_completed: IntGauge,
	inference_failures: IntGauge,
	wait_timeouts: IntGauge,
	cache_hits: IntGauge,
	batches_flushed: IntGauge,
	queue_depth: IntGauge,
	workers_active: IntGauge,
}

impl TranslatorMetrics {
	pub fn new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();

		let http_requests_total = IntCounter::new("translator_http_requests_total", "Translation requests received over HTTP")?;
		let results_completed = IntGauge::new("translator_results_completed", "Translations completed by workers")?;
		let inference_failures = IntGauge::new("translator_inference_failures", "Worker inference failures")?;
		let wait_timeouts = IntGauge::new("translator_wait_timeouts", "Waits that hit the hard timeout")?;
		let cache_hits = IntGauge::new("translator_cache_hits", "Requests served from the translation cache")?;
		let batches_flushed = IntGauge::new("translator_batches_flushed", "Batches flushed to the worker pool")?;
		let queue_depth = IntGauge::new("translator_queue_depth", "Jobs waiting in the worker queue")?;
		let workers_active = IntGauge::new("translator_workers_active", "Live translation workers")?;

		registry.register(Box::new(http_requests_total.clone()))?;
		registry.register(Box::new(results_completed.clone()))?;
		registry.register(Box::new(inference_failures.clone()))?;
		registry.register(Box::new(wait_timeouts.clone()))?;
		registry.register(Box::new(cache_hits.clone()))?;
		registry.register(Box::new(batches_flushed.clone()))?;
		registry.register(Box::new(queue_depth.clone()))?;
		registry.register(Box::new(workers_active.clone()))?;

		Ok(Self {
			registry,
			http_requests_total,
			results_completed,
			inference_failures,
			wait_timeouts,
			cache_hits,
			batches_flushed,
			queue_depth,
			workers_active,
		})
	}

	/// Refreshes the mirrored series and renders the exposition text.
	pub fn render(&self, stats: &DispatchStats) -> Result<String, prometheus::Error> {
		self.results_completed.set(stats.results_completed.load(Ordering::Relaxed) as i64);
		self.inference_failures.set(stats.inference_failures.load(Ordering::Relaxed) as i64);
		self.wait_timeouts.set(stats.wait_timeouts.load(Ordering::Relaxed) as i64);
		self.cache_hits.set(stats.cache_hits.load(Ordering::Relaxed) as i64);
		self.batches_flushed.set(stats.batches_flushed.load(Ordering::Relaxed) as i64);
		self.queue_depth.set(stats.queue_depth() as i64);
		self.workers_active.set(stats.workers_active() as i64);

		let mut buffer = Vec::new();
		TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
		Ok(String::from_utf8_lossy(&buffer).into_owned())
	}
}
