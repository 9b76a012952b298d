use crate::batch::BatchAccumulator;
use crate::cache::TranslationCache;
use crate::error::{DispatchError, Result};
use crate::events::DispatchEvent;
use crate::pool::WorkerPool;
use crate::state::DispatchStats;
use crate::types::{InflightTicket, SourcePayload, TranslationRequest, TranslationResult};
use lingo_transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest text the dispatcher will accept for translation.
pub const MAX_TEXT_LEN: usize = 5_000;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
	/// How long a request may wait for queue room before it is refused.
	pub admission_delay: Duration,
}

impl Default for GatewayConfig {
	fn default() -> Self {
		Self {
			admission_delay: Duration::from_millis(100),
		}
	}
}

/// What `submit` hands back: either a finished result (short-circuit or
/// cache hit) or a ticket for the wait bridge.
#[derive(Debug)]
pub enum Submission {
	Completed(TranslationResult),
	Pending(InflightTicket),
}

/// Front door of the dispatch core.
///
/// Validates, enforces the encryption gate, short-circuits trivial work, and
/// forwards the rest to the batching accumulator. Never performs inference
/// and never blocks on it: `submit` returns as soon as the request is
/// accepted.
pub struct DispatchGateway<T>
where
	T: Transport<DispatchEvent>,
{
	batcher: Arc<BatchAccumulator<T>>,
	pool: Arc<WorkerPool<T>>,
	cache: Arc<TranslationCache>,
	stats: Arc<DispatchStats>,
	config: GatewayConfig,
}

impl<T> DispatchGateway<T>
where
	T: Transport<DispatchEvent>,
{
	#[must_use]
	pub fn new(config: GatewayConfig, batcher: Arc<BatchAccumulator<T>>, pool: Arc<WorkerPool<T>>, cache: Arc<TranslationCache>, stats: Arc<DispatchStats>) -> Self {
		Self {
			batcher,
			pool,
			cache,
			stats,
			config,
		}
	}

	/// Accepts a request for dispatch.
	///
	/// End-to-end encrypted content is refused before any ticket exists or
	/// the pool is touched.
	pub async fn submit(&self, request: TranslationRequest) -> Result<Submission> {
		DispatchStats::incr(&self.stats.requests_submitted);

		if !request.encryption_mode.is_translatable() {
			DispatchStats::incr(&self.stats.rejected_not_translatable);
			debug!(request_id = %request.request_id, "🚫 Refusing dispatch: content is end-to-end encrypted");
			return Err(DispatchError::NotTranslatable);
		}

		if let Err(err) = Self::validate(&request) {
			DispatchStats::incr(&self.stats.validation_failures);
			return Err(err);
		}

		// Nothing to translate when source and target already match
		if let (Some(source), Some(text)) = (request.source_language.as_deref(), request.source.text()) {
			if source == request.target_language {
				DispatchStats::incr(&self.stats.short_circuits);
				debug!(request_id = %request.request_id, language = source, "⚡ Same-language short-circuit");
				return Ok(Submission::Completed(TranslationResult {
					request_id: request.request_id,
					translated_text: text.to_owned(),
					source_language: source.to_owned(),
					target_language: request.target_language.clone(),
					confidence: 1.0,
					model_used: "none".to_owned(),
					processing_time_seconds: 0.0,
					from_cache: false,
				}));
			}
		}

		let tier = request.resolved_tier();

		if let (Some(source), Some(text)) = (request.source_language.as_deref(), request.source.text()) {
			if let Some(hit) = self.cache.get(text, source, &request.target_language, tier) {
				DispatchStats::incr(&self.stats.cache_hits);
				debug!(request_id = %request.request_id, "💾 Translation served from cache");
				return Ok(Submission::Completed(TranslationResult {
					request_id: request.request_id,
					translated_text: hit.translated_text,
					source_language: hit.source_language,
					target_language: request.target_language.clone(),
					confidence: hit.confidence,
					model_used: hit.model_used,
					processing_time_seconds: 0.0,
					from_cache: true,
				}));
			}
		}

		// Admission window: one internal retry, then surface the refusal
		if self.pool.is_saturated() {
			tokio::time::sleep(self.config.admission_delay).await;
			if self.pool.is_saturated() {
				DispatchStats::incr(&self.stats.jobs_rejected);
				warn!(request_id = %request.request_id, depth = self.pool.queue_depth(), "🚧 Worker queue saturated, refusing request");
				return Err(DispatchError::WorkerUnavailable);
			}
		}

		let completion = self.batcher.enqueue(request.clone()).await;
		let ticket = InflightTicket::new(&request, completion);
		debug!(request_id = %request.request_id, tier = %tier, target = %request.target_language, "🚚 Request dispatched");

		Ok(Submission::Pending(ticket))
	}

	fn validate(request: &TranslationRequest) -> Result<()> {
		if !is_language_code(&request.target_language) {
			return Err(DispatchError::Validation(format!("invalid target language '{}'", request.target_language)));
		}

		if let Some(source) = request.source_language.as_deref() {
			if !is_language_code(source) {
				return Err(DispatchError::Validation(format!("invalid source language '{source}'")));
			}
		}

		match &request.source {
			SourcePayload::Text(text) if text.trim().is_empty() => Err(DispatchError::Validation("text must not be empty".to_owned())),
			SourcePayload::Text(text) if text.chars().count() > MAX_TEXT_LEN => {
				Err(DispatchError::Validation(format!("text exceeds {MAX_TEXT_LEN} characters")))
			}
			SourcePayload::AudioRef(audio_ref) if audio_ref.trim().is_empty() => Err(DispatchError::Validation("audio reference must not be empty".to_owned())),
			_ => Ok(()),
		}
	}
}

fn is_language_code(code: &str) -> bool {
	(2..=8).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic())
}
