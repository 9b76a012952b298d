use crate::error::{DispatchError, Result};
use crate::state::DispatchStats;
use crate::store::ResultStore;
use crate::types::{FailureKind, InflightTicket, StoredOutcome, TranslationResult};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct WaitConfig {
	/// Hard upper bound on the wait; nothing in the system waits unbounded.
	pub timeout: Duration,
	/// Store poll cadence for waiters the completion channel cannot reach.
	pub poll_interval: Duration,
}

impl Default for WaitConfig {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(10),
			poll_interval: Duration::from_millis(500),
		}
	}
}

/// Bridges a synchronous caller to an asynchronous completion.
///
/// Waits on the ticket's completion channel (the in-process fast path) and
/// polls the result store at a fixed interval (the path that also works when
/// the worker lives in another process), bounded by a hard timeout. On
/// timeout the caller gets a tagged pass-through of the original text rather
/// than a bare error: a translation feature failing open beats a silent
/// hang in a live chat.
pub struct WaitBridge {
	store: Arc<ResultStore>,
	config: WaitConfig,
	stats: Arc<DispatchStats>,
}

impl WaitBridge {
	#[must_use]
	pub fn new(config: WaitConfig, store: Arc<ResultStore>, stats: Arc<DispatchStats>) -> Self {
		Self { store, config, stats }
	}

	/// Consumes the ticket and blocks (from the caller's point of view)
	/// until a result appears, the timeout elapses, or the caller goes away.
	///
	/// Cancellation stops this wait loop only: the worker runs to completion
	/// and still writes the store, so a later independent read succeeds.
	pub async fn wait_for(&self, ticket: InflightTicket, cancellation_token: &CancellationToken) -> Result<TranslationResult> {
		let key = ticket.key();
		let InflightTicket {
			request_id,
			target_language,
			source_text,
			source_language,
			dispatched_at,
			completion,
			..
		} = ticket;

		let mut completion = completion.fuse();
		let deadline = tokio::time::Instant::now() + self.config.timeout;
		let mut poll = tokio::time::interval(self.config.poll_interval);
		poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

		loop {
			tokio::select! {
				outcome = &mut completion => {
					if let Ok(outcome) = outcome {
						return Self::deliver(outcome, request_id, &target_language, &source_text, &source_language);
					}
					// Sender dropped without resolving; the store poll takes over
				}
				_ = poll.tick() => {
					if let Some(outcome) = self.store.get(&key) {
						return Self::deliver(outcome, request_id, &target_language, &source_text, &source_language);
					}
				}
				() = tokio::time::sleep_until(deadline) => {
					DispatchStats::incr(&self.stats.wait_timeouts);
					warn!(
						%request_id,
						target = %target_language,
						waited_ms = dispatched_at.elapsed().as_millis() as u64,
						"⏱️ No result within the wait bound, degrading to pass-through"
					);
					return Self::fallback(request_id, &target_language, &source_text, &source_language).ok_or(DispatchError::Timeout);
				}
				() = cancellation_token.cancelled() => {
					DispatchStats::incr(&self.stats.wait_cancellations);
					debug!(%request_id, "👋 Caller abandoned the wait");
					return Err(DispatchError::Cancelled);
				}
			}
		}
	}

	fn deliver(outcome: StoredOutcome, request_id: Uuid, target_language: &str, source_text: &Option<String>, source_language: &Option<String>) -> Result<TranslationResult> {
		match outcome {
			StoredOutcome::Ready(result) => Ok(result),
			StoredOutcome::Failed(record) => {
				debug!(kind = ?record.kind, "Dispatched request failed, degrading to pass-through");
				let bare = match record.kind {
					FailureKind::WorkerUnavailable => DispatchError::WorkerUnavailable,
					FailureKind::Inference => DispatchError::Inference,
				};
				// Fail open where the original text is available
				Self::fallback(request_id, target_language, source_text, source_language).ok_or(bare)
			}
		}
	}

	fn fallback(request_id: Uuid, target_language: &str, source_text: &Option<String>, source_language: &Option<String>) -> Option<TranslationResult> {
		source_text.as_ref().map(|text| TranslationResult {
			request_id,
			translated_text: text.clone(),
			source_language: source_language.clone().unwrap_or_else(|| "und".to_owned()),
			target_language: target_language.to_owned(),
			confidence: 0.05,
			model_used: "fallback".to_owned(),
			processing_time_seconds: 0.0,
			from_cache: false,
		})
	}
}
