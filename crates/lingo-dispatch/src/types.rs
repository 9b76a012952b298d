use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Model tier selecting which loaded model serves a request.
///
/// Tiers double as model identifiers for the lock registry: all inference
/// against one tier goes through that tier's lock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
	Basic,
	Medium,
	Premium,
}

impl ModelTier {
	/// Derive a tier from text length. Pure function, no stored state.
	///
	/// Short interactive messages go to the small fast model; long passages
	/// go to the large one.
	#[must_use]
	pub fn for_text(text: &str) -> Self {
		match text.chars().count() {
			0..=19 => Self::Basic,
			20..=100 => Self::Medium,
			_ => Self::Premium,
		}
	}

	/// Stable identifier used as the model lock key and in result metadata.
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Basic => "basic",
			Self::Medium => "medium",
			Self::Premium => "premium",
		}
	}
}

impl fmt::Display for ModelTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Conversation-level encryption mode, consulted before dispatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionMode {
	#[default]
	None,
	Server,
	Hybrid,
	E2ee,
}

impl EncryptionMode {
	/// Fully end-to-end encrypted content never reaches the worker pool:
	/// the server cannot read it, so there is nothing to translate.
	#[must_use]
	pub const fn is_translatable(self) -> bool {
		!matches!(self, Self::E2ee)
	}
}

/// What the caller wants translated: inline text or a stored audio segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SourcePayload {
	Text(String),
	AudioRef(String),
}

impl SourcePayload {
	#[must_use]
	pub fn text(&self) -> Option<&str> {
		match self {
			Self::Text(t) => Some(t),
			Self::AudioRef(_) => None,
		}
	}
}

/// A single unit of translation work.
///
/// Once created, a request is immutable and self-describing. The gateway
/// refuses to construct one for end-to-end encrypted content.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
	pub request_id: Uuid,
	pub conversation_id: String,
	pub source: SourcePayload,
	/// `None` means auto-detect.
	pub source_language: Option<String>,
	pub target_language: String,
	/// Explicit tier override; derived from text length when absent.
	pub model_tier: Option<ModelTier>,
	pub encryption_mode: EncryptionMode,
}

impl TranslationRequest {
	/// Explicit tier if the caller supplied one, length-derived otherwise.
	/// Audio segments default to the medium tier.
	#[must_use]
	pub fn resolved_tier(&self) -> ModelTier {
		self.model_tier.unwrap_or_else(|| match &self.source {
			SourcePayload::Text(text) => ModelTier::for_text(text),
			SourcePayload::AudioRef(_) => ModelTier::Medium,
		})
	}
}

/// Completed translation, written once by a worker and read by waiters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
	pub request_id: Uuid,
	pub translated_text: String,
	/// Resolved language, never `auto` once returned.
	pub source_language: String,
	pub target_language: String,
	pub confidence: f32,
	pub model_used: String,
	pub processing_time_seconds: f64,
	pub from_cache: bool,
}

/// Why a dispatched request produced no translation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
	WorkerUnavailable,
	Inference,
}

/// Typed failure record a worker writes instead of silently dropping work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
	pub kind: FailureKind,
	pub detail: String,
	pub recorded_at: DateTime<Utc>,
}

impl FailureRecord {
	#[must_use]
	pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
		Self {
			kind,
			detail: detail.into(),
			recorded_at: Utc::now(),
		}
	}
}

/// Terminal outcome of one dispatched request, as stored per result key.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredOutcome {
	Ready(TranslationResult),
	Failed(FailureRecord),
}

/// Key for the result store: one source message may be translated into
/// several target languages concurrently, each an independent result under
/// the same request lineage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
	pub request_id: Uuid,
	pub target_language: String,
}

impl ResultKey {
	#[must_use]
	pub fn new(request_id: Uuid, target_language: impl Into<String>) -> Self {
		Self {
			request_id,
			target_language: target_language.into(),
		}
	}
}

/// Lifecycle of one dispatched-but-not-yet-resolved request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
	Pending,
	Completed,
	Failed,
	TimedOut,
}

/// One dispatched request awaiting resolution.
///
/// Owned exclusively by the wait bridge for its lifetime; consumed when the
/// bridge returns to the caller. The `completion` channel is the in-process
/// fast path; the store poll covers waiters that outlive it.
#[derive(Debug)]
pub struct InflightTicket {
	pub request_id: Uuid,
	pub target_language: String,
	/// Carried so a timeout can degrade to a tagged pass-through.
	pub source_text: Option<String>,
	pub source_language: Option<String>,
	pub dispatched_at: Instant,
	pub status: TicketStatus,
	pub(crate) completion: oneshot::Receiver<StoredOutcome>,
}

impl InflightTicket {
	#[must_use]
	pub fn new(request: &TranslationRequest, completion: oneshot::Receiver<StoredOutcome>) -> Self {
		Self {
			request_id: request.request_id,
			target_language: request.target_language.clone(),
			source_text: request.source.text().map(str::to_owned),
			source_language: request.source_language.clone(),
			dispatched_at: Instant::now(),
			status: TicketStatus::Pending,
			completion,
		}
	}

	#[must_use]
	pub fn key(&self) -> ResultKey {
		ResultKey::new(self.request_id, self.target_language.clone())
	}
}
