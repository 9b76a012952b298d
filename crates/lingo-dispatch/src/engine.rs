use crate::types::ModelTier;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Output of one translated segment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
	pub translated_text: String,
	/// Resolved source language, detected when the caller did not supply one.
	pub detected_source: String,
	pub confidence: f32,
}

#[derive(Error, Debug, Clone)]
pub enum EngineError {
	#[error("model failure: {0}")]
	Model(String),

	#[error("unsupported language pair {0} -> {1}")]
	UnsupportedPair(String, String),
}

/// The opaque, stateful, non-reentrant computation unit behind a worker.
///
/// Implementations are blocking (they run under `spawn_blocking`) and must
/// never be invoked concurrently for the same instance; the caller holds
/// that model's lock for the duration of the call.
pub trait TranslationEngine: Send + Sync {
	/// Human-readable model name, for logs.
	fn model_name(&self) -> &str;

	/// Best-effort language detection for auto-detect requests.
	fn detect_language(&self, text: &str) -> Option<String>;

	/// Translates a batch of segments in one model invocation.
	///
	/// `source` of `None` means detect per segment. Outputs map 1:1 to
	/// `segments` in input order.
	fn translate_batch(&self, segments: &[String], source: Option<&str>, target: &str) -> Result<Vec<EngineOutput>, EngineError>;
}

/// Maps tiers to loaded engines.
///
/// A request for an unloaded tier is served by the nearest loaded one
/// rather than failing, mirroring how model loading degrades at startup.
pub struct EngineRegistry {
	engines: HashMap<ModelTier, Arc<dyn TranslationEngine>>,
}

impl EngineRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self { engines: HashMap::new() }
	}

	#[must_use]
	pub fn with_engine(mut self, tier: ModelTier, engine: Arc<dyn TranslationEngine>) -> Self {
		self.engines.insert(tier, engine);
		self
	}

	#[must_use]
	pub fn get(&self, tier: ModelTier) -> Option<Arc<dyn TranslationEngine>> {
		self.engines.get(&tier).cloned()
	}

	/// Resolves the engine for a tier, falling back to the closest loaded
	/// tier (smaller first) when the requested one is absent.
	#[must_use]
	pub fn resolve(&self, tier: ModelTier) -> Option<(ModelTier, Arc<dyn TranslationEngine>)> {
		if let Some(engine) = self.get(tier) {
			return Some((tier, engine));
		}

		[ModelTier::Basic, ModelTier::Medium, ModelTier::Premium]
			.into_iter()
			.find_map(|candidate| self.get(candidate).map(|engine| (candidate, engine)))
	}

	#[must_use]
	pub fn loaded_tiers(&self) -> Vec<ModelTier> {
		let mut tiers: Vec<ModelTier> = self.engines.keys().copied().collect();
		tiers.sort_unstable();
		tiers
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.engines.is_empty()
	}
}

impl Default for EngineRegistry {
	fn default() -> Self {
		Self::new()
	}
}
