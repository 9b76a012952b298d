use crate::types::ModelTier;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
	text: String,
	source: String,
	target: String,
	tier: ModelTier,
}

/// A cached translation, as produced by a prior model invocation.
#[derive(Debug, Clone)]
pub struct CachedTranslation {
	pub translated_text: String,
	pub source_language: String,
	pub confidence: f32,
	pub model_used: String,
}

struct CacheSlot {
	value: CachedTranslation,
	stored_at: Instant,
}

/// Read-through cache for repeated translations.
///
/// Keyed by the full (text, source, target, tier) tuple: the same sentence
/// translated to two languages, or by two tiers, is two entries. Entries
/// expire after a TTL; when the cache is full, the oldest entry makes room.
pub struct TranslationCache {
	slots: DashMap<CacheKey, CacheSlot>,
	ttl: Duration,
	capacity: usize,
}

impl TranslationCache {
	#[must_use]
	pub fn new(ttl: Duration, capacity: usize) -> Self {
		Self {
			slots: DashMap::new(),
			ttl,
			capacity,
		}
	}

	#[must_use]
	pub fn get(&self, text: &str, source: &str, target: &str, tier: ModelTier) -> Option<CachedTranslation> {
		let key = CacheKey {
			text: text.to_owned(),
			source: source.to_owned(),
			target: target.to_owned(),
			tier,
		};

		if let Some(slot) = self.slots.get(&key) {
			if slot.stored_at.elapsed() < self.ttl {
				return Some(slot.value.clone());
			}
		}

		// Expired entry, if any, is dropped on the way out
		self.slots.remove_if(&key, |_, slot| slot.stored_at.elapsed() >= self.ttl);
		None
	}

	pub fn insert(&self, text: &str, source: &str, target: &str, tier: ModelTier, value: CachedTranslation) {
		if self.slots.len() >= self.capacity {
			self.evict_one();
		}

		self.slots.insert(
			CacheKey {
				text: text.to_owned(),
				source: source.to_owned(),
				target: target.to_owned(),
				tier,
			},
			CacheSlot {
				value,
				stored_at: Instant::now(),
			},
		);
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	fn evict_one(&self) {
		let oldest = self
			.slots
			.iter()
			.max_by_key(|entry| entry.value().stored_at.elapsed())
			.map(|entry| entry.key().clone());

		if let Some(key) = oldest {
			self.slots.remove(&key);
		}
	}
}
