use dashmap::DashMap;
use lingo_dispatch::EncryptionMode;

/// A stored chat message, as the persistence layer hands it to us.
#[derive(Debug, Clone)]
pub struct StoredMessage {
	pub content: String,
	pub source_language: Option<String>,
	pub encryption_mode: EncryptionMode,
	pub conversation_id: String,
}

/// External persistence collaborator.
///
/// The real store lives in another service; the dispatch core only ever
/// needs to resolve a message id into content, a recorded source language,
/// and the conversation's encryption mode.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
	async fn fetch(&self, message_id: &str) -> Option<StoredMessage>;
}

/// In-memory stand-in for the persistence service.
#[derive(Default)]
pub struct InMemoryMessageStore {
	messages: DashMap<String, StoredMessage>,
}

impl InMemoryMessageStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[allow(dead_code)]
	pub fn insert(&self, message_id: impl Into<String>, message: StoredMessage) {
		self.messages.insert(message_id.into(), message);
	}
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
	async fn fetch(&self, message_id: &str) -> Option<StoredMessage> {
		self.messages.get(message_id).map(|entry| entry.value().clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn fetch_round_trip() {
		let store = InMemoryMessageStore::new();
		store.insert(
			"m-1",
			StoredMessage {
				content: "Bonjour".into(),
				source_language: Some("fr".into()),
				encryption_mode: EncryptionMode::Server,
				conversation_id: "c-1".into(),
			},
		);

		let fetched = store.fetch("m-1").await.unwrap();
		assert_eq!(fetched.content, "Bonjour");
		assert_eq!(fetched.encryption_mode, EncryptionMode::Server);
		assert!(store.fetch("m-2").await.is_none());
	}
}
