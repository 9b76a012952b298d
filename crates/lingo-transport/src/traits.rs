use crate::error::Result;

/// Core transport interface that all implementations must satisfy.
///
/// Provides a unified abstraction over event-based transports. Publishing is
/// fire-and-forget from the publisher's point of view: the call reports how
/// many subscribers observed the event, and a subscriber that lags simply
/// misses old events rather than blocking the publisher.
#[async_trait::async_trait]
pub trait Transport<E>: Clone + Send + Sync + 'static
where
	E: Clone + Send + Sync + 'static,
{
	/// Associated type for the subscription this transport produces
	type Subscription: Send + 'static;

	/// Publishes an event to all active subscribers.
	/// Returns the number of subscribers that observed it.
	async fn publish(&self, event: E) -> Result<usize>;

	/// Subscribes to the transport event stream.
	fn subscribe(&self) -> Self::Subscription;

	/// Returns the total number of active subscribers.
	fn subscriber_count(&self) -> usize;

	/// Returns whether the transport has been closed.
	fn is_closed(&self) -> bool;
}
