use crate::error::{Result, TransportError};
use crate::traits::Transport;
use async_broadcast::{broadcast, InactiveReceiver, Receiver, RecvError, Sender, TryRecvError};

/// In-memory transport implementation using `async_broadcast`.
///
/// Provides high-performance, in-process event delivery over a lock-free
/// broadcast channel. The channel is configured with overflow enabled, so a
/// slow subscriber drops its oldest buffered events instead of stalling
/// publishers.
#[derive(Clone)]
pub struct InMemTransport<E>
where
	E: Clone + Send + Sync + 'static,
{
	sender: Sender<E>,
	_keep_alive: InactiveReceiver<E>, // Keep channel open without buffering
}

impl<E> InMemTransport<E>
where
	E: Clone + Send + Sync + 'static,
{
	/// Creates a new in-memory transport layer.
	///
	/// # Arguments
	///
	/// * `buffer_size` - Maximum number of events buffered per subscriber.
	///   When overflow occurs, older events are dropped.
	#[must_use]
	pub fn new(buffer_size: usize) -> Self {
		let (mut sender, keep_alive) = broadcast::<E>(buffer_size);
		sender.set_await_active(false);
		sender.set_overflow(true);

		Self {
			sender,
			_keep_alive: keep_alive.deactivate(),
		}
	}

	/// Creates transport and returns an initial subscription (for convenience).
	#[must_use]
	pub fn with_subscription(buffer_size: usize) -> (Self, InMemSubscription<E>) {
		let transport = Self::new(buffer_size);
		let subscription = transport.subscribe();
		(transport, subscription)
	}
}

#[async_trait::async_trait]
impl<E> Transport<E> for InMemTransport<E>
where
	E: Clone + Send + Sync + 'static,
{
	type Subscription = InMemSubscription<E>;

	async fn publish(&self, event: E) -> Result<usize> {
		self
			.sender
			.broadcast(event)
			.await
			.map(|_| self.sender.receiver_count())
			.map_err(|e| TransportError::PublishFailed(e.to_string()))
	}

	fn subscribe(&self) -> InMemSubscription<E> {
		InMemSubscription(self.sender.new_receiver())
	}

	fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}

	fn is_closed(&self) -> bool {
		self.sender.is_closed()
	}
}

/// Subscription handle produced by [`InMemTransport`].
#[derive(Clone)]
pub struct InMemSubscription<E>(Receiver<E>);

impl<E> InMemSubscription<E>
where
	E: Clone + Send + Sync + 'static,
{
	/// Waits for and receives the next event.
	pub async fn recv(&mut self) -> Result<E> {
		match self.0.recv().await {
			Ok(event) => Ok(event),
			Err(RecvError::Closed) => Err(TransportError::Closed),
			Err(RecvError::Overflowed(n)) => Err(TransportError::Overflowed(n)),
		}
	}

	/// Attempts to receive an event without waiting.
	pub fn try_recv(&mut self) -> Result<E> {
		match self.0.try_recv() {
			Ok(event) => Ok(event),
			Err(TryRecvError::Closed) => Err(TransportError::Closed),
			Err(TryRecvError::Overflowed(n)) => Err(TransportError::Overflowed(n)),
			Err(TryRecvError::Empty) => Err(TransportError::Empty),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_publish() {
		let (transport, mut rx) = InMemTransport::<String>::with_subscription(10);

		transport.publish("test message".to_string()).await.unwrap();

		let msg = rx.recv().await.unwrap();
		assert_eq!(msg, "test message");
	}

	#[tokio::test]
	async fn test_multiple_subscribers() {
		let (transport, mut rx1) = InMemTransport::<i32>::with_subscription(10);
		let mut rx2 = transport.subscribe();
		let mut rx3 = transport.subscribe();

		transport.publish(42).await.unwrap();

		assert_eq!(rx1.recv().await.unwrap(), 42);
		assert_eq!(rx2.recv().await.unwrap(), 42);
		assert_eq!(rx3.recv().await.unwrap(), 42);
	}

	#[tokio::test]
	async fn test_try_recv_empty() {
		let (transport, mut rx) = InMemTransport::<String>::with_subscription(10);

		let result = rx.try_recv();
		assert!(matches!(result.unwrap_err(), TransportError::Empty));

		transport.publish("now there is one".to_string()).await.unwrap();
		tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

		assert_eq!(rx.try_recv().unwrap(), "now there is one");
	}

	#[tokio::test]
	async fn test_subscriber_count() {
		let (transport, _rx1) = InMemTransport::<String>::with_subscription(10);
		assert_eq!(transport.subscriber_count(), 1);

		let _rx2 = transport.subscribe();
		assert_eq!(transport.subscriber_count(), 2);

		let _rx3 = transport.subscribe();
		assert_eq!(transport.subscriber_count(), 3);
	}

	#[tokio::test]
	async fn test_publish_without_subscribers_does_not_block() {
		let transport = InMemTransport::<String>::new(2);

		for i in 0..10 {
			transport.publish(format!("event {i}")).await.unwrap();
		}

		assert!(!transport.is_closed());
	}
}
