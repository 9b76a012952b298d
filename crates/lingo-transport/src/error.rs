/// Transport-agnostic error type
#[derive(Debug, thiserror::Error, Clone)]
pub enum TransportError {
	/// The channel or connection is closed
	#[error("Transport channel closed")]
	Closed,

	/// The receiver lagged and messages were dropped
	#[error("Transport overflowed, {0} messages dropped")]
	Overflowed(u64),

	/// No message is currently available
	#[error("Transport channel empty")]
	Empty,

	/// Failed to publish a message
	#[error("Publish failed: {0}")]
	PublishFailed(String),
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;
