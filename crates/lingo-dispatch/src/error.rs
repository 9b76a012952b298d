use thiserror::Error;

/// Dispatch error taxonomy.
///
/// Only `NotTranslatable` and `Validation` are client-caused and returned
/// verbatim; everything else degrades to a pass-through result where the
/// original text is available, because a translation feature failing open is
/// preferable to failing closed in a live chat.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
	#[error("message is end-to-end encrypted and cannot be translated")]
	NotTranslatable,

	#[error("invalid request: {0}")]
	Validation(String),

	#[error("no worker could accept the request")]
	WorkerUnavailable,

	#[error("timed out waiting for translation")]
	Timeout,

	#[error("translation failed")]
	Inference,

	#[error("wait cancelled by caller")]
	Cancelled,
}

impl DispatchError {
	/// Client-caused errors are surfaced verbatim and never retried.
	#[must_use]
	pub const fn is_client_error(&self) -> bool {
		matches!(self, Self::NotTranslatable | Self::Validation(_))
	}
}

pub type Result<T> = std::result::Result<T, DispatchError>;
