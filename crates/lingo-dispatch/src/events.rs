use crate::types::FailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Completion events published by workers over the transport.
///
/// Fire-and-forget: the worker never waits on subscribers. Out-of-process
/// observers (relays, analytics) get exactly one observable completion per
/// dispatched request; the result store remains the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DispatchEvent {
	#[serde(rename_all = "camelCase")]
	Completed {
		request_id: Uuid,
		target_language: String,
		model_used: String,
		processing_time_seconds: f64,
	},
	#[serde(rename_all = "camelCase")]
	Failed {
		request_id: Uuid,
		target_language: String,
		kind: FailureKind,
	},
}

impl DispatchEvent {
	/// Subject prefix for this event, for transports that route by subject.
	#[must_use]
	pub const fn subject(&self) -> &'static str {
		match self {
			Self::Completed { .. } => "translation.completed",
			Self::Failed { .. } => "translation.failed",
		}
	}

	#[must_use]
	pub const fn request_id(&self) -> Uuid {
		match self {
			Self::Completed { request_id, .. } | Self::Failed { request_id, .. } => *request_id,
		}
	}
}

impl fmt::Display for DispatchEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.subject(), self.request_id())
	}
}
