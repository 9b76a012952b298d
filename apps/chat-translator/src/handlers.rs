use crate::error::ApiError;
use crate::messages::MessageStore;
use crate::metrics::TranslatorMetrics;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lingo_dispatch::{
	DispatchError, DispatchEvent, DispatchGateway, DispatchStats, EncryptionMode, FailureKind, ModelTier, ResultKey, ResultStore, SourcePayload, StoredOutcome,
	Submission, TranslationRequest, TranslationResult, WaitBridge,
};
use lingo_transport::InMemTransport;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

pub type EventTransport = InMemTransport<DispatchEvent>;

#[derive(Clone)]
pub struct AppState {
	pub gateway: Arc<DispatchGateway<EventTransport>>,
	pub bridge: Arc<WaitBridge>,
	pub store: Arc<ResultStore>,
	pub messages: Arc<dyn MessageStore>,
	pub stats: Arc<DispatchStats>,
	pub metrics: Arc<TranslatorMetrics>,
	pub shutdown: CancellationToken,
}

/// Inbound translation request body.
///
/// Exactly one of `text` or `messageId` must be present; a `messageId`
/// resolves content, stored source language, and the conversation's
/// encryption mode through the persistence collaborator.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateBody {
	pub text: Option<String>,
	pub message_id: Option<String>,
	pub source_language: Option<String>,
	pub target_language: String,
	pub model_tier: Option<ModelTier>,
	pub conversation_id: Option<String>,
	pub encryption_mode: Option<EncryptionMode>,
}

#[instrument(name = "translate", skip(state, body), fields(target = %body.target_language))]
pub async fn translate(State(state): State<AppState>, Json(body): Json<TranslateBody>) -> Result<Json<TranslationResult>, ApiError> {
	state.metrics.http_requests_total.inc();

	let request = build_request(state.messages.as_ref(), body).await?;
	match state.gateway.submit(request).await? {
		Submission::Completed(result) => Ok(Json(result)),
		// If the client disconnects this future is dropped and the wait
		// stops with it; the worker still completes into the store
		Submission::Pending(ticket) => Ok(Json(state.bridge.wait_for(ticket, &state.shutdown).await?)),
	}
}

/// Independent read of a stored outcome, e.g. after an abandoned wait.
pub async fn get_translation(State(state): State<AppState>, Path((request_id, language)): Path<(Uuid, String)>) -> Result<Json<TranslationResult>, ApiError> {
	match state.store.get(&ResultKey::new(request_id, language)) {
		Some(StoredOutcome::Ready(result)) => Ok(Json(result)),
		Some(StoredOutcome::Failed(record)) => Err(
			match record.kind {
				FailureKind::WorkerUnavailable => DispatchError::WorkerUnavailable,
				FailureKind::Inference => DispatchError::Inference,
			}
			.into(),
		),
		None => Err(ApiError::ResultNotFound),
	}
}

pub async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
	Json(json!({
		"status": "ok",
		"workersActive": state.stats.workers_active(),
		"queueDepth": state.stats.queue_depth(),
	}))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
	match state.metrics.render(&state.stats) {
		Ok(text) => (StatusCode::OK, [("Content-Type", "text/plain; version=0.0.4")], text).into_response(),
		Err(err) => {
			tracing::error!(error = %err, "Failed to gather metrics");
			StatusCode::INTERNAL_SERVER_ERROR.into_response()
		}
	}
}

async fn build_request(messages: &dyn MessageStore, body: TranslateBody) -> Result<TranslationRequest, ApiError> {
	match (body.text, body.message_id) {
		(Some(_), Some(_)) | (None, None) => Err(DispatchError::Validation("provide exactly one of text or messageId".to_owned()).into()),
		(Some(text), None) => Ok(TranslationRequest {
			request_id: Uuid::new_v4(),
			conversation_id: body.conversation_id.unwrap_or_else(|| "unknown".to_owned()),
			source: SourcePayload::Text(text),
			source_language: body.source_language,
			target_language: body.target_language,
			model_tier: body.model_tier,
			encryption_mode: body.encryption_mode.unwrap_or_default(),
		}),
		(None, Some(message_id)) => {
			let stored = messages
				.fetch(&message_id)
				.await
				.ok_or_else(|| ApiError::from(DispatchError::Validation(format!("unknown messageId '{message_id}'"))))?;

			Ok(TranslationRequest {
				request_id: Uuid::new_v4(),
				conversation_id: stored.conversation_id,
				source: SourcePayload::Text(stored.content),
				// An explicit override wins over the stored record
				source_language: body.source_language.or(stored.source_language),
				target_language: body.target_language,
				model_tier: body.model_tier,
				encryption_mode: stored.encryption_mode,
			})
		}
	}
}
