use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lingo_dispatch::DispatchError;
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
	#[error(transparent)]
	Dispatch(#[from] DispatchError),

	#[error("no translation stored for that request")]
	ResultNotFound,
}

impl ApiError {
	/// Machine-checkable error code for the response body.
	fn code(&self) -> &'static str {
		match self {
			Self::Dispatch(DispatchError::NotTranslatable) => "notTranslatable",
			Self::Dispatch(DispatchError::Validation(_)) => "validation",
			Self::Dispatch(DispatchError::WorkerUnavailable) => "workerUnavailable",
			Self::Dispatch(DispatchError::Timeout) => "timeout",
			Self::Dispatch(DispatchError::Inference) => "inferenceFailure",
			Self::Dispatch(DispatchError::Cancelled) => "cancelled",
			Self::ResultNotFound => "resultNotFound",
		}
	}

	fn status(&self) -> StatusCode {
		match self {
			Self::Dispatch(DispatchError::NotTranslatable) => StatusCode::UNPROCESSABLE_ENTITY,
			Self::Dispatch(DispatchError::Validation(_)) => StatusCode::BAD_REQUEST,
			Self::Dispatch(DispatchError::WorkerUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
			Self::Dispatch(DispatchError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
			Self::Dispatch(DispatchError::Inference) => StatusCode::BAD_GATEWAY,
			Self::Dispatch(DispatchError::Cancelled) => StatusCode::REQUEST_TIMEOUT,
			Self::ResultNotFound => StatusCode::NOT_FOUND,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = json!({
			"code": self.code(),
			"error": self.to_string(),
		});
		(self.status(), Json(body)).into_response()
	}
}
