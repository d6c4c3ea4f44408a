//! HTTP mapping for core errors.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tpsmock_core::error::{ClientCode, MockError};

/// Core error on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub MockError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::NotFound => StatusCode::NOT_FOUND,
            ClientCode::Protected => StatusCode::FORBIDDEN,
            ClientCode::DuplicatePath | ClientCode::DuplicateId => StatusCode::CONFLICT,
            ClientCode::InvalidConfig => StatusCode::BAD_REQUEST,
            ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MockError> for ApiError {
    fn from(e: MockError) -> Self {
        Self(e)
    }
}

/// Malformed JSON is an `InvalidConfig` at the decoding boundary.
impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self(MockError::InvalidConfig(e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "management request failed");
        }
        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.client_code().as_str(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
