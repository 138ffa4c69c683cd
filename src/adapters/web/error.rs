//! HTTP error responses for web adapter.

use askama::Template;
use axum::{
    Json,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::domain::error::SegviewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBody {
    Html,
    Json,
}

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
    pub body: ErrorBody,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body: ErrorBody::Json,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Render as an HTML page instead of a JSON object.
    pub fn page(mut self) -> Self {
        self.body = ErrorBody::Html;
        self
    }
}

pub fn status_from_error(err: &SegviewError) -> StatusCode {
    match err {
        SegviewError::MissingInput { .. }
        | SegviewError::UnknownKind(_)
        | SegviewError::InvalidFileName(_) => StatusCode::BAD_REQUEST,
        SegviewError::FileNotFound(_) => StatusCode::NOT_FOUND,
        SegviewError::Render { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SegviewError::ConfigParse { .. }
        | SegviewError::ConfigMissing { .. }
        | SegviewError::ConfigInvalid { .. }
        | SegviewError::FileRead { .. }
        | SegviewError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SegviewError> for WebError {
    fn from(err: SegviewError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, message = %self.message, "request failed");
        }
        match self.body {
            ErrorBody::Json => (
                self.status,
                [(header::CACHE_CONTROL, "no-store")],
                Json(serde_json::json!({ "error": self.message })),
            )
                .into_response(),
            ErrorBody::Html => {
                let template = super::templates::ErrorTemplate {
                    message: &self.message,
                    status: self.status.as_u16(),
                };
                match template.render() {
                    Ok(html) => (self.status, Html(html)).into_response(),
                    Err(_) => (self.status, self.message).into_response(),
                }
            }
        }
    }
}
