//! HTTP error responses for the web adapter.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::adapters::web::auth::Backend;
use crate::domain::error::PapertradeError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<PapertradeError> for WebError {
    fn from(err: PapertradeError) -> Self {
        let status = match &err {
            PapertradeError::Validation { .. } => StatusCode::BAD_REQUEST,
            PapertradeError::Auth { .. } => StatusCode::UNAUTHORIZED,
            PapertradeError::Conflict { .. } => StatusCode::CONFLICT,
            PapertradeError::UnknownSymbol { .. }
            | PapertradeError::InsufficientFunds { .. }
            | PapertradeError::InsufficientShares { .. }
            | PapertradeError::NotOwned { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PapertradeError::Storage { .. }
            | PapertradeError::ConfigParse { .. }
            | PapertradeError::ConfigMissing { .. }
            | PapertradeError::ConfigInvalid { .. }
            | PapertradeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<axum_login::Error<Backend>> for WebError {
    fn from(err: axum_login::Error<Backend>) -> Self {
        match err {
            axum_login::Error::Session(e) => Self::internal(e.to_string()),
            axum_login::Error::Backend(e) => Self::from(e),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    status: u16,
    message: &'a str,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let template = ErrorTemplate {
            status: self.status.as_u16(),
            message: &self.message,
        };
        match template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, self.message).into_response(),
        }
    }
}
