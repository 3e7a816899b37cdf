//! Error responses for the API pipeline.
//!
//! # Responsibilities
//! - Map each `ApiError` to its status code
//! - Render a minimal HTML page with a fixed footer
//!
//! # Design Decisions
//! - Internal details are logged, never rendered
//! - The client always gets a complete response, never a reset

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::cache::ApiError;

/// Footer line on every error page.
pub const ERROR_FOOTER: &str = "cache-proxy";

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Gone => StatusCode::GONE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ApiError::Forbidden => "The request is missing its account or session token.",
            ApiError::Unavailable => "The service is temporarily unavailable. Please try again later.",
            ApiError::Gone => "This request can no longer be served.",
            ApiError::Internal(_) => "The proxy encountered an internal error.",
        }
    }
}

/// Render the HTML body for `status`.
pub fn render_error_page(status: StatusCode, message: &str) -> String {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Error");
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{code} {reason}</title></head>\n<body>\n<h1>{code} {reason}</h1>\n<p>{message}</p>\n<hr>\n<address>{ERROR_FOOTER}</address>\n</body>\n</html>\n"
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Html(render_error_page(status, self.public_message()))).into_response()
    }
}
