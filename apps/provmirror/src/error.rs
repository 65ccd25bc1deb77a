//! Server error handling

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use provmirror_errors::UserFacingError;
use provmirror_types::ErrorResponse;

/// Startup errors
#[derive(Debug)]
pub enum ServerError {
    /// Configuration or context setup error
    Setup(provmirror_errors::Error),
    /// Binding or serving failed
    Io(std::io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Setup(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                Ok(())
            }
            ServerError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Setup(e) => Some(e),
            ServerError::Io(e) => Some(e),
        }
    }
}

impl From<provmirror_errors::Error> for ServerError {
    fn from(e: provmirror_errors::Error) -> Self {
        ServerError::Setup(e)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::Io(e)
    }
}

/// A failed request, rendered as an [`ErrorResponse`]
#[derive(Debug)]
pub struct ApiError(pub provmirror_errors::Error);

impl From<provmirror_errors::Error> for ApiError {
    fn from(e: provmirror_errors::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
        let message = self.0.to_string();
        tracing::warn!(
            status = status.as_u16(),
            code = self.0.user_code().unwrap_or("unknown"),
            error = %message,
            "request failed"
        );
        (status, Json(ErrorResponse::new(status.as_u16(), message))).into_response()
    }
}
