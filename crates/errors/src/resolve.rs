//! Version resolution and filename grammar error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("failed listing releases for {owner}/{repo}: {message}")]
    ReleaseListing {
        owner: String,
        repo: String,
        message: String,
    },

    #[error("failed resolving asset url for {name}: {message}")]
    AssetUrl { name: String, message: String },

    #[error("invalid filename pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("filename pattern {pattern} is missing capture group {field}")]
    MissingCapture { pattern: String, field: String },
}

impl ResolveError {
    /// Stable error code for structured logging
    #[must_use]
    pub fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ReleaseListing { .. } => "resolve.release_listing",
            Self::AssetUrl { .. } => "resolve.asset_url",
            Self::InvalidPattern { .. } => "resolve.invalid_pattern",
            Self::MissingCapture { .. } => "resolve.missing_capture",
        };
        Some(code)
    }
}
