//! Provider action error types
//!
//! Messages here are returned verbatim in error response bodies.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ActionError {
    #[error("invalid request")]
    InvalidRequest,

    #[error("unsupported action {action}")]
    UnsupportedAction { action: String },

    #[error("cannot find version: {version}")]
    VersionNotFound { version: String },

    #[error("cannot find asset {name}")]
    AssetNotFound { name: String },

    #[error("failed getting pgp keys {message}")]
    SigningKeys { message: String },

    #[error("failed mirroring {url}: {message}")]
    Mirror { url: String, message: String },

    #[error("failed getting shasum {message}")]
    Shasum { message: String },

    #[error("failed fetching upstream release {message}")]
    Upstream { message: String },
}

impl UserFacingError for ActionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedAction { .. } => Some("Only the download action is supported."),
            Self::VersionNotFound { .. } => {
                Some("List the provider versions to see what is published.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Mirror { .. } | Self::Upstream { .. } | Self::SigningKeys { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidRequest => "action.invalid_request",
            Self::UnsupportedAction { .. } => "action.unsupported",
            Self::VersionNotFound { .. } => "action.version_not_found",
            Self::AssetNotFound { .. } => "action.asset_not_found",
            Self::SigningKeys { .. } => "action.signing_keys",
            Self::Mirror { .. } => "action.mirror",
            Self::Shasum { .. } => "action.shasum",
            Self::Upstream { .. } => "action.upstream",
        };
        Some(code)
    }
}
