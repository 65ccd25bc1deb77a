//! Signing key error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum SigningError {
    #[error("no gpg public keys in upstream response")]
    NoKeys,

    #[error("not a public key: {block}")]
    NotPublicKey { block: String },

    #[error("invalid armor: {0}")]
    InvalidArmor(String),

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("unsupported public key version {0}")]
    UnsupportedKeyVersion(u8),
}

impl UserFacingError for SigningError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NoKeys => "signing.no_keys",
            Self::NotPublicKey { .. } => "signing.not_public_key",
            Self::InvalidArmor(_) => "signing.invalid_armor",
            Self::InvalidPacket(_) => "signing.invalid_packet",
            Self::UnsupportedKeyVersion(_) => "signing.unsupported_key_version",
        };
        Some(code)
    }
}
