#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Signing-key provisioning for provmirror
//!
//! Download descriptors must carry the provider's ASCII-armored public key
//! and its key id. Keys are fetched once from the upstream registry's native
//! download endpoint, stored under `gpg/<namespace>/<type>/ascii_armor`, and
//! reused from disk afterwards. Signatures are never verified here.

pub mod armor;
pub mod packet;

use provmirror_errors::{Error, SigningError};
use provmirror_net::{fetch_json, NetClient};
use provmirror_store::{gpg_key_path, LocalStore};
use provmirror_types::DownloadDescriptor;

const PUBLIC_KEY_LABEL: &str = "PGP PUBLIC KEY BLOCK";

/// A stored key and its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedKey {
    pub ascii_armor: String,
    pub key_id: String,
}

/// Key id of the first public key in an armored block
///
/// # Errors
///
/// Returns an error if the text is not an armored public key block or its
/// first packet is not a supported public key.
pub fn key_id_from_armor(text: &str) -> Result<String, Error> {
    let armored = armor::decode(text)?;
    if armored.label != PUBLIC_KEY_LABEL {
        return Err(SigningError::NotPublicKey {
            block: armored.label,
        }
        .into());
    }
    let packet = packet::first_packet(&armored.data)?;
    packet::key_id(&packet)
}

/// Ensures a provider's public key is on disk
#[derive(Clone, Debug)]
pub struct KeyProvisioner {
    store: LocalStore,
    net: NetClient,
    registry_url: String,
}

impl KeyProvisioner {
    #[must_use]
    pub fn new(store: LocalStore, net: NetClient, registry_url: impl Into<String>) -> Self {
        Self {
            store,
            net,
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Return the provider's armored key and key id, fetching it on first use
    ///
    /// `request_path` is the download request path as received; the key is
    /// taken from the upstream registry's answer to that same path.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream fetch fails, the answer carries no
    /// key, or the stored key cannot be parsed.
    pub async fn public_key(
        &self,
        namespace: &str,
        provider_type: &str,
        request_path: &str,
    ) -> Result<ProvisionedKey, Error> {
        let path = gpg_key_path(namespace, provider_type);

        if !self.store.exists(&path).await {
            let url = format!("{}{request_path}", self.registry_url);
            let descriptor: DownloadDescriptor = fetch_json(&self.net, &url).await?;
            let key = descriptor
                .signing_keys
                .gpg_public_keys
                .into_iter()
                .next()
                .ok_or(SigningError::NoKeys)?;

            self.store.write(&path, key.ascii_armor.as_bytes()).await?;
            tracing::info!(namespace, provider_type, key_id = %key.key_id, "provisioned signing key");
        }

        let ascii_armor = self.store.read_to_string(&path).await?;
        let key_id = key_id_from_armor(&ascii_armor)?;
        Ok(ProvisionedKey {
            ascii_armor,
            key_id,
        })
    }
}
