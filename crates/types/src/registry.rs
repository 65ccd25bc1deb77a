//! Provider registry protocol types

use serde::{Deserialize, Serialize};

/// An operating system / architecture pair a provider is built for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }
}

/// A published provider version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    /// Id of the release this version was derived from
    #[serde(skip)]
    pub release_id: Option<u64>,
}

impl Version {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            protocols: Vec::new(),
            platforms: Vec::new(),
            release_id: None,
        }
    }
}

/// Response of the `versions` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionListing {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default)]
    pub warnings: Option<serde_json::Value>,
}

impl VersionListing {
    /// Build a listing with the `namespace/type` id
    #[must_use]
    pub fn new(namespace: &str, provider_type: &str, versions: Vec<Version>) -> Self {
        Self {
            id: format!("{namespace}/{provider_type}"),
            versions,
            warnings: None,
        }
    }
}

/// A GPG public key in registry wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpgPublicKey {
    pub key_id: String,
    pub ascii_armor: String,
    #[serde(default)]
    pub trust_signature: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl GpgPublicKey {
    pub fn new(key_id: impl Into<String>, ascii_armor: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            ascii_armor: ascii_armor.into(),
            trust_signature: String::new(),
            source: String::new(),
            source_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKeys {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpg_public_keys: Vec<GpgPublicKey>,
}

/// Response of the `download` action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDescriptor {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub shasums_url: String,
    #[serde(default)]
    pub shasums_signature_url: String,
    #[serde(default)]
    pub shasum: String,
    #[serde(default)]
    pub signing_keys: SigningKeys,
}

/// Uniform error envelope for client-visible failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Service discovery document served under `/.well-known/terraform.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    #[serde(rename = "providers.v1")]
    pub providers_v1: String,
}

impl Default for DiscoveryDocument {
    fn default() -> Self {
        Self {
            providers_v1: "/v1/providers/".to_string(),
        }
    }
}

/// A parsed `<version>/<action>/<os>/<arch>` request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub version: String,
    pub action: String,
    pub os: String,
    pub arch: String,
}
