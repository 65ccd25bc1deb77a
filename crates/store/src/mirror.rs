//! One-time materialization of upstream assets

use crate::LocalStore;
use percent_encoding::percent_decode_str;
use provmirror_errors::{Error, NetworkError};
use provmirror_net::{parse_url, NetClient};

/// Keeps byte-identical local copies of upstream assets
///
/// An asset is stored at its decoded upstream URL path and served back under
/// `public_url` joined with the still-encoded path, so the public URL of a
/// mirrored asset depends only on where it came from. The storage route
/// decodes the request path, which lands back on the stored file.
#[derive(Clone, Debug)]
pub struct AssetMirror {
    store: LocalStore,
    net: NetClient,
    public_url: String,
}

impl AssetMirror {
    #[must_use]
    pub fn new(store: LocalStore, net: NetClient, public_url: impl Into<String>) -> Self {
        Self {
            store,
            net,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Public URL of a store path
    #[must_use]
    pub fn public_url_for(&self, path: &str) -> String {
        format!("{}/{}", self.public_url, path.trim_start_matches('/'))
    }

    /// Store path an upstream URL is mirrored to
    ///
    /// Percent-escapes are decoded, so `v1.0.0%2Bent` is stored as
    /// `v1.0.0+ent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `upstream_url` is not a valid URL or its path
    /// does not decode to UTF-8.
    pub fn store_path(upstream_url: &str) -> Result<String, Error> {
        let url = parse_url(upstream_url)?;
        decode_path(url.path())
    }

    /// Make sure `upstream_url` is mirrored and return its public URL
    ///
    /// A file already present in the store is never fetched again.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the upstream does not answer
    /// 200, or the file cannot be written.
    pub async fn ensure_mirrored(&self, upstream_url: &str) -> Result<String, Error> {
        let url = parse_url(upstream_url)?;
        let path = decode_path(url.path())?;
        let public = self.public_url_for(url.path());

        if self.store.exists(&path).await {
            tracing::debug!(path = %path, "asset already mirrored");
            return Ok(public);
        }

        let staging = self.store.staging_path(&path).await?;
        match self.net.download_to_file(upstream_url, &staging).await {
            Ok(size) => {
                self.store.commit(&staging, &path).await?;
                tracing::info!(path = %path, size, "mirrored asset");
                Ok(public)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&staging).await;
                Err(e)
            }
        }
    }
}

fn decode_path(encoded: &str) -> Result<String, Error> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| NetworkError::InvalidUrl(format!("{encoded}: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_joins_cleanly() {
        let mirror = AssetMirror::new(
            LocalStore::new("/srv"),
            NetClient::with_defaults().unwrap(),
            "http://localhost:8181/storage/",
        );
        assert_eq!(
            mirror.public_url_for("/acme/a.zip"),
            "http://localhost:8181/storage/acme/a.zip"
        );
    }

    #[test]
    fn test_store_path_drops_query() {
        assert_eq!(
            AssetMirror::store_path("https://objects.example/12/abc?X-Sig=1").unwrap(),
            "/12/abc"
        );
        assert!(AssetMirror::store_path("not a url").is_err());
    }

    #[test]
    fn test_store_path_decodes_escapes() {
        assert_eq!(
            AssetMirror::store_path("https://objects.example/dl/v1.0.0%2Bent/a%20b.zip").unwrap(),
            "/dl/v1.0.0+ent/a b.zip"
        );
        // %FF is not UTF-8
        assert!(matches!(
            AssetMirror::store_path("https://objects.example/dl/%FF.zip"),
            Err(Error::Network(NetworkError::InvalidUrl(_)))
        ));
    }
}
