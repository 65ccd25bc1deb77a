//! Canonical cache keys
//!
//! Version listings and release listings are cached separately per
//! namespace and provider type; download descriptors per target.

/// Key of the derived (or proxied) version listing
#[must_use]
pub fn versions_key(namespace: &str, provider_type: &str) -> String {
    format!("{namespace}-{provider_type}-versions")
}

/// Key of the raw release listing from the source-control API
#[must_use]
pub fn releases_key(namespace: &str, provider_type: &str) -> String {
    format!("{namespace}-{provider_type}-releases")
}

/// Key of an assembled download descriptor
#[must_use]
pub fn download_key(namespace: &str, provider: &str, version: &str, os: &str, arch: &str) -> String {
    format!("{namespace}-{provider}-{version}-{os}-{arch}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_do_not_collide() {
        assert_ne!(versions_key("acme", "widget"), releases_key("acme", "widget"));
        assert_eq!(
            download_key("acme", "terraform-provider-widget", "1.0.0", "linux", "amd64"),
            "acme-terraform-provider-widget-1.0.0-linux-amd64"
        );
    }
}
