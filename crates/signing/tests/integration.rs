//! Integration tests for signing crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use provmirror_errors::{Error, NetworkError, SigningError};
    use provmirror_net::NetClient;
    use provmirror_signing::*;
    use provmirror_store::LocalStore;
    use serde_json::json;
    use tempfile::tempdir;

    const ED25519: &str = include_str!("fixtures/acme-ed25519.asc");
    const RSA: &str = include_str!("fixtures/acme-rsa.asc");
    const NOT_PUBLIC: &str = include_str!("fixtures/not-public.asc");
    const V6: &str = include_str!("fixtures/rfc9580-v6-ed25519.asc");

    const REQUEST_PATH: &str = "/v1/providers/acme/widget/1.0.0/download/linux/amd64";

    fn descriptor(armor: &str) -> serde_json::Value {
        json!({
            "protocols": ["5.0"],
            "os": "linux",
            "arch": "amd64",
            "filename": "terraform-provider-widget_1.0.0_linux_amd64.zip",
            "download_url": "https://releases.example/widget.zip",
            "shasums_url": "https://releases.example/SHA256SUMS",
            "shasums_signature_url": "https://releases.example/SHA256SUMS.sig",
            "shasum": "abc",
            "signing_keys": {
                "gpg_public_keys": [{
                    "key_id": "770D24B28DAEA644",
                    "ascii_armor": armor,
                    "trust_signature": "",
                    "source": "Acme",
                    "source_url": null
                }]
            }
        })
    }

    #[test]
    fn test_key_ids_of_exported_keys() {
        assert_eq!(key_id_from_armor(ED25519).unwrap(), "770D24B28DAEA644");
        assert_eq!(key_id_from_armor(RSA).unwrap(), "DA0E06AFCE409807");
    }

    #[test]
    fn test_v6_key_id_is_fingerprint_prefix() {
        // Sample v6 certificate from RFC 9580 appendix A.3, armored without a CRC line;
        // fingerprint CB186C4F0609A697E4D52DFA6C722B0C1F1E27C18A56708F6525EC27BAD9ACC9
        assert_eq!(key_id_from_armor(V6).unwrap(), "CB186C4F0609A697");
    }

    #[test]
    fn test_wrong_block_type() {
        let error = key_id_from_armor(NOT_PUBLIC).unwrap_err();
        assert!(matches!(
            error,
            Error::Signing(SigningError::NotPublicKey { ref block }) if block == "PGP PRIVATE KEY BLOCK"
        ));
    }

    #[test]
    fn test_tampered_body_fails_checksum() {
        let tampered = ED25519.replacen("mDMEat", "mDMEbt", 1);
        assert!(matches!(
            key_id_from_armor(&tampered),
            Err(Error::Signing(SigningError::InvalidArmor(_)))
        ));
    }

    #[tokio::test]
    async fn test_provision_fetches_once() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path(REQUEST_PATH);
            then.status(200).json_body(descriptor(ED25519));
        });

        let temp = tempdir().unwrap();
        let store = LocalStore::new(temp.path());
        let provisioner = KeyProvisioner::new(
            store.clone(),
            NetClient::with_defaults().unwrap(),
            server.base_url(),
        );

        let first = provisioner
            .public_key("acme", "widget", REQUEST_PATH)
            .await
            .unwrap();
        let second = provisioner
            .public_key("acme", "widget", REQUEST_PATH)
            .await
            .unwrap();

        mock.assert_hits(1);
        assert_eq!(first, second);
        assert_eq!(first.key_id, "770D24B28DAEA644");
        assert_eq!(first.ascii_armor, ED25519);
        assert_eq!(
            store.read_to_string("gpg/acme/widget/ascii_armor").await.unwrap(),
            ED25519
        );
    }

    #[tokio::test]
    async fn test_stored_key_is_used_without_upstream() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.any_request();
            then.status(500);
        });

        let temp = tempdir().unwrap();
        let store = LocalStore::new(temp.path());
        store
            .write("gpg/acme/widget/ascii_armor", RSA.as_bytes())
            .await
            .unwrap();

        let provisioner =
            KeyProvisioner::new(store, NetClient::with_defaults().unwrap(), server.base_url());
        let key = provisioner
            .public_key("acme", "widget", REQUEST_PATH)
            .await
            .unwrap();

        mock.assert_hits(0);
        assert_eq!(key.key_id, "DA0E06AFCE409807");
    }

    #[tokio::test]
    async fn test_upstream_without_keys() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(REQUEST_PATH);
            then.status(200)
                .json_body(json!({"os": "linux", "arch": "amd64", "signing_keys": {}}));
        });

        let temp = tempdir().unwrap();
        let store = LocalStore::new(temp.path());
        let provisioner = KeyProvisioner::new(
            store.clone(),
            NetClient::with_defaults().unwrap(),
            server.base_url(),
        );

        let error = provisioner
            .public_key("acme", "widget", REQUEST_PATH)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Signing(SigningError::NoKeys)));
        assert!(!store.exists("gpg/acme/widget/ascii_armor").await);
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path(REQUEST_PATH);
            then.status(404);
        });

        let temp = tempdir().unwrap();
        let provisioner = KeyProvisioner::new(
            LocalStore::new(temp.path()),
            NetClient::with_defaults().unwrap(),
            server.base_url(),
        );

        let error = provisioner
            .public_key("acme", "widget", REQUEST_PATH)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            Error::Network(NetworkError::NotFound { .. })
        ));
    }
}
