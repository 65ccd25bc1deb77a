//! Integration tests for types

#[cfg(test)]
mod tests {
    use provmirror_types::*;

    #[test]
    fn test_upstream_version_listing_decodes() {
        // Shape of a public registry answer, including fields we do not model
        let body = r#"{
            "id": "hashicorp/null",
            "versions": [
                {
                    "version": "3.2.1",
                    "protocols": ["5.0"],
                    "platforms": [
                        {"os": "linux", "arch": "amd64"},
                        {"os": "darwin", "arch": "arm64"}
                    ]
                }
            ],
            "warnings": null
        }"#;

        let listing: VersionListing = serde_json::from_str(body).unwrap();
        assert_eq!(listing.id, "hashicorp/null");
        assert_eq!(listing.versions[0].protocols, vec!["5.0".to_string()]);
        assert_eq!(
            listing.versions[0].platforms[1],
            Platform::new("darwin", "arm64")
        );
        assert_eq!(listing.versions[0].release_id, None);
    }

    #[test]
    fn test_derived_descriptor_wire_shape() {
        let descriptor = DownloadDescriptor {
            protocols: Vec::new(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
            filename: "terraform-provider-widget_1.0.0_linux_amd64.zip".to_string(),
            download_url: "http://mirror/storage/a.zip".to_string(),
            shasums_url: "http://mirror/storage/SHA256SUMS".to_string(),
            shasums_signature_url: "http://mirror/storage/SHA256SUMS.sig".to_string(),
            shasum: "abc123".to_string(),
            signing_keys: SigningKeys {
                gpg_public_keys: vec![GpgPublicKey::new("770D24B28DAEA644", "armor")],
            },
        };

        let json = serde_json::to_value(&descriptor).unwrap();
        assert!(json.get("protocols").is_none());
        assert_eq!(json["signing_keys"]["gpg_public_keys"][0]["key_id"], "770D24B28DAEA644");
        assert_eq!(
            json["signing_keys"]["gpg_public_keys"][0]["source_url"],
            serde_json::Value::Null
        );

        let back: DownloadDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn test_error_response() {
        let json = serde_json::to_value(ErrorResponse::new(404, "unsupported action upload")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": 404, "message": "unsupported action upload"})
        );
    }

    #[test]
    fn test_release_asset_lookup() {
        let release = Release {
            id: 1,
            tag_name: "v1.0.0".to_string(),
            assets: vec![ReleaseAsset {
                id: 2,
                name: "p_1.0.0_SHA256SUMS".to_string(),
                browser_download_url: "https://github.example/p_1.0.0_SHA256SUMS".to_string(),
            }],
        };
        assert_eq!(release.asset("p_1.0.0_SHA256SUMS").map(|a| a.id), Some(2));
        assert!(release.asset("p_1.0.0_SHA256SUMS.sig").is_none());
    }
}
