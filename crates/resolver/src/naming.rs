//! Filename grammar for release assets and action paths
//!
//! Everything the mirror knows about a release comes from asset file names.
//! The grammar is an ordered list of `(kind, pattern)` rules; rules of the
//! same kind are tried in insertion order and the first match wins.

use provmirror_errors::{Error, ResolveError};
use provmirror_types::{ActionRequest, Platform, Release, ReleaseAsset, Version};
use regex::{Captures, Regex};
use std::fmt;

const CHECKSUM_LISTING_PATTERN: &str = r"^(?P<provider>[^_]+)_(?P<version>[^_]+)_SHA256SUMS";
const BINARY_ASSET_PATTERN: &str =
    r"^(?P<provider>[^_]+)_(?P<version>[^_]+)_(?P<os>\w+)_(?P<arch>\w+)";
const ACTION_PATH_PATTERN: &str =
    r"^(?P<version>[^/]+)/(?P<action>[^/]+)/(?P<os>[^/]+)/(?P<arch>\w+)";

/// What a rule recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    ChecksumListing,
    BinaryAsset,
    ActionPath,
}

impl NameKind {
    /// Named captures a pattern of this kind must define
    #[must_use]
    pub fn required_captures(self) -> &'static [&'static str] {
        match self {
            Self::ChecksumListing => &["provider", "version"],
            Self::BinaryAsset => &["provider", "version", "os", "arch"],
            Self::ActionPath => &["version", "action", "os", "arch"],
        }
    }
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChecksumListing => "checksum listing",
            Self::BinaryAsset => "binary asset",
            Self::ActionPath => "action path",
        };
        f.write_str(name)
    }
}

/// `<provider>_<version>_SHA256SUMS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumListingName {
    pub provider: String,
    pub version: String,
}

/// `<provider>_<version>_<os>_<arch>[.ext]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryAssetName {
    pub provider: String,
    pub version: String,
    pub os: String,
    pub arch: String,
}

#[derive(Debug, Clone)]
struct Rule {
    kind: NameKind,
    regex: Regex,
}

/// Ordered set of filename recognizers
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    rules: Vec<Rule>,
}

fn field(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

impl Grammar {
    /// A grammar with no rules
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The release naming convention used by Terraform providers
    ///
    /// # Errors
    ///
    /// Never fails in practice; built-in patterns go through the same
    /// validation as user-supplied ones.
    pub fn standard() -> Result<Self, Error> {
        Self::empty()
            .with_rule(NameKind::ChecksumListing, CHECKSUM_LISTING_PATTERN)?
            .with_rule(NameKind::BinaryAsset, BINARY_ASSET_PATTERN)?
            .with_rule(NameKind::ActionPath, ACTION_PATH_PATTERN)
    }

    /// Append a rule, checking the pattern compiles and defines every capture
    /// its kind requires
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidPattern`] or
    /// [`ResolveError::MissingCapture`].
    pub fn with_rule(mut self, kind: NameKind, pattern: &str) -> Result<Self, Error> {
        let regex = Regex::new(pattern).map_err(|e| ResolveError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if let Some(missing) = kind
            .required_captures()
            .iter()
            .find(|required| !names.contains(*required))
        {
            return Err(ResolveError::MissingCapture {
                pattern: pattern.to_string(),
                field: (*missing).to_string(),
            }
            .into());
        }

        self.rules.push(Rule { kind, regex });
        Ok(self)
    }

    fn first_match<'t>(&self, kind: NameKind, text: &'t str) -> Option<Captures<'t>> {
        self.rules
            .iter()
            .filter(|rule| rule.kind == kind)
            .find_map(|rule| rule.regex.captures(text))
    }

    /// Recognize a checksum listing asset name
    #[must_use]
    pub fn checksum_listing(&self, name: &str) -> Option<ChecksumListingName> {
        let caps = self.first_match(NameKind::ChecksumListing, name)?;
        Some(ChecksumListingName {
            provider: field(&caps, "provider"),
            version: field(&caps, "version"),
        })
    }

    /// Recognize a platform binary asset name; any extension is ignored
    #[must_use]
    pub fn binary_asset(&self, name: &str) -> Option<BinaryAssetName> {
        let caps = self.first_match(NameKind::BinaryAsset, name)?;
        Some(BinaryAssetName {
            provider: field(&caps, "provider"),
            version: field(&caps, "version"),
            os: field(&caps, "os"),
            arch: field(&caps, "arch"),
        })
    }

    /// Parse the `<version>/<action>/<os>/<arch>` tail of a provider request
    #[must_use]
    pub fn action_path(&self, path: &str) -> Option<ActionRequest> {
        let caps = self.first_match(NameKind::ActionPath, path)?;
        Some(ActionRequest {
            version: field(&caps, "version"),
            action: field(&caps, "action"),
            os: field(&caps, "os"),
            arch: field(&caps, "arch"),
        })
    }

    /// Distinct platforms of the binary assets, in first-seen order
    #[must_use]
    pub fn collect_platforms(&self, assets: &[ReleaseAsset]) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = Vec::new();
        for asset in assets {
            if let Some(binary) = self.binary_asset(&asset.name) {
                let platform = Platform::new(binary.os, binary.arch);
                if !platforms.contains(&platform) {
                    platforms.push(platform);
                }
            }
        }
        platforms
    }

    /// The version a release publishes, if it carries a checksum listing
    #[must_use]
    pub fn scan_release(&self, release: &Release) -> Option<Version> {
        let listing = release
            .assets
            .iter()
            .find_map(|asset| self.checksum_listing(&asset.name))?;

        let mut version = Version::new(listing.version);
        version.platforms = self.collect_platforms(&release.assets);
        version.release_id = Some(release.id);
        Some(version)
    }

    /// First release whose checksum listing names `version`
    #[must_use]
    pub fn release_for_version<'r>(&self, releases: &'r [Release], version: &str) -> Option<&'r Release> {
        releases.iter().find(|release| {
            release.assets.iter().any(|asset| {
                self.checksum_listing(&asset.name)
                    .is_some_and(|listing| listing.version == version)
            })
        })
    }
}

/// `<provider>_<version>_<os>_<arch>.zip`
#[must_use]
pub fn archive_filename(provider: &str, version: &str, os: &str, arch: &str) -> String {
    format!("{provider}_{version}_{os}_{arch}.zip")
}

/// `<provider>_<version>_SHA256SUMS`
#[must_use]
pub fn shasums_filename(provider: &str, version: &str) -> String {
    format!("{provider}_{version}_SHA256SUMS")
}

/// `<provider>_<version>_SHA256SUMS.sig`
#[must_use]
pub fn shasums_signature_filename(provider: &str, version: &str) -> String {
    format!("{}.sig", shasums_filename(provider, version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn asset(id: u64, name: &str) -> ReleaseAsset {
        ReleaseAsset {
            id,
            name: name.to_string(),
            browser_download_url: format!("https://github.example/{name}"),
        }
    }

    #[test]
    fn test_checksum_listing() {
        let grammar = Grammar::standard().unwrap();
        assert_eq!(
            grammar.checksum_listing("terraform-provider-widget_1.2.0_SHA256SUMS"),
            Some(ChecksumListingName {
                provider: "terraform-provider-widget".to_string(),
                version: "1.2.0".to_string(),
            })
        );
        // The signature file is also recognized by prefix
        assert!(grammar
            .checksum_listing("terraform-provider-widget_1.2.0_SHA256SUMS.sig")
            .is_some());
        assert!(grammar
            .checksum_listing("terraform-provider-widget_1.2.0_linux_amd64.zip")
            .is_none());
    }

    #[test]
    fn test_binary_asset() {
        let grammar = Grammar::standard().unwrap();
        let binary = grammar.binary_asset("p_1.0.0_linux_amd64.zip").unwrap();
        assert_eq!((binary.os.as_str(), binary.arch.as_str()), ("linux", "amd64"));
        assert!(grammar.binary_asset("p_1.0.0_SHA256SUMS").is_none());
        assert!(grammar.binary_asset("p_1.0.0_SHA256SUMS.sig").is_none());
    }

    #[test]
    fn test_action_path() {
        let grammar = Grammar::standard().unwrap();
        assert_eq!(
            grammar.action_path("1.0.0/download/linux/amd64"),
            Some(ActionRequest {
                version: "1.0.0".to_string(),
                action: "download".to_string(),
                os: "linux".to_string(),
                arch: "amd64".to_string(),
            })
        );
        assert!(grammar.action_path("1.0.0/download/linux").is_none());
        assert!(grammar.action_path("versions").is_none());
    }

    #[test]
    fn test_collect_platforms_dedupes_in_order() {
        let grammar = Grammar::standard().unwrap();
        let assets = vec![
            asset(1, "p_1.0.0_linux_amd64.zip"),
            asset(2, "p_1.0.0_SHA256SUMS"),
            asset(3, "p_1.0.0_darwin_arm64.zip"),
            asset(4, "p_1.0.0_linux_amd64.tar.gz"),
        ];
        assert_eq!(
            grammar.collect_platforms(&assets),
            vec![Platform::new("linux", "amd64"), Platform::new("darwin", "arm64")]
        );
    }

    #[test]
    fn test_scan_release_requires_listing() {
        let grammar = Grammar::standard().unwrap();
        let without = Release {
            id: 7,
            tag_name: "v1.0.0".to_string(),
            assets: vec![asset(1, "p_1.0.0_linux_amd64.zip")],
        };
        assert!(grammar.scan_release(&without).is_none());

        let with = Release {
            id: 8,
            tag_name: "v1.0.0".to_string(),
            assets: vec![
                asset(1, "p_1.0.0_linux_amd64.zip"),
                asset(2, "p_1.0.0_SHA256SUMS"),
            ],
        };
        let version = grammar.scan_release(&with).unwrap();
        assert_eq!(version.version, "1.0.0");
        assert_eq!(version.release_id, Some(8));
        assert_eq!(version.platforms, vec![Platform::new("linux", "amd64")]);
    }

    #[test]
    fn test_rule_validation() {
        assert!(matches!(
            Grammar::empty().with_rule(NameKind::BinaryAsset, r"^(?P<os>\w+)"),
            Err(Error::Resolve(ResolveError::MissingCapture { ref field, .. })) if field == "provider"
        ));
        assert!(matches!(
            Grammar::empty().with_rule(NameKind::ChecksumListing, r"(unclosed"),
            Err(Error::Resolve(ResolveError::InvalidPattern { .. }))
        ));
    }

    #[test]
    fn test_rules_tried_in_order() {
        // A custom listing name shape ahead of the standard one
        let grammar = Grammar::empty()
            .with_rule(
                NameKind::ChecksumListing,
                r"^(?P<provider>[^_]+)-(?P<version>\d[^_]*)-checksums\.txt$",
            )
            .unwrap()
            .with_rule(NameKind::ChecksumListing, CHECKSUM_LISTING_PATTERN)
            .unwrap();

        assert_eq!(
            grammar.checksum_listing("widget-2.0.0-checksums.txt").unwrap().version,
            "2.0.0"
        );
        assert_eq!(
            grammar.checksum_listing("widget_2.0.0_SHA256SUMS").unwrap().version,
            "2.0.0"
        );
    }

    #[test]
    fn test_filenames() {
        assert_eq!(
            archive_filename("terraform-provider-widget", "1.0.0", "linux", "amd64"),
            "terraform-provider-widget_1.0.0_linux_amd64.zip"
        );
        assert_eq!(
            shasums_signature_filename("terraform-provider-widget", "1.0.0"),
            "terraform-provider-widget_1.0.0_SHA256SUMS.sig"
        );
    }

    proptest! {
        #[test]
        fn prop_checksum_listing_recovers_parts(
            provider in "[a-z][a-z0-9-]{0,20}",
            version in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}(-[a-z0-9.]{1,8})?",
        ) {
            let grammar = Grammar::standard().unwrap();
            let parsed = grammar
                .checksum_listing(&shasums_filename(&provider, &version))
                .unwrap();
            prop_assert_eq!(parsed.provider, provider);
            prop_assert_eq!(parsed.version, version);
        }

        #[test]
        fn prop_binary_asset_ignores_extension(
            os in "[a-z][a-z0-9]{0,9}",
            arch in "[a-z][a-z0-9]{0,9}",
            ext in "(\\.zip|\\.tar\\.gz|\\.exe)?",
        ) {
            let grammar = Grammar::standard().unwrap();
            let name = format!("terraform-provider-widget_1.0.0_{os}_{arch}{ext}");
            let parsed = grammar.binary_asset(&name).unwrap();
            prop_assert_eq!(parsed.os, os);
            prop_assert_eq!(parsed.arch, arch);
        }
    }
}
