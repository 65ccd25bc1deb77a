#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Version resolution for provmirror
//!
//! Pass-through namespaces are proxied to the upstream registry. Every
//! other namespace is derived from source-control releases: a release
//! publishes a version when it carries a `SHA256SUMS` listing, and its
//! binary assets name the platforms.

pub mod naming;
mod versions;

pub use naming::{
    archive_filename, shasums_filename, shasums_signature_filename, BinaryAssetName,
    ChecksumListingName, Grammar, NameKind,
};
pub use versions::{Resolution, ResolverSettings, VersionResolver};
