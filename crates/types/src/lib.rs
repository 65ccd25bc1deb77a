#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the provmirror registry mirror
//!
//! This crate provides the wire types of the provider registry protocol
//! (version listings, download descriptors, signing keys) together with the
//! release listing types produced by the source-control client.

pub mod registry;
pub mod release;

pub use registry::{
    ActionRequest, DiscoveryDocument, DownloadDescriptor, ErrorResponse, GpgPublicKey, Platform,
    SigningKeys, Version, VersionListing,
};
pub use release::{Release, ReleaseAsset};

/// Action name of the only supported provider action
pub const DOWNLOAD_ACTION: &str = "download";
