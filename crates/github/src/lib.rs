#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Source-control release listings for provmirror
//!
//! Derived namespaces are answered from the releases of
//! `<namespace>/<prefix><type>` repositories. [`ReleaseSource`] is the seam
//! the resolver and action engine talk to; [`GithubClient`] implements it
//! against the GitHub REST API.

mod client;

pub use client::GithubClient;

use async_trait::async_trait;
use provmirror_errors::Error;
use provmirror_types::{Release, ReleaseAsset};

/// Anything that can list releases with their assets
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// All releases of `owner/repo`, newest first as the API returns them
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched or decoded.
    async fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>, Error>;

    /// URL a client can download `asset` from
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be resolved.
    async fn download_url(&self, owner: &str, repo: &str, asset: &ReleaseAsset)
        -> Result<String, Error>;

    /// Whether requests carry credentials
    fn is_authenticated(&self) -> bool;
}
