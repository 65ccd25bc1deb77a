//! GitHub REST implementation of [`ReleaseSource`]

use crate::ReleaseSource;
use async_trait::async_trait;
use provmirror_config::Config;
use provmirror_errors::{Error, NetworkError, ResolveError};
use provmirror_net::NetClient;
use provmirror_types::{Release, ReleaseAsset};
use reqwest::header::{ACCEPT, AUTHORIZATION, LOCATION};
use reqwest::{RequestBuilder, Response, StatusCode};

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const OCTET_STREAM: &str = "application/octet-stream";

/// GitHub API client
///
/// With a token, requests are authenticated and asset URLs are resolved to
/// short-lived signed URLs through the assets endpoint. Without one, the
/// public browser download URL of each asset is used.
#[derive(Clone)]
pub struct GithubClient {
    net: NetClient,
    api_url: String,
    token: Option<String>,
    page_size: u32,
    max_pages: u32,
}

impl GithubClient {
    #[must_use]
    pub fn new(net: NetClient, api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            net,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            page_size: 100,
            max_pages: 10,
        }
    }

    /// Build from the `[upstream]` section and the token picked up from the environment
    #[must_use]
    pub fn from_config(net: NetClient, config: &Config) -> Self {
        Self::new(net, &config.upstream.github_api_url, config.github_token.clone())
            .with_paging(config.upstream.release_page_size, config.upstream.release_max_pages)
    }

    /// Page size and page limit for release listings
    #[must_use]
    pub fn with_paging(mut self, page_size: u32, max_pages: u32) -> Self {
        self.page_size = page_size.max(1);
        self.max_pages = max_pages.max(1);
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(API_VERSION_HEADER, API_VERSION);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    /// Map an unsuccessful listing response to an error
    fn listing_error(response: &Response, owner: &str, repo: &str) -> Error {
        let status = response.status();
        let exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .is_some_and(|v| v.as_bytes() == b"0");

        if status == StatusCode::FORBIDDEN && exhausted {
            let reset = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or_default();
            let seconds = reset.saturating_sub(chrono::Utc::now().timestamp()).max(0);
            return NetworkError::RateLimited {
                seconds: seconds.unsigned_abs(),
            }
            .into();
        }

        ResolveError::ReleaseListing {
            owner: owner.to_string(),
            repo: repo.to_string(),
            message: format!("HTTP {status}"),
        }
        .into()
    }
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_url", &self.api_url)
            .field("authenticated", &self.token.is_some())
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReleaseSource for GithubClient {
    async fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>, Error> {
        let mut releases = Vec::new();

        for page in 1..=self.max_pages {
            let url = format!(
                "{}/repos/{owner}/{repo}/releases?per_page={}&page={page}",
                self.api_url, self.page_size
            );
            let response = self
                .net
                .send_with(|http| self.authorize(http.get(&url)).header(ACCEPT, JSON_MEDIA_TYPE))
                .await?;

            if response.status() != StatusCode::OK {
                return Err(Self::listing_error(&response, owner, repo));
            }

            let batch: Vec<Release> =
                response
                    .json()
                    .await
                    .map_err(|e| ResolveError::ReleaseListing {
                        owner: owner.to_string(),
                        repo: repo.to_string(),
                        message: e.to_string(),
                    })?;

            let short_page = batch.len() < self.page_size as usize;
            releases.extend(batch);
            if short_page {
                break;
            }
        }

        tracing::debug!(owner, repo, count = releases.len(), "listed releases");
        Ok(releases)
    }

    async fn download_url(
        &self,
        owner: &str,
        repo: &str,
        asset: &ReleaseAsset,
    ) -> Result<String, Error> {
        if self.token.is_none() {
            return Ok(asset.browser_download_url.clone());
        }

        let url = format!(
            "{}/repos/{owner}/{repo}/releases/assets/{}",
            self.api_url, asset.id
        );
        let response = self
            .net
            .send_direct_with(|http| self.authorize(http.get(&url)).header(ACCEPT, OCTET_STREAM))
            .await
            .map_err(|e| ResolveError::AssetUrl {
                name: asset.name.clone(),
                message: e.to_string(),
            })?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|_| response.status().is_redirection());

        if let Some(location) = location {
            return Ok(location.to_string());
        }

        // Served inline instead of redirected; the public URL still works for public repos
        tracing::warn!(
            asset = %asset.name,
            status = %response.status(),
            "asset endpoint did not redirect, using browser download url"
        );
        Ok(asset.browser_download_url.clone())
    }

    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
