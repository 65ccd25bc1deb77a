//! Version discovery

use crate::naming::Grammar;
use provmirror_cache::keys::{releases_key, versions_key};
use provmirror_cache::{Cache, CacheExt, SingleFlight};
use provmirror_config::Config;
use provmirror_errors::Error;
use provmirror_github::ReleaseSource;
use provmirror_net::{fetch_json, NetClient};
use provmirror_types::{Release, Version, VersionListing};
use std::sync::Arc;
use std::time::Duration;

/// Versions of a provider, plus the releases they were derived from
///
/// `releases` is empty when the versions came from the cache or from the
/// pass-through registry.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub versions: Vec<Version>,
    pub releases: Vec<Release>,
}

/// Settings the resolver takes from the configuration
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub registry_url: String,
    pub passthrough_namespace: String,
    pub provider_repo_prefix: String,
    pub versions_ttl: Duration,
    pub releases_ttl: Duration,
}

impl From<&Config> for ResolverSettings {
    fn from(config: &Config) -> Self {
        Self {
            registry_url: config.upstream.registry_url.trim_end_matches('/').to_string(),
            passthrough_namespace: config.upstream.passthrough_namespace.clone(),
            provider_repo_prefix: config.upstream.provider_repo_prefix.clone(),
            versions_ttl: config.cache.versions_ttl(),
            releases_ttl: config.cache.releases_ttl(),
        }
    }
}

/// Answers "which versions exist" for a namespace and provider type
#[derive(Clone)]
pub struct VersionResolver {
    cache: Arc<dyn Cache>,
    flights: SingleFlight,
    source: Arc<dyn ReleaseSource>,
    net: NetClient,
    grammar: Arc<Grammar>,
    settings: ResolverSettings,
}

impl VersionResolver {
    #[must_use]
    pub fn new(
        cache: Arc<dyn Cache>,
        flights: SingleFlight,
        source: Arc<dyn ReleaseSource>,
        net: NetClient,
        grammar: Arc<Grammar>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            cache,
            flights,
            source,
            net,
            grammar,
            settings,
        }
    }

    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    #[must_use]
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Whether `namespace` is proxied to the upstream registry
    #[must_use]
    pub fn is_passthrough(&self, namespace: &str) -> bool {
        namespace == self.settings.passthrough_namespace
    }

    /// Source repository name of a provider type
    #[must_use]
    pub fn provider_repo(&self, provider_type: &str) -> String {
        format!("{}{provider_type}", self.settings.provider_repo_prefix)
    }

    /// Store `value` without failing the request when the cache is unwritable
    async fn remember<T: serde::Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = self.cache.set(key, value, ttl).await {
            tracing::warn!(key, error = %e, "failed to write cache entry");
        }
    }

    /// Resolve the versions of `namespace/provider_type`
    ///
    /// `url_path` is the versions request path as received and is forwarded
    /// unchanged for pass-through namespaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream registry or the release source fails.
    /// Failures are never cached.
    pub async fn resolve(
        &self,
        namespace: &str,
        provider_type: &str,
        url_path: &str,
    ) -> Result<Resolution, Error> {
        let key = versions_key(namespace, provider_type);

        if let Some(versions) = self.cached_versions(&key).await {
            return Ok(Resolution {
                versions,
                releases: Vec::new(),
            });
        }

        let _flight = self.flights.acquire(&key).await;
        if let Some(versions) = self.cached_versions(&key).await {
            return Ok(Resolution {
                versions,
                releases: Vec::new(),
            });
        }

        let resolution = if self.is_passthrough(namespace) {
            let url = format!("{}{url_path}", self.settings.registry_url);
            let listing: VersionListing = fetch_json(&self.net, &url).await?;
            Resolution {
                versions: listing.versions,
                releases: Vec::new(),
            }
        } else {
            let releases = self.releases(namespace, provider_type).await?;
            let versions = releases
                .iter()
                .filter_map(|release| self.grammar.scan_release(release))
                .collect();
            Resolution { versions, releases }
        };

        tracing::debug!(
            namespace,
            provider_type,
            versions = resolution.versions.len(),
            "resolved versions"
        );
        self.remember(&key, &resolution.versions, self.settings.versions_ttl)
            .await;
        Ok(resolution)
    }

    /// An empty cached listing is treated as a miss
    async fn cached_versions(&self, key: &str) -> Option<Vec<Version>> {
        let versions = self
            .cache
            .get::<Vec<Version>>(key)
            .await
            .filter(|versions| !versions.is_empty());
        if versions.is_some() {
            tracing::debug!(key, "version listing cache hit");
        }
        versions
    }

    /// Release listing of the provider's source repository, cached
    ///
    /// # Errors
    ///
    /// Returns an error if the release source fails.
    pub async fn releases(
        &self,
        namespace: &str,
        provider_type: &str,
    ) -> Result<Vec<Release>, Error> {
        let key = releases_key(namespace, provider_type);

        if let Some(releases) = self.cache.get::<Vec<Release>>(&key).await {
            tracing::debug!(key = %key, "release listing cache hit");
            return Ok(releases);
        }

        let _flight = self.flights.acquire(&key).await;
        if let Some(releases) = self.cache.get::<Vec<Release>>(&key).await {
            return Ok(releases);
        }

        let repo = self.provider_repo(provider_type);
        let releases = self.source.list_releases(namespace, &repo).await?;
        self.remember(&key, &releases, self.settings.releases_ttl)
            .await;
        Ok(releases)
    }

    /// Version listing document for `namespace/provider_type`
    ///
    /// # Errors
    ///
    /// Same as [`VersionResolver::resolve`].
    pub async fn listing(
        &self,
        namespace: &str,
        provider_type: &str,
        url_path: &str,
    ) -> Result<VersionListing, Error> {
        let resolution = self.resolve(namespace, provider_type, url_path).await?;
        Ok(VersionListing::new(
            namespace,
            provider_type,
            resolution.versions,
        ))
    }
}

impl std::fmt::Debug for VersionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionResolver")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
