//! Registry context for dependency injection

use provmirror_cache::{Cache, FileCache, MemoryCache, SingleFlight};
use provmirror_config::{CacheBackend, Config};
use provmirror_errors::Error;
use provmirror_github::{GithubClient, ReleaseSource};
use provmirror_net::{NetClient, NetConfig};
use provmirror_resolver::{Grammar, ResolverSettings, VersionResolver};
use provmirror_signing::KeyProvisioner;
use provmirror_store::{AssetMirror, LocalStore};
use std::sync::Arc;

/// Everything a registry request needs, shared across requests
pub struct RegistryCtx {
    /// System configuration
    pub config: Config,
    /// Network client
    pub net: NetClient,
    /// Cache in front of every upstream call
    pub cache: Arc<dyn Cache>,
    /// Per-key request collapsing shared by all cache fills
    pub flights: SingleFlight,
    /// Release listings and asset URLs
    pub source: Arc<dyn ReleaseSource>,
    pub grammar: Arc<Grammar>,
    pub resolver: VersionResolver,
    pub mirror: AssetMirror,
    pub keys: KeyProvisioner,
}

impl RegistryCtx {
    // No public constructor - use RegistryContextBuilder instead

    /// Build a context with every component derived from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: Config) -> Result<Self, Error> {
        RegistryContextBuilder::new().with_config(config).build()
    }

    /// Local store holding mirrored assets and keys
    #[must_use]
    pub fn store(&self) -> &LocalStore {
        self.mirror.store()
    }

    /// Whether release lookups carry a source-control token
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.source.is_authenticated()
    }
}

impl std::fmt::Debug for RegistryCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCtx")
            .field("resolver", &self.resolver)
            .field("mirror", &self.mirror)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RegistryCtx`]
///
/// Only the configuration is required; the network client, cache and
/// release source default to what the configuration describes.
#[derive(Default)]
pub struct RegistryContextBuilder {
    config: Option<Config>,
    net: Option<NetClient>,
    cache: Option<Arc<dyn Cache>>,
    source: Option<Arc<dyn ReleaseSource>>,
}

impl RegistryContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set network client
    #[must_use]
    pub fn with_net(mut self, net: NetClient) -> Self {
        self.net = Some(net);
        self
    }

    /// Set cache
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set release source
    #[must_use]
    pub fn with_release_source(mut self, source: Arc<dyn ReleaseSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is missing or the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<RegistryCtx, Error> {
        let config = self
            .config
            .ok_or_else(|| Error::internal("missing component: config"))?;

        let net = match self.net {
            Some(net) => net,
            None => NetClient::new(NetConfig::from(&config.network))?,
        };

        let cache = self.cache.unwrap_or_else(|| match config.storage.cache_backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::File => Arc::new(FileCache::new(config.cache_path())),
        });

        let source = self
            .source
            .unwrap_or_else(|| Arc::new(GithubClient::from_config(net.clone(), &config)));

        let grammar = Arc::new(Grammar::standard()?);
        let flights = SingleFlight::new();
        let store = LocalStore::new(&config.storage.root);

        let resolver = VersionResolver::new(
            Arc::clone(&cache),
            flights.clone(),
            Arc::clone(&source),
            net.clone(),
            Arc::clone(&grammar),
            ResolverSettings::from(&config),
        );
        let mirror = AssetMirror::new(store.clone(), net.clone(), &config.server.public_url);
        let keys = KeyProvisioner::new(store, net.clone(), &config.upstream.registry_url);

        Ok(RegistryCtx {
            config,
            net,
            cache,
            flights,
            source,
            grammar,
            resolver,
            mirror,
            keys,
        })
    }
}
