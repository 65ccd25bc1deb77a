//! Registry protocol operations

use crate::RegistryCtx;
use provmirror_cache::keys::download_key;
use provmirror_cache::CacheExt;
use provmirror_errors::{ActionError, Error};
use provmirror_net::fetch_json;
use provmirror_resolver::{archive_filename, shasums_filename, shasums_signature_filename};
use provmirror_store::AssetMirror;
use provmirror_types::{
    ActionRequest, DiscoveryDocument, DownloadDescriptor, GpgPublicKey, Release, SigningKeys,
    VersionListing, DOWNLOAD_ACTION,
};

/// Upstream locations of the three files a download needs
#[derive(Debug)]
struct SourceUrls {
    filename: String,
    protocols: Vec<String>,
    download: String,
    shasums: String,
    signature: String,
}

/// Service discovery document
#[must_use]
pub fn discovery() -> DiscoveryDocument {
    DiscoveryDocument::default()
}

/// Version listing of `namespace/provider_type`
///
/// # Errors
///
/// Returns an error if the upstream registry or the release source fails.
pub async fn list_versions(
    ctx: &RegistryCtx,
    namespace: &str,
    provider_type: &str,
    url_path: &str,
) -> Result<VersionListing, Error> {
    ctx.resolver
        .listing(namespace, provider_type, url_path)
        .await
}

/// Answer `<version>/<action>/<os>/<arch>` for a provider
///
/// `tail` is the part of the request path after the provider type and
/// `request_path` the full path as received. Only complete answers are
/// cached.
///
/// # Errors
///
/// Returns [`ActionError::InvalidRequest`] if `tail` does not parse,
/// [`ActionError::UnsupportedAction`] for anything but `download`, and an
/// error from the failing step otherwise.
pub async fn perform_action(
    ctx: &RegistryCtx,
    namespace: &str,
    provider_type: &str,
    tail: &str,
    request_path: &str,
) -> Result<DownloadDescriptor, Error> {
    let request = ctx
        .grammar
        .action_path(tail)
        .ok_or(ActionError::InvalidRequest)?;

    if request.action != DOWNLOAD_ACTION {
        return Err(ActionError::UnsupportedAction {
            action: request.action,
        }
        .into());
    }

    let provider = ctx.resolver.provider_repo(provider_type);
    let key = download_key(
        namespace,
        &provider,
        &request.version,
        &request.os,
        &request.arch,
    );

    if let Some(descriptor) = ctx.cache.get::<DownloadDescriptor>(&key).await {
        tracing::debug!(key = %key, "download cache hit");
        return Ok(descriptor);
    }

    let _flight = ctx.flights.acquire(&key).await;
    if let Some(descriptor) = ctx.cache.get::<DownloadDescriptor>(&key).await {
        return Ok(descriptor);
    }
    tracing::debug!(key = %key, "download cache miss");

    let descriptor = download(ctx, namespace, provider_type, &provider, &request, request_path)
        .await?;

    if let Err(e) = ctx
        .cache
        .set(&key, &descriptor, ctx.config.cache.download_ttl())
        .await
    {
        tracing::warn!(key = %key, error = %e, "failed to write cache entry");
    }
    Ok(descriptor)
}

async fn download(
    ctx: &RegistryCtx,
    namespace: &str,
    provider_type: &str,
    provider: &str,
    request: &ActionRequest,
    request_path: &str,
) -> Result<DownloadDescriptor, Error> {
    let urls = if ctx.resolver.is_passthrough(namespace) {
        upstream_urls(ctx, provider, request, request_path).await?
    } else {
        let releases = ctx.resolver.releases(namespace, provider_type).await?;
        let release = ctx
            .grammar
            .release_for_version(&releases, &request.version)
            .ok_or_else(|| ActionError::VersionNotFound {
                version: request.version.clone(),
            })?;
        release_urls(ctx, namespace, provider, release, request).await?
    };

    let key = ctx
        .keys
        .public_key(namespace, provider_type, request_path)
        .await
        .map_err(|e| ActionError::SigningKeys {
            message: e.to_string(),
        })?;

    let download_url = mirror(&ctx.mirror, &urls.download).await?;
    let shasums_signature_url = mirror(&ctx.mirror, &urls.signature).await?;
    let shasums_url = mirror(&ctx.mirror, &urls.shasums).await?;

    let shasum = mirrored_shasum(&ctx.mirror, &urls.shasums, &urls.filename).await?;

    Ok(DownloadDescriptor {
        protocols: urls.protocols,
        os: request.os.clone(),
        arch: request.arch.clone(),
        filename: urls.filename,
        download_url,
        shasums_url,
        shasums_signature_url,
        shasum,
        signing_keys: SigningKeys {
            gpg_public_keys: vec![GpgPublicKey::new(key.key_id, key.ascii_armor)],
        },
    })
}

/// The upstream registry's own answer for the same request
async fn upstream_urls(
    ctx: &RegistryCtx,
    provider: &str,
    request: &ActionRequest,
    request_path: &str,
) -> Result<SourceUrls, Error> {
    let url = format!("{}{request_path}", ctx.resolver.settings().registry_url);
    let upstream: DownloadDescriptor =
        fetch_json(&ctx.net, &url)
            .await
            .map_err(|e| ActionError::Upstream {
                message: e.to_string(),
            })?;

    let filename = if upstream.filename.is_empty() {
        archive_filename(provider, &request.version, &request.os, &request.arch)
    } else {
        upstream.filename
    };

    Ok(SourceUrls {
        filename,
        protocols: upstream.protocols,
        download: upstream.download_url,
        shasums: upstream.shasums_url,
        signature: upstream.shasums_signature_url,
    })
}

/// Asset URLs of the release publishing the requested version
async fn release_urls(
    ctx: &RegistryCtx,
    owner: &str,
    provider: &str,
    release: &Release,
    request: &ActionRequest,
) -> Result<SourceUrls, Error> {
    let filename = archive_filename(provider, &request.version, &request.os, &request.arch);
    let shasums_name = shasums_filename(provider, &request.version);
    let signature_name = shasums_signature_filename(provider, &request.version);

    let locate = |name: &str| {
        release
            .asset(name)
            .ok_or_else(|| ActionError::AssetNotFound {
                name: name.to_string(),
            })
    };
    let archive = locate(&filename)?;
    let shasums_asset = locate(&shasums_name)?;
    let signature_asset = locate(&signature_name)?;

    let download = ctx.source.download_url(owner, provider, archive).await?;
    let shasums = ctx.source.download_url(owner, provider, shasums_asset).await?;
    let signature = ctx
        .source
        .download_url(owner, provider, signature_asset)
        .await?;

    Ok(SourceUrls {
        filename,
        protocols: Vec::new(),
        download,
        shasums,
        signature,
    })
}

async fn mirror(mirror: &AssetMirror, url: &str) -> Result<String, Error> {
    mirror.ensure_mirrored(url).await.map_err(|e| {
        ActionError::Mirror {
            url: url.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Checksum of `filename` from the already mirrored listing at `shasums_url`
async fn mirrored_shasum(
    mirror: &AssetMirror,
    shasums_url: &str,
    filename: &str,
) -> Result<String, Error> {
    let shasum_error = |message: String| Error::from(ActionError::Shasum { message });

    let path = AssetMirror::store_path(shasums_url).map_err(|e| shasum_error(e.to_string()))?;
    let listing = mirror
        .store()
        .read_to_string(&path)
        .await
        .map_err(|e| shasum_error(e.to_string()))?;

    extract_shasum(&listing, filename).ok_or_else(|| shasum_error("not found".to_string()))
}

/// Checksum of `filename` in a `SHA256SUMS` body
///
/// Each line is `<checksum>  <filename>` with a two-space separator. The
/// first line naming exactly `filename` wins.
#[must_use]
pub fn extract_shasum(body: &str, filename: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let mut parts = line.split("  ");
        match (parts.next(), parts.next(), parts.next()) {
            (Some(sum), Some(name), None) if name == filename => Some(sum.to_string()),
            _ => None,
        }
    })
}
