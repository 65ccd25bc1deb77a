//! HTTP surface of the registry protocol

use crate::error::ApiError;
use axum::extract::{Path, Request, State};
use axum::http::{header, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use provmirror_ops::RegistryCtx;
use provmirror_types::DiscoveryDocument;
use std::sync::Arc;
use std::time::Instant;

type Ctx = State<Arc<RegistryCtx>>;

/// Registry router over a shared context
pub fn router(ctx: Arc<RegistryCtx>) -> Router {
    Router::new()
        .route("/.well-known/terraform.json", get(discovery))
        .route("/v1/providers/{namespace}/{provider_type}/{*rest}", get(provider))
        .route("/storage/{*path}", get(storage))
        .layer(middleware::from_fn(log_requests))
        .with_state(ctx)
}

async fn discovery() -> Json<DiscoveryDocument> {
    Json(provmirror_ops::discovery())
}

/// `versions` or `<version>/<action>/<os>/<arch>` under a provider
async fn provider(
    State(ctx): Ctx,
    Path((namespace, provider_type, rest)): Path<(String, String, String)>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let request_path = uri.path();

    if rest == "versions" {
        let listing =
            provmirror_ops::list_versions(&ctx, &namespace, &provider_type, request_path).await?;
        return Ok(Json(listing).into_response());
    }

    let descriptor =
        provmirror_ops::perform_action(&ctx, &namespace, &provider_type, &rest, request_path)
            .await?;
    Ok(Json(descriptor).into_response())
}

/// Raw bytes of a mirrored file
async fn storage(State(ctx): Ctx, Path(path): Path<String>) -> Result<Response, ApiError> {
    let bytes = ctx.store().read(&path).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "request"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use provmirror_config::{CacheBackend, Config};
    use provmirror_types::ErrorResponse;
    use tempfile::TempDir;

    async fn serve(dir: &TempDir) -> (String, Arc<RegistryCtx>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let mut config = Config::default();
        config.storage.root = dir.path().to_path_buf();
        config.storage.cache_backend = CacheBackend::Memory;
        config.server.public_url = format!("{base}/storage");
        // Nothing listens here; any upstream call fails fast
        config.upstream.registry_url = "http://127.0.0.1:9".to_string();
        config.upstream.github_api_url = "http://127.0.0.1:9".to_string();

        let ctx = Arc::new(RegistryCtx::from_config(config).unwrap());
        let app = router(Arc::clone(&ctx));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (base, ctx)
    }

    #[tokio::test]
    async fn test_discovery_document() {
        let dir = TempDir::new().unwrap();
        let (base, _) = serve(&dir).await;

        let body: serde_json::Value = reqwest::get(format!("{base}/.well-known/terraform.json"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({"providers.v1": "/v1/providers/"}));
    }

    #[tokio::test]
    async fn test_unsupported_action_is_404() {
        let dir = TempDir::new().unwrap();
        let (base, _) = serve(&dir).await;

        let response = reqwest::get(format!(
            "{base}/v1/providers/acme/widget/1.0.0/boguseaction/linux/amd64"
        ))
        .await
        .unwrap();
        assert_eq!(response.status().as_u16(), 404);
        let error: ErrorResponse = response.json().await.unwrap();
        assert_eq!(error.status, 404);
        assert_eq!(error.message, "unsupported action boguseaction");
    }

    #[tokio::test]
    async fn test_short_path_is_invalid_request() {
        let dir = TempDir::new().unwrap();
        let (base, _) = serve(&dir).await;

        let response = reqwest::get(format!("{base}/v1/providers/acme/widget/1.0.0"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let error: ErrorResponse = response.json().await.unwrap();
        assert_eq!(error.message, "invalid request");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_400() {
        let dir = TempDir::new().unwrap();
        let (base, _) = serve(&dir).await;

        let response = reqwest::get(format!("{base}/v1/providers/acme/widget/versions"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_storage_serves_bytes() {
        let dir = TempDir::new().unwrap();
        let (base, ctx) = serve(&dir).await;
        ctx.store()
            .write("dl/acme/a.zip", b"zip-bytes")
            .await
            .unwrap();

        let response = reqwest::get(format!("{base}/storage/dl/acme/a.zip"))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            "application/octet-stream"
        );
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"zip-bytes");
    }

    #[tokio::test]
    async fn test_storage_miss_is_404() {
        let dir = TempDir::new().unwrap();
        let (base, _) = serve(&dir).await;

        let response = reqwest::get(format!("{base}/storage/nope.zip")).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
        let error: ErrorResponse = response.json().await.unwrap();
        assert_eq!(error.status, 404);
    }

    #[tokio::test]
    async fn test_mirrored_url_with_escapes_is_served() {
        let upstream = MockServer::start();
        upstream.mock(|when, then| {
            when.method(GET).path_contains("/dl/v1.0.0");
            then.status(200).body("enterprise build");
        });

        let dir = TempDir::new().unwrap();
        let (base, ctx) = serve(&dir).await;

        let public = ctx
            .mirror
            .ensure_mirrored(&upstream.url("/dl/v1.0.0%2Bent/a.zip"))
            .await
            .unwrap();
        assert_eq!(public, format!("{base}/storage/dl/v1.0.0%2Bent/a.zip"));

        let response = reqwest::get(&public).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"enterprise build");
    }
}
