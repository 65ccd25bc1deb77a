#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for provmirror
//!
//! This crate handles all outbound HTTP: upstream registry proxying,
//! source-control API calls and asset downloads, with pooled connections
//! and opt-in retry logic. Any upstream answer other than 200 is reported as
//! not found.

mod client;

pub use client::{NetClient, NetConfig};

use provmirror_errors::{Error, NetworkError};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Fail unless the upstream answered exactly 200
///
/// # Errors
///
/// Returns [`NetworkError::NotFound`] carrying the upstream status for
/// every non-200 answer, including redirects and server errors.
pub fn expect_ok(response: Response, url: &str) -> Result<Response, Error> {
    match response.status() {
        StatusCode::OK => Ok(response),
        status => {
            tracing::debug!(url, status = status.as_u16(), "upstream answered non-200");
            Err(NetworkError::NotFound {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into())
        }
    }
}

/// Fetch binary content from a URL
///
/// # Errors
///
/// Returns an error if the HTTP request fails, the server returns anything
/// but 200, or the response body cannot be read as bytes.
pub async fn fetch_bytes(client: &NetClient, url: &str) -> Result<Vec<u8>, Error> {
    tracing::debug!(url, "fetching bytes");

    let response = expect_ok(client.get(url).await?, url)?;

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| NetworkError::DownloadFailed(e.to_string()).into())
}

/// Fetch and decode a JSON document
///
/// # Errors
///
/// Returns an error if the request fails, the server returns anything but
/// 200, or the body is not valid JSON for `T`.
pub async fn fetch_json<T: DeserializeOwned>(client: &NetClient, url: &str) -> Result<T, Error> {
    let body = fetch_bytes(client, url).await?;
    serde_json::from_slice(&body).map_err(|e| {
        NetworkError::InvalidBody {
            url: url.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed or invalid according to RFC 3986.
pub fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| NetworkError::InvalidUrl(e.to_string()).into())
}
