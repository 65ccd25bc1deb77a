#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Time-bounded caching for provmirror
//!
//! Every expensive upstream call (release listings, version listings,
//! assembled download descriptors) goes through a [`Cache`]. Caches are
//! constructed explicitly and injected; there is no global cache state.
//!
//! Failed upstream calls are never cached, so a miss is always retried on
//! the next request for that key.

mod clock;
mod file;
mod flight;
pub mod keys;
mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::FileCache;
pub use flight::{FlightGuard, SingleFlight};
pub use memory::MemoryCache;

use async_trait::async_trait;
use provmirror_errors::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// TTL key/value store holding serialized records
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch the raw bytes stored under `key`, or `None` when absent or expired
    async fn get_raw(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key` for `ttl`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error>;
}

/// Typed access on top of [`Cache`], serializing records as JSON
#[async_trait]
pub trait CacheExt: Cache {
    /// Fetch and decode the record stored under `key`
    ///
    /// A record that no longer decodes is reported as a miss.
    async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let raw = self.get_raw(key).await?;
        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Encode and store `value` under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or stored.
    async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), Error>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_vec(value)?;
        self.set_raw(key, raw, ttl).await
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
