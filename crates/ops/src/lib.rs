#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Registry operations for provmirror
//!
//! This crate sits between the HTTP surface and the specialized crates:
//! it wires resolver, mirror, signing and cache into one context and runs
//! the provider download pipeline.

mod actions;
mod context;

pub use actions::{discovery, extract_shasum, list_versions, perform_action};
pub use context::{RegistryContextBuilder, RegistryCtx};
