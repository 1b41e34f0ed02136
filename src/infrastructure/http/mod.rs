//! HTTP transport for the usage backend

mod client;

pub use client::{HttpBackendConfig, HttpUsageBackend};
