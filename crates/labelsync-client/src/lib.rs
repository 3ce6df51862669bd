//! HTTP client for the catalog rules API
//!
//! [`CatalogClient`] implements [`labelsync_core::LabelPlatform`] over the
//! catalog server's REST endpoints:
//!
//! - `GET  /catalog-server/api/rules` for policy enumeration
//! - `GET  /catalog-server/api/rules/{data-quality|reconciliation}/{id}`
//!   for a policy document, optionally `?version=N`
//! - `PUT` on the same path to write labels back
//!
//! Transient failures are retried according to a [`RetryPolicy`].

// Update payloads are large `json!` literals
#![recursion_limit = "512"]

pub mod client;
pub mod error;
pub mod models;
pub mod payload;
pub mod retry;

pub use client::{CatalogClient, Credentials};
pub use error::{ClientError, Result};
pub use retry::RetryPolicy;
