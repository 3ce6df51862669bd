//! Shared test utilities for the labelsync workspace.
//!
//! This crate provides standardised test fixtures so crate test suites do
//! not each build their own fakes. It is a dev-dependency only, never
//! published.
//!
//! # Modules
//!
//! - [`fixtures`]: policy and rule builders, and [`fixtures::TestRegistry`]
//! - [`platform`]: [`platform::InMemoryPlatform`], a `LabelPlatform` fake

pub mod fixtures;
pub mod platform;

pub use fixtures::TestRegistry;
pub use platform::{InMemoryPlatform, PlatformCall};
