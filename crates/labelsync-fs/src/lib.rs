//! Filesystem helpers for labelsync
//!
//! Provides the small amount of disk I/O the sync engine needs: atomic,
//! lock-protected writes for the rule registry, a format-agnostic config
//! loader, and content digests used for stable rule keys.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;

pub use checksum::{content_digest, short_digest};
pub use config::ConfigStore;
pub use error::{Conversion, Error, Result};
