//! Configuration for a labelsync run
//!
//! Settings are read once from a TOML, JSON or YAML file, overridden by CLI
//! flags, validated, and then passed by value into the engine and client.

mod settings;

pub use settings::{
    PlatformSettings, PolicyFilter, PolicyType, RetrySettings, Settings, SyncSettings,
};
