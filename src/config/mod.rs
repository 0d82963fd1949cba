//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BridgeConfig (validated, immutable)
//!     → shared via Arc<ArcSwap<BridgeConfig>> to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the new Arc in
//!     → subsystems read it on their next use
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Bind address and the outer HTTP timeout are fixed at startup

use std::sync::Arc;

use arc_swap::ArcSwap;

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BridgeConfig, LivenessConfig, ListenerConfig, ObservabilityConfig,
    SecurityConfig, StaticFilesConfig, TimeoutConfig,
};
pub use watcher::ConfigWatcher;

/// Live, swappable configuration handle.
pub type SharedConfig = Arc<ArcSwap<BridgeConfig>>;

pub fn shared(config: BridgeConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}
