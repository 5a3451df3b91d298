//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into the RouteTable at startup
//! ```
//!
//! # Design Decisions
//! - Config is loaded once; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Without a file the built-in development route table is used
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    FallbackConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, RouteConfig,
};
pub use validation::{validate_config, validate_routes, ValidationError};
