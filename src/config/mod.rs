//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to GatewayServer at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route table is static for the
//!   lifetime of the process
//! - All fields have defaults to allow minimal configs
//! - Secrets and addresses can be overridden from the environment
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, AuthMode, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RateLimitConfig, RedisConfig, RouteConfig, StoreBackend, TimeoutConfig,
};
pub use validation::ValidationError;
