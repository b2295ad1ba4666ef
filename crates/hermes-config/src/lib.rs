//! Configuration for Hermes services.
//!
//! Two layers are provided:
//!
//! - [`FileConfig`] and the [`Config`] trait: untyped, dotted-key lookup over
//!   a JSON, YAML or TOML file, with zero values for missing keys
//! - [`HermesConfig`] and [`ConfigLoader`]: the typed service configuration,
//!   layered from defaults, files and environment variables, with strict
//!   validation (unknown fields are rejected)
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::{Config, ConfigLoader, FileConfig};
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("hermes.yaml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! let app = FileConfig::from_path("configs/app.yaml")?;
//! let addr = app.get_string("server.http.addr");
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```yaml
//! service:
//!   name: alerting
//!   version: 1.0.0
//!   environment: production
//!
//! logging:
//!   level: info          # debug, info, warn, error, fatal
//!   format: json         # json or pretty
//!   file: /var/log/alerting.log
//!
//! tracing:
//!   enabled: true
//!   otlp_endpoint: http://localhost:4317
//!   sampling_ratio: 0.1
//!
//! client:
//!   endpoint: http://127.0.0.1:8000
//!   timeout_ms: 5000
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `HERMES__SERVICE__NAME=alerting`
//! - `HERMES__LOGGING__LEVEL=debug`
//! - `HERMES__TRACING__ENABLED=false`

#![warn(missing_docs)]

mod config;
mod error;
mod file;
mod loader;
mod schema;

pub use config::{HermesConfig, HermesConfigBuilder};
pub use error::ConfigError;
pub use file::{Config, FileConfig, FileFormat};
pub use loader::ConfigLoader;
pub use schema::{ClientConfig, LogFormat, LoggingConfig, ServiceConfig, TracingConfig};
