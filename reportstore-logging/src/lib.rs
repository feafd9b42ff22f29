//! Structured logging initialisation
//!
//! Migrations and adapters emit `tracing` events (storage adapters go
//! through the `log` facade, which the subscriber picks up as well). This
//! crate installs the global subscriber from a [`LoggingConfig`].
//!
//! [`LoggingConfig`]: reportstore_config::LoggingConfig

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
