//! Harness settings.
//!
//! Settings are read from the environment only; command-line arguments of the
//! test binary are never parsed, so they cannot clash with the test runner's
//! own flags. Reading them installs the test log subscriber at the configured
//! level, and settings that fail [`HarnessSettings::validate`] are reported at
//! `warn` and replaced by the defaults.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REST_TESTING_CONTAINER` | in-memory | Default container (`in-memory` or `tcp`) |
//! | `REST_TESTING_HOST` | 127.0.0.1 | Host the TCP container binds |
//! | `REST_TESTING_PORT` | 0 | Port the TCP container binds (0 = ephemeral) |
//! | `REST_TESTING_SHUTDOWN_TIMEOUT` | 5 | TCP container shutdown timeout (seconds) |
//! | `REST_TESTING_LOG_LEVEL` | info | Level of the log subscriber installed by [`HarnessSettings::from_env`] |
//!
//! # Example
//!
//! ```rust
//! use helios_rest_testing::{ContainerKind, HarnessSettings};
//!
//! let settings = HarnessSettings {
//!     container: ContainerKind::Tcp,
//!     ..Default::default()
//! };
//! assert!(settings.validate().is_ok());
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::warn;

use crate::container::{InMemoryTestContainerFactory, TcpTestContainerFactory, TestContainerFactory};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Container used when a configuration does not select one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ContainerKind {
    /// Requests are dispatched straight into the router.
    #[default]
    InMemory,
    /// The router is served on a loopback socket.
    Tcp,
}

/// Settings of the test harness.
#[derive(Debug, Clone, Parser)]
#[command(name = "rest-testing")]
#[command(about = "REST resource test harness settings")]
pub struct HarnessSettings {
    /// Default container.
    #[arg(long, env = "REST_TESTING_CONTAINER", value_enum, default_value = "in-memory")]
    pub container: ContainerKind,

    /// Host the TCP container binds to.
    #[arg(long, env = "REST_TESTING_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port the TCP container binds to.
    #[arg(long, env = "REST_TESTING_PORT", default_value = "0")]
    pub port: u16,

    /// Shutdown timeout of the TCP container, in seconds.
    #[arg(long, env = "REST_TESTING_SHUTDOWN_TIMEOUT", default_value = "5")]
    pub shutdown_timeout_secs: u64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "REST_TESTING_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            container: ContainerKind::InMemory,
            host: "127.0.0.1".to_string(),
            port: 0,
            shutdown_timeout_secs: 5,
            log_level: "info".to_string(),
        }
    }
}

impl HarnessSettings {
    /// Reads settings from the environment and initializes logging at their
    /// level. Falls back to defaults when a variable does not parse or the
    /// settings are invalid.
    pub fn from_env() -> Self {
        Self::or_default(Self::try_parse_from(["rest-testing"]))
    }

    pub(crate) fn or_default(parsed: Result<Self, clap::Error>) -> Self {
        let (settings, errors) = match parsed {
            Ok(settings) => match settings.validate() {
                Ok(()) => (settings, Vec::new()),
                Err(errors) => (Self::default(), errors),
            },
            Err(err) => (Self::default(), vec![err.to_string()]),
        };

        crate::init_logging(&settings.log_level);
        if !errors.is_empty() {
            warn!(?errors, "Invalid harness settings, using defaults");
        }
        settings
    }

    /// The TCP container shutdown timeout.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Creates the container factory these settings select.
    pub fn container_factory(&self) -> Arc<dyn TestContainerFactory> {
        match self.container {
            ContainerKind::InMemory => Arc::new(InMemoryTestContainerFactory::new()),
            ContainerKind::Tcp => Arc::new(TcpTestContainerFactory::from_settings(self)),
        }
    }

    /// Validates the settings and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.host.trim().is_empty() {
            errors.push("Host cannot be empty".to_string());
        }

        if self.shutdown_timeout_secs == 0 {
            errors.push("Shutdown timeout cannot be 0".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!("Unknown log level: {}", self.log_level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Settings for the harness's own tests: in-memory container, verbose logs.
    pub fn for_testing() -> Self {
        Self {
            log_level: "debug".to_string(),
            shutdown_timeout_secs: 2,
            ..Self::default()
        }
    }
}
