//! # Stepwire Telemetry
//!
//! Structured logging for Stepwire processes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sw_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // Log lines from every Stepwire crate now reach the subscriber
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SW_SERVICE_NAME` | `stepwire` | Service name in log lines |
//! | `SW_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `SW_JSON_LOGS` | `false` | One JSON object per line |
//! | `SW_CONSOLE_OUTPUT` | `true` | Write logs to the console |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{build_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Create an info-level span tagged with the component name.
///
/// ```rust,ignore
/// let span = component_span!("executor", "dispatch", processing_id = %id);
/// ```
#[macro_export]
macro_rules! component_span {
    ($component:expr, $name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!(
            "component",
            component = $component,
            operation = $name
            $(, $($field)*)?
        )
    };
}
