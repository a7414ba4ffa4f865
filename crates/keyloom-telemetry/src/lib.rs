//! Keyloom Telemetry - Logging for Keyloom binaries.
//!
//! Libraries in this workspace only emit `tracing` events. Binaries call
//! [`setup_logging`] once at startup to decide where they go.
//!
//! # Example
//!
//! ```rust,no_run
//! use keyloom_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), keyloom_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("keyloom_cache=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - **`config`**: build a [`LogConfig`] from a `keyloom_config::LoggingSection`

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{FileRotation, LogConfig, LogFormat, LogTarget, setup_logging};
