//! Keyloom Test - Shared test utilities for Keyloom storage.
//!
//! This crate provides mock stores, a recording listener, and fixtures
//! that can be used across Keyloom crates as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! keyloom-test.workspace = true
//! ```
//!
//! Then use in your integration tests:
//!
//! ```rust,ignore
//! use keyloom_core::BackendId;
//! use keyloom_test::memory_facade;
//!
//! #[tokio::test]
//! async fn test_round_trip() {
//!     let facade = memory_facade();
//!     facade.write(BackendId::Fast, "demo_mmkv_value", "Hello").await.unwrap();
//!     assert_eq!(
//!         facade.read(BackendId::Fast, "demo_mmkv_value").await.unwrap().as_deref(),
//!         Some("Hello")
//!     );
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; output goes through the test harness writer so it
/// is only shown for failing tests.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
