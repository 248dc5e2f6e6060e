//! # Stepwire Test Suite
//!
//! Cross-crate flows exercised end to end.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Scripted executor peer, live node helpers
//! └── integration/
//!     ├── flows.rs      # Streaming, interleaving, failure, cancel
//!     ├── transfer.rs   # Buffer ownership across both channel kinds
//!     └── shutdown.rs   # Transport loss and forced shutdown
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sw-tests
//!
//! # By category
//! cargo test -p sw-tests integration::shutdown::
//!
//! # Benchmarks
//! cargo bench -p sw-tests
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

#[cfg(test)]
mod fixtures;

pub mod integration;
