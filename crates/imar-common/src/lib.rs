//! Imar Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error types and logging bootstrap for the Imar workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the [`StoreError`] type used by upstream store
//!   clients, plus the shared [`Result`] alias
//! - **Logging**: `tracing`-based logging initialization shared by every
//!   binary in the workspace

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, StoreError};
