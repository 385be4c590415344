//! Imar Server Library
//!
//! HTTP backend for the staged mosque import and promotion pipeline.
//!
//! # Overview
//!
//! Mosque records are bulk-ingested from spreadsheet files into a staging
//! area, optionally corrected by an operator, and then promoted individually
//! or per batch into the authoritative mosque dataset held by the remote
//! platform API.
//!
//! - **Spreadsheet Ingestor**: parses `.xlsx`/`.xls` uploads into staged
//!   records attached to a batch, collecting per-row errors
//! - **Staging Store**: the only place records exist before promotion;
//!   per-row atomic compare-and-delete
//! - **Validation/Edit Layer**: partial updates with per-field validation
//! - **Promotion Engine**: resolves free-text locations, creates
//!   authoritative records, removes staged rows; idempotent per record
//! - **Batch Tracker**: read-only projection of per-batch statistics
//!
//! # Architecture
//!
//! Features follow a CQRS-style vertical slice layout:
//!
//! - `commands/` - write operations (import, update, delete, promote)
//! - `queries/` - read operations (list, stats, export, template)
//! - `routes.rs` - HTTP route definitions and error mapping
//!
//! External collaborators (the location resolver and the authoritative
//! mosque store) sit behind traits in [`stores`], with HTTP implementations
//! talking to the remote platform API.

pub mod api;
pub mod config;
pub mod features;
pub mod middleware;
pub mod models;
pub mod spreadsheet;
pub mod stores;

// Re-export commonly used types
pub use config::Config;
