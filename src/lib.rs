//! # provider-ingest
//!
//! Ingests the periodic exports that learning providers drop into a download
//! directory, loads them into a relational store and archives the consumed
//! files.
//!
//! A run handles one provider:
//!
//! ```text
//! orchestrator::run
//!   ├─> validate download / archive directories and the provider name
//!   ├─> providers::<vendor>::ingest
//!   │     ├─> locator   (timestamped file lookup)
//!   │     ├─> reader    (CSV / workbook → DataFrame)
//!   │     ├─> reshape   (SimpliLearn repeated column groups)
//!   │     ├─> export    (one table per dataset)
//!   │     └─> archive   (<archive>/<YYYYMMDD>/)
//!   └─> export::export_log (always)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: settings built once from [`cli`]
//! - [`error`]: error taxonomy; only configuration errors end a run
//! - [`logging`]: execution log subscriber
//! - [`store`]: the [`store::TableStore`] seam, PostgreSQL and in-memory
//!
//! ```no_run
//! use provider_ingest::{config::Settings, orchestrator, store::MemoryStore};
//!
//! # fn example(settings: &Settings) -> provider_ingest::error::Result<()> {
//! let store = MemoryStore::new();
//! let summary = orchestrator::run(settings, Some("Coursera"), &store)?;
//! println!("{} tables written", summary.exports.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod locator;
pub mod logging;
pub mod orchestrator;
pub mod providers;
pub mod reader;
pub mod reshape;
pub mod store;
