//! Export articles from a Feedly account to CSV, JSON and plain URL lists.
//!
//! The pipeline is sequential: resolve the stream, page through it with the
//! continuation cursor, and append each page to the output files as it
//! arrives so an interrupted run still leaves usable files.
//!
//! # Modules
//!
//! - [`api`] - Authenticated HTTP client with retry and rate-limit backoff
//! - [`config`] - Optional TOML config file and token lookup
//! - [`export`] - Output paths, CSV encoding and the progressive writer
//! - [`extractor`] - Orchestration, pagination and the end-of-run summary
//! - [`models`] - The exported `Article` record and folder lookup
//! - [`options`] - Per-run options and date window validation
//! - [`ratelimit`] - The `--check-rate-limit` diagnostic
//! - [`util`] - HTML stripping, timestamps, URL validation

pub mod api;
pub mod config;
pub mod export;
pub mod extractor;
pub mod models;
pub mod options;
pub mod ratelimit;
pub mod util;
