//! Job Backup - export and restore job/folder definitions between instances.
//!
//! This crate provides the core functionality for the `job-backup` CLI tool.
//!
//! # Architecture
//!
//! - [`namespace`] - Path math over `/`-delimited item names
//! - [`selection`] - Prefix-based selection expansion
//! - [`archive`] - Zip writing and zip-slip-safe extraction
//! - [`discovery`] - Import candidates from an extracted archive
//! - [`apply`] - Create-or-update engine with per-item failure isolation
//! - [`session`] - Filesystem-backed import sessions
//! - [`export`] / [`import`] - Export and upload/preview/apply workflows
//! - [`hierarchy`] - Host hierarchy trait and adapters
//! - [`model`] - Data types (ItemDescriptor, ArchiveCandidate, ApplyResult)
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Path resolution
//! - [`file`] - Atomic writes and JSON documents
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod apply;
pub mod archive;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod file;
pub mod hierarchy;
pub mod import;
pub mod model;
pub mod namespace;
pub mod selection;
pub mod session;

pub use error::{Error, Result};

/// File name that carries an item's configuration, both in the archive and on disk.
pub const CONFIG_FILE_NAME: &str = "config.xml";
