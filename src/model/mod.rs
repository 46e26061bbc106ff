//! Data models for Job Backup.
//!
//! This module contains the domain models shared by export and import:
//! - ItemDescriptor (live hierarchy view)
//! - ArchiveCandidate (import preview view)
//! - ApplyResult / ApplyFailure (persisted outcome of an apply)
//! - ItemRow (export picker view)

pub mod candidate;
pub mod item;
pub mod result;

pub use candidate::ArchiveCandidate;
pub use item::{ItemDescriptor, ItemRow};
pub use result::{ApplyFailure, ApplyResult};
