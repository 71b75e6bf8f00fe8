//! Attach Services
//!
//! This module contains the reconciliation service:
//!
//! - `GraphAttacher` - Resolves a detached graph against the store
//! - `AttacherConfig` - Optional hardening (cycle guard, depth limit)
//! - `AttachError` - Failures that abort an attach call
//!
//! Persisting the new records an attach call produces, and retrying when a
//! concurrent writer wins the insert race, is left to the caller.

pub mod attacher;
pub mod config;
pub mod error;

pub use attacher::GraphAttacher;
pub use config::AttacherConfig;
pub use error::AttachError;
