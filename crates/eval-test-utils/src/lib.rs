//! Shared test utilities for the evaluation config workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixtures`] - ready-made `EvalConfig` values for common scenarios
//! - [`workspace`] - [`TestWorkspace`] for file-based tests

pub mod fixtures;
pub mod workspace;

pub use workspace::TestWorkspace;
