//! Domain types for the lifecycle engine.
//!
//! This module contains the core data structures:
//! - UnitError: the failure taxonomy
//! - Options: the dynamic argument mapping
//! - UnitSpec: per-type argument constraints and error catalog

pub mod catalog;
pub mod error;
pub mod options;

// Re-export commonly used types
pub use catalog::UnitSpec;
pub use error::UnitError;
pub use options::{ArgKind, Options};
