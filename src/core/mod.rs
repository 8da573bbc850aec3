//! Lifecycle and orchestration engine.
//!
//! This module contains:
//! - Commander: the three-phase lifecycle of one unit of work
//! - Step: recorded units of change with optional compensation
//! - Supervisor: step sequencing with reverse-order rollback

pub mod commander;
pub mod step;
pub mod supervisor;

// Re-export commonly used types
pub use commander::{Commander, Execution, Outcome, Phase, Unit};
pub use step::{InlineStep, Step, StepLedger};
pub use supervisor::{Orchestrate, Steps, Supervisor};
