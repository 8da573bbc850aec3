//! andon - Saga-style unit-of-work lifecycle library
//!
//! Discrete units of work ("commanders") share a uniform three-phase
//! lifecycle — validate, execute, notify — and compose into ordered
//! sequences that behave like a saga: when any step fails, every
//! previously completed step is compensated in reverse order before the
//! failure is surfaced.
//!
//! # Architecture
//!
//! - Each concrete unit implements hooks (`prepare`, `check_conditions`,
//!   `up`, `down`, `notify`); the lifecycle itself is a fixed algorithm
//!   driven by [`Execution`]
//! - Bang entry points (`try_run`) re-raise failures; non-bang twins
//!   (`run`) capture them into the returned [`Outcome`]
//! - A [`Supervisor`] records [`InlineStep`]s and nested commander
//!   invocations in call order and unwinds them in reverse on failure
//! - The host supplies the transaction boundary, the error sink, and the
//!   strict-mode flag through [`Host`]
//!
//! # Modules
//!
//! - `domain`: data structures (UnitError, Options, UnitSpec)
//! - `core`: lifecycle and orchestration engine
//! - `config`: host collaborators (Transaction, ErrorSink)
//!
//! # Usage
//!
//! ```
//! use std::sync::OnceLock;
//! use andon::{ArgKind, Commander, Host, Options, Unit, UnitError, UnitSpec};
//!
//! struct Greet {
//!     greeting: Option<String>,
//! }
//!
//! impl Unit for Greet {
//!     fn spec() -> &'static UnitSpec {
//!         static SPEC: OnceLock<UnitSpec> = OnceLock::new();
//!         SPEC.get_or_init(|| UnitSpec::new("greet").arg("name", ArgKind::String))
//!     }
//! }
//!
//! impl Commander for Greet {
//!     fn up(&mut self, _host: &Host, opts: &Options) -> Result<(), UnitError> {
//!         self.greeting = opts.get_str("name").map(|n| format!("hello, {n}"));
//!         Ok(())
//!     }
//! }
//!
//! let host = Host::new();
//! let outcome = andon::run(&host, Greet { greeting: None }, Options::new().with("name", "ada"));
//! assert!(outcome.success());
//! assert_eq!(outcome.unit().greeting.as_deref(), Some("hello, ada"));
//! ```

pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::config::{ErrorSink, Host, NoTransaction, ReportContext, TracingSink, Transaction};
pub use crate::core::commander::{
    dry_run, run, try_dry_run, try_run, try_undo, undo, Commander, Execution, Outcome, Phase,
    Unit,
};
pub use crate::core::step::{InlineStep, Step, StepLedger};
pub use crate::core::supervisor::{Orchestrate, Steps, Supervisor};
pub use crate::domain::{ArgKind, Options, UnitError, UnitSpec};
