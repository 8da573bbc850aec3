//! Host configuration: the seams a unit of work runs against.
//!
//! The engine itself owns no storage and no reporting pipeline. The host
//! supplies both through a `Host` value:
//! - a `Transaction` wrapping each execute phase (commit on Ok, roll the
//!   storage back on Err, re-raising)
//! - an `ErrorSink` receiving every recorded or swallowed failure
//! - a `strict` flag that turns normally-swallowed notify failures into
//!   propagated errors, for test environments
//!
//! Defaults are a pass-through transaction and a `tracing`-backed sink.

use std::sync::Arc;

use serde::Serialize;
use tracing::error;

use crate::domain::{Options, UnitError};

/// Storage-transaction boundary consumed by the execute phase.
///
/// Called exactly once per execute invocation. Nested units inside a
/// supervisor share the outer transaction rather than opening their own.
pub trait Transaction: Send + Sync {
    /// Run `body`, committing on Ok and rolling the storage state back on
    /// Err. The error is returned unchanged either way.
    fn run(&self, body: &mut dyn FnMut() -> Result<(), UnitError>) -> Result<(), UnitError>;
}

/// Pass-through boundary for hosts without transactional storage.
pub struct NoTransaction;

impl Transaction for NoTransaction {
    fn run(&self, body: &mut dyn FnMut() -> Result<(), UnitError>) -> Result<(), UnitError> {
        body()
    }
}

/// What the sink learns about a failure: the failing unit's type name and
/// the options it was invoked with.
#[derive(Debug, Serialize)]
pub struct ReportContext<'a> {
    pub unit: &'a str,
    pub options: &'a Options,
}

/// Destination for every failure the engine records or swallows, whether
/// or not it is re-raised to the caller.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &UnitError, ctx: &ReportContext<'_>);
}

/// Default sink: structured log line per failure.
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, error: &UnitError, ctx: &ReportContext<'_>) {
        error!(unit = ctx.unit, code = error.code(), %error, "unit failure");
    }
}

/// Bundle of host collaborators handed to each execution.
#[derive(Clone)]
pub struct Host {
    transaction: Arc<dyn Transaction>,
    sink: Arc<dyn ErrorSink>,
    strict: bool,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            transaction: Arc::new(NoTransaction),
            sink: Arc::new(TracingSink),
            strict: false,
        }
    }
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction(mut self, transaction: Arc<dyn Transaction>) -> Self {
        self.transaction = transaction;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Turn strict mode on or off. Strict hosts re-raise notify-phase
    /// failures instead of swallowing them.
    pub fn strict(mut self, on: bool) -> Self {
        self.strict = on;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn transaction(&self) -> &dyn Transaction {
        self.transaction.as_ref()
    }

    /// Ship a failure to the sink with the standard context.
    pub fn report(&self, error: &UnitError, unit: &str, options: &Options) {
        self.sink.report(
            error,
            &ReportContext {
                unit,
                options,
            },
        );
    }
}
