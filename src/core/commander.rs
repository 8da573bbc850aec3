//! The three-phase lifecycle of a single unit of work.
//!
//! A unit moves through validate, execute, notify as a fixed algorithm
//! driven by `Execution`; the concrete type only supplies hooks through
//! the `Unit` and `Commander` traits. Bang entry points (`try_run`,
//! `try_dry_run`, `try_undo`) re-raise validation/execution failures after
//! recording them; the non-bang twins capture the failure into the
//! returned `Outcome` and never raise.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::Host;
use crate::domain::{Options, UnitError, UnitSpec};

/// Subtype surface shared by atomic units and orchestrators: the per-type
/// catalog plus the validation and notification hooks.
pub trait Unit {
    /// The immutable per-type configuration. Implementations build it once
    /// behind a `OnceLock`:
    ///
    /// ```ignore
    /// fn spec() -> &'static UnitSpec {
    ///     static SPEC: OnceLock<UnitSpec> = OnceLock::new();
    ///     SPEC.get_or_init(|| UnitSpec::new("create_user").arg("name", ArgKind::String))
    /// }
    /// ```
    fn spec() -> &'static UnitSpec
    where
        Self: Sized;

    /// Derive internal fields from options. Runs after argument checks and
    /// before condition checks.
    fn prepare(&mut self, opts: &Options) -> Result<(), UnitError> {
        let _ = opts;
        Ok(())
    }

    /// Business-rule preconditions. Raise through `condition`/`unmet`.
    fn check_conditions(&self, opts: &Options) -> Result<(), UnitError> {
        let _ = opts;
        Ok(())
    }

    /// Post-success side effect. Failures here are reported and, outside
    /// strict mode, swallowed.
    fn notify(&mut self, opts: &Options) -> Result<(), UnitError> {
        let _ = opts;
        Ok(())
    }

    /// Fail with `ConditionNotMet` when `ok` is false, using the catalog
    /// message for `code`.
    fn condition(&self, code: &'static str, ok: bool) -> Result<(), UnitError>
    where
        Self: Sized,
    {
        if ok {
            Ok(())
        } else {
            Err(self.unmet(code))
        }
    }

    /// Build a `ConditionNotMet` for `code` with its catalog message.
    fn unmet(&self, code: &'static str) -> UnitError
    where
        Self: Sized,
    {
        let spec = Self::spec();
        UnitError::ConditionNotMet {
            code: spec.qualified(code),
            message: spec.message_for(code).to_string(),
        }
    }

    /// `ConditionNotMet` with an overriding message.
    fn unmet_with(&self, code: &'static str, message: impl Into<String>) -> UnitError
    where
        Self: Sized,
    {
        UnitError::ConditionNotMet {
            code: Self::spec().qualified(code),
            message: message.into(),
        }
    }

    /// Build an `ExecutionFailure` for `code` with its catalog message.
    fn fail(&self, code: &'static str) -> UnitError
    where
        Self: Sized,
    {
        self.fail_ctx(code, Map::new())
    }

    /// `ExecutionFailure` with an overriding message.
    fn fail_with(&self, code: &'static str, message: impl Into<String>) -> UnitError
    where
        Self: Sized,
    {
        UnitError::ExecutionFailure {
            code: Self::spec().qualified(code),
            message: message.into(),
            context: Map::new(),
        }
    }

    /// `ExecutionFailure` carrying a context mapping for the error sink,
    /// e.g. identifiers relevant to the failure.
    fn fail_ctx(&self, code: &'static str, context: Map<String, Value>) -> UnitError
    where
        Self: Sized,
    {
        let spec = Self::spec();
        UnitError::ExecutionFailure {
            code: spec.qualified(code),
            message: spec.message_for(code).to_string(),
            context,
        }
    }
}

/// An atomic unit of work: forward action, optional inverse.
pub trait Commander: Unit {
    /// The business logic. Runs inside the host transaction boundary.
    fn up(&mut self, host: &Host, opts: &Options) -> Result<(), UnitError>;

    /// Inverse of `up`. Absence of an override means "nothing to undo".
    /// No implicit transaction is opened around it.
    fn down(&mut self, host: &Host, opts: &Options) -> Result<(), UnitError> {
        let _ = (host, opts);
        Ok(())
    }

    /// Derive fields needed by `down`, for the undo entry points.
    fn prepare_undo(&mut self, opts: &Options) -> Result<(), UnitError> {
        let _ = opts;
        Ok(())
    }

    /// Called by the driver when `up` fails, before the failure is
    /// recorded and re-raised. Atomic units have nothing recorded to
    /// unwind; a supervisor compensates its step ledger here.
    fn rollback(&mut self, host: &Host, opts: &Options) {
        let _ = (host, opts);
    }
}

/// Lifecycle states of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Created,
    Validating,
    ValidationFailed,
    Validated,
    Executing,
    ExecutionFailed,
    Executed,
    Notifying,
    Done,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::ValidationFailed | Phase::ExecutionFailed | Phase::Done
        )
    }
}

/// One invocation of a unit of work. Construct fresh per attempt; an
/// execution is consumed by its entry point and yields an `Outcome`.
pub struct Execution<'h, C: Commander> {
    host: &'h Host,
    unit: C,
    opts: Options,
    phase: Phase,
    failure: Option<UnitError>,
    id: Uuid,
    started_at: DateTime<Utc>,
    notify_enabled: bool,
    shares_transaction: bool,
}

impl<'h, C: Commander> Execution<'h, C> {
    pub fn new(host: &'h Host, unit: C, opts: Options) -> Self {
        Self {
            host,
            unit,
            opts,
            phase: Phase::Created,
            failure: None,
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            notify_enabled: true,
            shares_transaction: false,
        }
    }

    /// Suppress the notify phase for this invocation.
    pub fn without_notify(mut self) -> Self {
        self.notify_enabled = false;
        self
    }

    /// A nested invocation inside a supervisor: notification deferred,
    /// outer transaction shared.
    pub(crate) fn nested(host: &'h Host, unit: C, opts: Options) -> Self {
        let mut exec = Self::new(host, unit, opts);
        exec.notify_enabled = false;
        exec.shares_transaction = true;
        exec
    }

    pub(crate) fn into_parts(self) -> (C, Options) {
        (self.unit, self.opts)
    }

    fn record(&mut self, error: &UnitError) {
        self.failure = Some(error.clone());
        self.host.report(error, C::spec().name(), &self.opts);
    }

    fn validate_phase(&mut self) -> Result<(), UnitError> {
        self.phase = Phase::Validating;
        C::spec().check_arguments(&self.opts)?;
        self.unit.prepare(&self.opts)?;
        self.unit.check_conditions(&self.opts)?;
        self.phase = Phase::Validated;
        Ok(())
    }

    /// Argument checks, then the prepare and condition hooks. Records and
    /// re-raises any failure.
    pub(crate) fn validate(&mut self) -> Result<(), UnitError> {
        match self.validate_phase() {
            Ok(()) => Ok(()),
            Err(error) => {
                self.phase = Phase::ValidationFailed;
                self.record(&error);
                Err(error)
            }
        }
    }

    /// The forward action inside the transaction boundary. On failure the
    /// unit's rollback hook runs before the error is recorded and
    /// re-raised.
    pub(crate) fn execute(&mut self) -> Result<(), UnitError> {
        debug_assert_eq!(self.phase, Phase::Validated);
        self.phase = Phase::Executing;

        let result = if self.shares_transaction {
            self.unit.up(self.host, &self.opts)
        } else {
            let host = self.host;
            let unit = &mut self.unit;
            let opts = &self.opts;
            host.transaction().run(&mut || unit.up(host, opts))
        };

        match result {
            Ok(()) => {
                self.phase = Phase::Executed;
                Ok(())
            }
            Err(error) => {
                debug!(unit = C::spec().name(), %error, "execute failed, unwinding");
                self.unit.rollback(self.host, &self.opts);
                self.phase = Phase::ExecutionFailed;
                self.record(&error);
                Err(error)
            }
        }
    }

    /// The notify hook. Failures are always reported. Outside strict mode
    /// they are swallowed and the outcome stays successful; strict hosts
    /// surface them to the caller, raised by the bang entry points and
    /// captured into the outcome by `run`. Either way the phase reaches
    /// `Done` and the committed work is never rolled back.
    pub(crate) fn notify(&mut self) -> Result<(), UnitError> {
        debug_assert_eq!(self.phase, Phase::Executed);
        self.phase = Phase::Notifying;
        match self.unit.notify(&self.opts) {
            Ok(()) => {
                self.phase = Phase::Done;
                Ok(())
            }
            Err(error) => {
                self.host.report(&error, C::spec().name(), &self.opts);
                self.phase = Phase::Done;
                if self.host.is_strict() {
                    Err(error)
                } else {
                    warn!(unit = C::spec().name(), %error, "notify failed, swallowed");
                    Ok(())
                }
            }
        }
    }

    fn undo_phase(&mut self) -> Result<(), UnitError> {
        self.phase = Phase::Executing;
        self.unit.prepare_undo(&self.opts)?;
        let host = self.host;
        let unit = &mut self.unit;
        let opts = &self.opts;
        unit.down(host, opts)?;
        self.phase = Phase::Executed;
        Ok(())
    }

    /// Validate, execute, then notify. Validation and execution failures
    /// are re-raised after being recorded and reported; notify failures
    /// propagate only on strict hosts.
    #[instrument(skip(self), fields(unit = C::spec().name(), id = %self.id))]
    pub fn try_run(mut self) -> Result<Outcome<C>, UnitError> {
        self.validate()?;
        self.execute()?;
        if self.notify_enabled {
            self.notify()?;
        }
        Ok(self.finish())
    }

    /// Like `try_run`, but failures are captured into the outcome instead
    /// of raised. Query them through `Outcome::failed` and
    /// `Outcome::message`.
    #[instrument(skip(self), fields(unit = C::spec().name(), id = %self.id))]
    pub fn run(mut self) -> Outcome<C> {
        if self.validate().is_ok() && self.execute().is_ok() && self.notify_enabled {
            if let Err(error) = self.notify() {
                // only reachable on strict hosts
                self.failure = Some(error);
            }
        }
        self.finish()
    }

    /// Validation only; no side effect regardless of outcome.
    #[instrument(skip(self), fields(unit = C::spec().name(), id = %self.id))]
    pub fn try_dry_run(mut self) -> Result<Outcome<C>, UnitError> {
        self.validate()?;
        Ok(self.finish())
    }

    /// Non-raising dry run.
    pub fn dry_run(mut self) -> Outcome<C> {
        let _ = self.validate();
        self.finish()
    }

    /// The inverse action: `prepare_undo` then `down`, re-raising failures
    /// after recording them.
    #[instrument(skip(self), fields(unit = C::spec().name(), id = %self.id))]
    pub fn try_undo(mut self) -> Result<Outcome<C>, UnitError> {
        match self.undo_phase() {
            Ok(()) => Ok(self.finish()),
            Err(error) => {
                self.phase = Phase::ExecutionFailed;
                self.record(&error);
                Err(error)
            }
        }
    }

    /// Non-raising undo.
    pub fn undo(mut self) -> Outcome<C> {
        if let Err(error) = self.undo_phase() {
            self.phase = Phase::ExecutionFailed;
            self.record(&error);
        }
        self.finish()
    }

    fn finish(self) -> Outcome<C> {
        Outcome {
            unit: self.unit,
            phase: self.phase,
            failure: self.failure,
            id: self.id,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// A finished invocation: the unit itself plus its final phase and, on
/// failure, the recorded error.
#[derive(Debug)]
pub struct Outcome<C> {
    unit: C,
    phase: Phase,
    failure: Option<UnitError>,
    id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl<C> Outcome<C> {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn error(&self) -> Option<&UnitError> {
        self.failure.as_ref()
    }

    /// Human-readable failure message; `None` iff the invocation
    /// succeeded.
    pub fn message(&self) -> Option<String> {
        self.failure.as_ref().map(|e| e.to_string())
    }

    pub fn code(&self) -> Option<&str> {
        self.failure.as_ref().and_then(UnitError::code)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn unit(&self) -> &C {
        &self.unit
    }

    pub fn into_unit(self) -> C {
        self.unit
    }

    /// Run `f` when the invocation succeeded; returns self for chaining.
    pub fn on_success(self, f: impl FnOnce(&Self)) -> Self {
        if self.success() {
            f(&self);
        }
        self
    }

    /// Run `f` when the invocation failed; returns self for chaining.
    pub fn on_failure(self, f: impl FnOnce(&Self)) -> Self {
        if self.failed() {
            f(&self);
        }
        self
    }
}

/// Validate, execute, notify; failures raised.
pub fn try_run<C: Commander>(
    host: &Host,
    unit: C,
    opts: Options,
) -> Result<Outcome<C>, UnitError> {
    Execution::new(host, unit, opts).try_run()
}

/// Validate, execute, notify; failures captured into the outcome.
pub fn run<C: Commander>(host: &Host, unit: C, opts: Options) -> Outcome<C> {
    Execution::new(host, unit, opts).run()
}

/// Validation only; failures raised.
pub fn try_dry_run<C: Commander>(
    host: &Host,
    unit: C,
    opts: Options,
) -> Result<Outcome<C>, UnitError> {
    Execution::new(host, unit, opts).try_dry_run()
}

/// Validation only; failures captured.
pub fn dry_run<C: Commander>(host: &Host, unit: C, opts: Options) -> Outcome<C> {
    Execution::new(host, unit, opts).dry_run()
}

/// Inverse action; failures raised.
pub fn try_undo<C: Commander>(
    host: &Host,
    unit: C,
    opts: Options,
) -> Result<Outcome<C>, UnitError> {
    Execution::new(host, unit, opts).try_undo()
}

/// Inverse action; failures captured.
pub fn undo<C: Commander>(host: &Host, unit: C, opts: Options) -> Outcome<C> {
    Execution::new(host, unit, opts).undo()
}
