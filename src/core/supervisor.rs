//! Step-sequencing orchestration with compensating rollback.
//!
//! An `Orchestrate` type supplies a hook that records steps — nested
//! commander invocations or inline closures — in call order. `Supervisor`
//! wraps it into a `Commander`, so the ordinary lifecycle drives it; when
//! any step fails, every previously recorded step is compensated in
//! reverse order before the original failure is surfaced.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::Host;
use crate::core::commander::{self, Commander, Execution, Outcome, Unit};
use crate::core::step::{InlineStep, Step, StepLedger};
use crate::domain::{Options, UnitError, UnitSpec};

/// A unit of work whose execute phase is composed of recorded steps.
pub trait Orchestrate: Unit {
    /// Record the orchestration's steps through `steps`, in the order they
    /// must execute. Returning an error — including one raised after every
    /// step succeeded — triggers reverse-order compensation of everything
    /// recorded so far.
    fn orchestrate(&mut self, steps: &mut Steps<'_, Self>, opts: &Options) -> Result<(), UnitError>
    where
        Self: Sized;
}

/// The step-recording view handed to the orchestrate hook.
pub struct Steps<'a, S: 'static> {
    ledger: &'a mut StepLedger<S>,
    host: &'a Host,
}

impl<'a, S: 'static> Steps<'a, S> {
    pub(crate) fn new(ledger: &'a mut StepLedger<S>, host: &'a Host) -> Self {
        Self { ledger, host }
    }

    /// Number of steps recorded so far.
    pub fn recorded(&self) -> usize {
        self.ledger.len()
    }

    /// Run an inline step: execute its `up` closure immediately, record
    /// the step, and hand back the produced value. If `up` fails nothing
    /// is recorded — there is nothing to undo — and the error propagates,
    /// leaving earlier steps eligible for rollback.
    pub fn push<T: Clone + 'static>(
        &mut self,
        owner: &mut S,
        step: InlineStep<S, T>,
    ) -> Result<T, UnitError> {
        let InlineStep { up, down, notify } = step;
        let value = up(owner)?;

        let cell = Rc::new(RefCell::new(value.clone()));
        let mut entry = Step::new();
        if let Some(mut action) = down {
            let result = Rc::clone(&cell);
            entry.set_down(Box::new(move |owner: &mut S, _host: &Host| {
                action(owner, &mut result.borrow_mut())
            }));
        }
        if let Some(mut action) = notify {
            let result = Rc::clone(&cell);
            entry.set_notify(Box::new(move |owner: &mut S| {
                action(owner, &mut result.borrow_mut())
            }));
        }
        self.ledger.append(entry);
        Ok(value)
    }

    /// Run a nested commander as a step: validate and execute it with its
    /// notification deferred, sharing the outer transaction. The recorded
    /// step's compensation is the nested unit's `down`; its notification
    /// re-invokes the nested unit's `notify`. Returns a handle to the
    /// completed nested unit.
    pub fn invoke<C: Commander + 'static>(
        &mut self,
        unit: C,
        opts: Options,
    ) -> Result<Rc<RefCell<C>>, UnitError> {
        let mut exec = Execution::nested(self.host, unit, opts);
        exec.validate()?;
        exec.execute()?;
        let (unit, opts) = exec.into_parts();

        let cell = Rc::new(RefCell::new(unit));
        let opts = Rc::new(opts);
        let mut entry = Step::new();
        {
            let unit = Rc::clone(&cell);
            let opts = Rc::clone(&opts);
            entry.set_down(Box::new(move |_owner: &mut S, host: &Host| {
                unit.borrow_mut().down(host, &opts)
            }));
        }
        {
            let unit = Rc::clone(&cell);
            let opts = Rc::clone(&opts);
            entry.set_notify(Box::new(move |_owner: &mut S| {
                unit.borrow_mut().notify(&opts)
            }));
        }
        self.ledger.append(entry);
        Ok(cell)
    }
}

/// Turns an `Orchestrate` type into a `Commander` with a step ledger, so
/// the shared lifecycle driver runs it. Construct fresh per invocation;
/// the ledger belongs to one execute phase.
pub struct Supervisor<S: Orchestrate + 'static> {
    inner: S,
    ledger: StepLedger<S>,
}

impl<S: Orchestrate + std::fmt::Debug + 'static> std::fmt::Debug for Supervisor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("inner", &self.inner)
            .field("steps_recorded", &self.ledger.len())
            .finish()
    }
}

impl<S: Orchestrate + 'static> Supervisor<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            ledger: StepLedger::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Steps recorded by the last execute phase.
    pub fn steps_recorded(&self) -> usize {
        self.ledger.len()
    }

    /// Validate, orchestrate, notify; failures raised.
    pub fn try_run(host: &Host, inner: S, opts: Options) -> Result<Outcome<Self>, UnitError> {
        commander::try_run(host, Self::new(inner), opts)
    }

    /// Validate, orchestrate, notify; failures captured into the outcome.
    pub fn run(host: &Host, inner: S, opts: Options) -> Outcome<Self> {
        commander::run(host, Self::new(inner), opts)
    }

    /// Validation only; failures raised.
    pub fn try_dry_run(host: &Host, inner: S, opts: Options) -> Result<Outcome<Self>, UnitError> {
        commander::try_dry_run(host, Self::new(inner), opts)
    }

    /// Validation only; failures captured.
    pub fn dry_run(host: &Host, inner: S, opts: Options) -> Outcome<Self> {
        commander::dry_run(host, Self::new(inner), opts)
    }
}

impl<S: Orchestrate + 'static> Unit for Supervisor<S> {
    fn spec() -> &'static UnitSpec {
        S::spec()
    }

    fn prepare(&mut self, opts: &Options) -> Result<(), UnitError> {
        self.inner.prepare(opts)
    }

    fn check_conditions(&self, opts: &Options) -> Result<(), UnitError> {
        self.inner.check_conditions(opts)
    }

    /// Every step's notification in forward order, then the
    /// orchestrator's own hook. The first failure propagates to the
    /// driver, which applies ordinary swallow-or-strict semantics.
    fn notify(&mut self, opts: &Options) -> Result<(), UnitError> {
        self.ledger.notify_all(&mut self.inner)?;
        self.inner.notify(opts)
    }
}

impl<S: Orchestrate + 'static> Commander for Supervisor<S> {
    fn up(&mut self, host: &Host, opts: &Options) -> Result<(), UnitError> {
        let mut steps = Steps::new(&mut self.ledger, host);
        self.inner.orchestrate(&mut steps, opts)
    }

    /// Undo entry point: same reverse compensation pass as a failed
    /// execute.
    fn down(&mut self, host: &Host, opts: &Options) -> Result<(), UnitError> {
        self.ledger
            .unwind(&mut self.inner, host, S::spec().name(), opts);
        Ok(())
    }

    fn rollback(&mut self, host: &Host, opts: &Options) {
        debug!(
            unit = S::spec().name(),
            steps = self.ledger.len(),
            "rolling back recorded steps"
        );
        self.ledger
            .unwind(&mut self.inner, host, S::spec().name(), opts);
    }
}
