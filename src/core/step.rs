//! Recorded units of change inside an orchestration.
//!
//! A `Step` pairs an already-executed forward action with an optional
//! compensating action and an optional notification. The action's result
//! is bound into those closures at construction, so a compensation acts on
//! what was actually produced. Steps live in an append-only `StepLedger`
//! owned by one supervisor execution and discarded with it.

use tracing::warn;

use crate::config::Host;
use crate::domain::{Options, UnitError};

pub(crate) type DownAction<S> = Box<dyn FnMut(&mut S, &Host) -> Result<(), UnitError>>;
pub(crate) type NotifyAction<S> = Box<dyn FnMut(&mut S) -> Result<(), UnitError>>;

/// One recorded unit of change. Absent actions are no-ops.
pub struct Step<S: 'static> {
    down: Option<DownAction<S>>,
    notify: Option<NotifyAction<S>>,
}

impl<S> Step<S> {
    pub(crate) fn new() -> Self {
        Self {
            down: None,
            notify: None,
        }
    }

    pub(crate) fn set_down(&mut self, action: DownAction<S>) {
        self.down = Some(action);
    }

    pub(crate) fn set_notify(&mut self, action: NotifyAction<S>) {
        self.notify = Some(action);
    }

    pub fn has_down(&self) -> bool {
        self.down.is_some()
    }

    pub fn has_notify(&self) -> bool {
        self.notify.is_some()
    }

    pub(crate) fn run_down(&mut self, owner: &mut S, host: &Host) -> Result<(), UnitError> {
        match self.down.as_mut() {
            Some(action) => action(owner, host),
            None => Ok(()),
        }
    }

    pub(crate) fn run_notify(&mut self, owner: &mut S) -> Result<(), UnitError> {
        match self.notify.as_mut() {
            Some(action) => action(owner),
            None => Ok(()),
        }
    }
}

/// Append-only, ordered sequence of steps recorded during one execute
/// phase.
pub struct StepLedger<S: 'static> {
    steps: Vec<Step<S>>,
}

impl<S> Default for StepLedger<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StepLedger<S> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn append(&mut self, step: Step<S>) {
        self.steps.push(step);
    }

    /// Compensate every recorded step in reverse order. A failing
    /// compensation is converted to `UnitError::Rollback`, reported, and
    /// skipped over so the whole reverse pass always completes; the
    /// original failure stays the one the caller sees.
    pub(crate) fn unwind(&mut self, owner: &mut S, host: &Host, unit: &str, opts: &Options) {
        for (index, step) in self.steps.iter_mut().enumerate().rev() {
            if let Err(cause) = step.run_down(owner, host) {
                warn!(step = index, error = %cause, "compensation failed, continuing unwind");
                let error = UnitError::Rollback {
                    step: index,
                    message: cause.to_string(),
                };
                host.report(&error, unit, opts);
            }
        }
    }

    /// Run every step's notification in forward order, stopping at the
    /// first failure.
    pub(crate) fn notify_all(&mut self, owner: &mut S) -> Result<(), UnitError> {
        for step in &mut self.steps {
            step.run_notify(owner)?;
        }
        Ok(())
    }
}

pub(crate) type UpAction<S, T> = Box<dyn FnOnce(&mut S) -> Result<T, UnitError>>;
pub(crate) type ResultAction<S, T> = Box<dyn FnMut(&mut S, &mut T) -> Result<(), UnitError>>;

/// Builder for a step defined by closures, for orchestration-only side
/// effects that don't warrant a full `Commander` type. The `down` and
/// `notify` closures receive the value `up` produced.
pub struct InlineStep<S: 'static, T: 'static> {
    pub(crate) up: UpAction<S, T>,
    pub(crate) down: Option<ResultAction<S, T>>,
    pub(crate) notify: Option<ResultAction<S, T>>,
}

impl<S, T> InlineStep<S, T> {
    pub fn up(action: impl FnOnce(&mut S) -> Result<T, UnitError> + 'static) -> Self {
        Self {
            up: Box::new(action),
            down: None,
            notify: None,
        }
    }

    pub fn down(
        mut self,
        action: impl FnMut(&mut S, &mut T) -> Result<(), UnitError> + 'static,
    ) -> Self {
        self.down = Some(Box::new(action));
        self
    }

    pub fn notify(
        mut self,
        action: impl FnMut(&mut S, &mut T) -> Result<(), UnitError> + 'static,
    ) -> Self {
        self.notify = Some(Box::new(action));
        self
    }
}
