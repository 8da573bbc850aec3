//! Commander lifecycle integration tests.
//!
//! Exercises the validate/execute/notify phases, bang vs non-bang entry
//! points, dry runs, undo, strict-mode notification handling, and the
//! transaction boundary.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex, OnceLock};

use andon::{
    ArgKind, Commander, ErrorSink, Host, Options, Phase, ReportContext, Transaction, Unit,
    UnitError, UnitSpec,
};

/// Sink fake capturing every report, for asserting what the host learned.
#[derive(Default)]
struct CollectingSink(Mutex<Vec<(String, String)>>);

impl CollectingSink {
    fn reports(&self) -> Vec<(String, String)> {
        self.0.lock().unwrap().clone()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, error: &UnitError, ctx: &ReportContext<'_>) {
        self.0
            .lock()
            .unwrap()
            .push((ctx.unit.to_string(), error.to_string()));
    }
}

/// Transaction fake counting begin/commit/rollback.
#[derive(Default)]
struct CountingTx {
    begun: Mutex<u32>,
    committed: Mutex<u32>,
    rolled_back: Mutex<u32>,
}

impl CountingTx {
    fn counts(&self) -> (u32, u32, u32) {
        (
            *self.begun.lock().unwrap(),
            *self.committed.lock().unwrap(),
            *self.rolled_back.lock().unwrap(),
        )
    }
}

impl Transaction for CountingTx {
    fn run(&self, body: &mut dyn FnMut() -> Result<(), UnitError>) -> Result<(), UnitError> {
        *self.begun.lock().unwrap() += 1;
        match body() {
            Ok(()) => {
                *self.committed.lock().unwrap() += 1;
                Ok(())
            }
            Err(error) => {
                *self.rolled_back.lock().unwrap() += 1;
                Err(error)
            }
        }
    }
}

/// Appends a line of text to a shared list; notification appends to a
/// shared log. The list stands in for an external resource.
#[derive(Debug, Default, Clone)]
struct AppendLine {
    list: Rc<RefCell<Vec<String>>>,
    log: Rc<RefCell<Vec<String>>>,
}

impl Unit for AppendLine {
    fn spec() -> &'static UnitSpec {
        static SPEC: OnceLock<UnitSpec> = OnceLock::new();
        SPEC.get_or_init(|| {
            UnitSpec::new("append_line")
                .arg("text", ArgKind::String)
                .error("list_full", "List cannot hold more than one entry")
                .error("refused", "The line was refused")
                .error("stuck", "The line cannot be removed")
        })
    }

    fn check_conditions(&self, _opts: &Options) -> Result<(), UnitError> {
        self.condition("list_full", self.list.borrow().len() <= 1)
    }

    fn notify(&mut self, opts: &Options) -> Result<(), UnitError> {
        if opts.get_bool("break_notify").unwrap_or(false) {
            return Err(self.fail_with("notify_broken", "notify exploded"));
        }
        self.log.borrow_mut().push("a line was appended".to_string());
        Ok(())
    }
}

impl Commander for AppendLine {
    fn up(&mut self, _host: &Host, opts: &Options) -> Result<(), UnitError> {
        if opts.get_bool("refuse").unwrap_or(false) {
            return Err(self.fail("refused"));
        }
        let text = opts.get_str("text").unwrap_or_default().to_string();
        self.list.borrow_mut().push(text);
        Ok(())
    }

    fn down(&mut self, _host: &Host, opts: &Options) -> Result<(), UnitError> {
        if opts.get_bool("refuse_undo").unwrap_or(false) {
            return Err(self.fail("stuck"));
        }
        self.list.borrow_mut().pop();
        Ok(())
    }
}

fn valid_opts() -> Options {
    Options::new().with("text", "hello")
}

/// Route phase logs through the test harness, honoring `RUST_LOG`.
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_test_writer())
        .try_init();
}

#[test]
fn test_try_run_success() {
    let host = Host::new();
    let unit = AppendLine::default();
    let list = unit.list.clone();
    let log = unit.log.clone();

    let outcome = andon::try_run(&host, unit, valid_opts()).unwrap();
    assert!(outcome.success());
    assert_eq!(outcome.phase(), Phase::Done);
    assert_eq!(outcome.message(), None);
    assert_eq!(list.borrow().as_slice(), ["hello"]);
    assert_eq!(log.borrow().as_slice(), ["a line was appended"]);
}

#[test]
fn test_try_run_raises_condition_not_met() {
    let host = Host::new();
    let unit = AppendLine::default();
    unit.list.borrow_mut().push("one".to_string());
    unit.list.borrow_mut().push("two".to_string());
    let list = unit.list.clone();
    let log = unit.log.clone();

    let err = andon::try_run(&host, unit, valid_opts()).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.code(), Some("append_line-list_full"));
    assert_eq!(err.to_string(), "List cannot hold more than one entry");
    assert_eq!(list.borrow().len(), 2);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_run_captures_validation_failure() {
    let sink = Arc::new(CollectingSink::default());
    let host = Host::new().with_sink(sink.clone());
    let unit = AppendLine::default();
    unit.list.borrow_mut().push("one".to_string());
    unit.list.borrow_mut().push("two".to_string());

    let outcome = andon::run(&host, unit, valid_opts());
    assert!(outcome.failed());
    assert_eq!(outcome.phase(), Phase::ValidationFailed);
    assert_eq!(
        outcome.message().as_deref(),
        Some("List cannot hold more than one entry")
    );
    // recorded failures reach the sink even when not re-raised
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "append_line");
}

#[test]
fn test_missing_argument_short_circuits() {
    let host = Host::new();
    let unit = AppendLine::default();
    let list = unit.list.clone();

    let err = andon::try_run(&host, unit, Options::new()).unwrap_err();
    match err {
        UnitError::ArgumentMismatch { ref param, ref actual, .. } => {
            assert_eq!(param, "text");
            assert_eq!(*actual, None);
        }
        ref other => panic!("expected ArgumentMismatch, got {other:?}"),
    }
    assert!(list.borrow().is_empty());
}

#[test]
fn test_wrong_kind_argument() {
    let host = Host::new();
    let err = andon::try_run(&host, AppendLine::default(), Options::new().with("text", 42))
        .unwrap_err();
    match err {
        UnitError::ArgumentMismatch { actual, .. } => {
            assert_eq!(actual, Some(ArgKind::Integer));
        }
        other => panic!("expected ArgumentMismatch, got {other:?}"),
    }
}

#[test]
fn test_run_captures_execution_failure() {
    let host = Host::new();
    let unit = AppendLine::default();
    let list = unit.list.clone();
    let log = unit.log.clone();

    let outcome = andon::run(&host, unit, valid_opts().with("refuse", true));
    assert!(outcome.failed());
    assert_eq!(outcome.phase(), Phase::ExecutionFailed);
    assert_eq!(outcome.code(), Some("append_line-refused"));
    assert!(!outcome.error().unwrap().is_validation());
    assert!(list.borrow().is_empty());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_dry_run_is_idempotent_and_side_effect_free() {
    let host = Host::new();
    let unit = AppendLine::default();
    let list = unit.list.clone();
    let log = unit.log.clone();

    let first = andon::dry_run(&host, unit, valid_opts());
    assert!(first.success());
    assert!(list.borrow().is_empty());
    assert!(log.borrow().is_empty());

    let second = andon::dry_run(&host, first.into_unit(), valid_opts());
    assert!(second.success());
    assert!(list.borrow().is_empty());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_try_dry_run_raises_on_invalid_input() {
    let host = Host::new();
    let unit = AppendLine::default();
    unit.list.borrow_mut().push("one".to_string());
    unit.list.borrow_mut().push("two".to_string());
    let list = unit.list.clone();

    let err = andon::try_dry_run(&host, unit, valid_opts()).unwrap_err();
    assert_eq!(err.code(), Some("append_line-list_full"));
    assert_eq!(list.borrow().len(), 2);
}

#[test]
fn test_notify_failure_swallowed_but_reported() {
    init_tracing();
    let sink = Arc::new(CollectingSink::default());
    let host = Host::new().with_sink(sink.clone());
    let unit = AppendLine::default();
    let list = unit.list.clone();

    let outcome = andon::try_run(&host, unit, valid_opts().with("break_notify", true)).unwrap();
    // the committed work stays valid
    assert!(outcome.success());
    assert_eq!(list.borrow().as_slice(), ["hello"]);

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].1.contains("notify exploded"));
}

#[test]
fn test_notify_failure_raised_on_strict_host() {
    let host = Host::new().strict(true);
    let unit = AppendLine::default();
    let list = unit.list.clone();

    let err = andon::try_run(&host, unit, valid_opts().with("break_notify", true)).unwrap_err();
    assert!(err.to_string().contains("notify exploded"));
    // execution had already committed before notify ran
    assert_eq!(list.borrow().as_slice(), ["hello"]);
}

#[test]
fn test_strict_run_captures_notify_failure_without_rollback() {
    let sink = Arc::new(CollectingSink::default());
    let host = Host::new().strict(true).with_sink(sink.clone());
    let unit = AppendLine::default();
    let list = unit.list.clone();

    let outcome = andon::run(&host, unit, valid_opts().with("break_notify", true));
    assert!(outcome.failed());
    assert!(outcome.message().unwrap().contains("notify exploded"));
    // the phase still completed and the executed work stays committed
    assert_eq!(outcome.phase(), Phase::Done);
    assert_eq!(list.borrow().as_slice(), ["hello"]);
    assert_eq!(sink.reports().len(), 1);
}

#[test]
fn test_transaction_commits_on_success() {
    let tx = Arc::new(CountingTx::default());
    let host = Host::new().with_transaction(tx.clone());

    let outcome = andon::run(&host, AppendLine::default(), valid_opts());
    assert!(outcome.success());
    assert_eq!(tx.counts(), (1, 1, 0));
}

#[test]
fn test_transaction_rolls_back_on_execution_failure() {
    let tx = Arc::new(CountingTx::default());
    let host = Host::new().with_transaction(tx.clone());

    let outcome = andon::run(&host, AppendLine::default(), valid_opts().with("refuse", true));
    assert!(outcome.failed());
    assert_eq!(tx.counts(), (1, 0, 1));
}

#[test]
fn test_validation_failure_never_opens_a_transaction() {
    let tx = Arc::new(CountingTx::default());
    let host = Host::new().with_transaction(tx.clone());

    let outcome = andon::run(&host, AppendLine::default(), Options::new());
    assert!(outcome.failed());
    assert_eq!(tx.counts(), (0, 0, 0));
}

#[test]
fn test_undo_runs_the_inverse() {
    let host = Host::new();
    let unit = AppendLine::default();
    unit.list.borrow_mut().push("hello".to_string());
    let list = unit.list.clone();

    let outcome = andon::undo(&host, unit, valid_opts());
    assert!(outcome.success());
    assert!(list.borrow().is_empty());
}

#[test]
fn test_try_undo_records_and_raises_down_failure() {
    let sink = Arc::new(CollectingSink::default());
    let host = Host::new().with_sink(sink.clone());
    let unit = AppendLine::default();
    unit.list.borrow_mut().push("hello".to_string());
    let list = unit.list.clone();

    let err = andon::try_undo(&host, unit, valid_opts().with("refuse_undo", true)).unwrap_err();
    assert_eq!(err.code(), Some("append_line-stuck"));
    assert_eq!(err.to_string(), "The line cannot be removed");
    assert_eq!(list.borrow().as_slice(), ["hello"]);
    assert_eq!(sink.reports().len(), 1);
}

#[test]
fn test_undo_captures_down_failure() {
    let host = Host::new();
    let unit = AppendLine::default();
    unit.list.borrow_mut().push("hello".to_string());

    let outcome = andon::undo(&host, unit, valid_opts().with("refuse_undo", true));
    assert!(outcome.failed());
    assert_eq!(outcome.phase(), Phase::ExecutionFailed);
    assert!(outcome.phase().is_terminal());
    assert_eq!(outcome.code(), Some("append_line-stuck"));
}
