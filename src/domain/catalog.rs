//! Per-type unit configuration: declared arguments and error catalog.
//!
//! Each concrete unit type builds one `UnitSpec` inside a `OnceLock` in its
//! `spec()` implementation, so the catalog is constructed once and shared
//! for the life of the process.

use super::error::UnitError;
use super::options::{ArgKind, Options};

/// Immutable configuration for one concrete unit type: its name, the
/// arguments it requires, and the default message for each symbolic
/// error code it can raise.
#[derive(Debug, Clone)]
pub struct UnitSpec {
    name: &'static str,
    arguments: Vec<(&'static str, Vec<ArgKind>)>,
    errors: Vec<(&'static str, &'static str)>,
}

impl UnitSpec {
    /// Start a spec for the unit type with the given name. The name is
    /// used as the code prefix in raised errors and in sink reports.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            arguments: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Declare a required argument with a single accepted kind.
    pub fn arg(self, param: &'static str, kind: ArgKind) -> Self {
        self.arg_any(param, &[kind])
    }

    /// Declare a required argument accepting any of several kinds.
    pub fn arg_any(mut self, param: &'static str, kinds: &[ArgKind]) -> Self {
        self.arguments.push((param, kinds.to_vec()));
        self
    }

    /// Register a symbolic error code with its default message.
    pub fn error(mut self, code: &'static str, message: &'static str) -> Self {
        self.errors.push((code, message));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Default message for a code. Unknown codes fall back to the code
    /// itself so a failure is never rendered without text.
    pub fn message_for<'a>(&'a self, code: &'a str) -> &'a str {
        self.errors
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, message)| *message)
            .unwrap_or(code)
    }

    /// Code as surfaced to callers: prefixed with the unit name.
    pub fn qualified(&self, code: &str) -> String {
        format!("{}-{}", self.name, code)
    }

    /// Check every declared argument against the options mapping. The
    /// first missing or kind-mismatched argument fails the whole check;
    /// nothing else runs after it.
    pub fn check_arguments(&self, opts: &Options) -> Result<(), UnitError> {
        for (param, kinds) in &self.arguments {
            match opts.get(param) {
                None => {
                    return Err(UnitError::ArgumentMismatch {
                        param: (*param).to_string(),
                        expected: kinds.clone(),
                        actual: None,
                    });
                }
                Some(value) if !kinds.iter().any(|kind| kind.admits(value)) => {
                    return Err(UnitError::ArgumentMismatch {
                        param: (*param).to_string(),
                        expected: kinds.clone(),
                        actual: Some(ArgKind::of(value)),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> UnitSpec {
        UnitSpec::new("transfer")
            .arg("amount", ArgKind::Integer)
            .arg_any("memo", &[ArgKind::String, ArgKind::Null])
            .error("overdrawn", "Account would be overdrawn")
    }

    #[test]
    fn test_arguments_pass() {
        let opts = Options::new().with("amount", 10).with("memo", "rent");
        assert!(spec().check_arguments(&opts).is_ok());

        let opts = Options::new()
            .with("amount", 10)
            .with("memo", serde_json::Value::Null);
        assert!(spec().check_arguments(&opts).is_ok());
    }

    #[test]
    fn test_missing_argument() {
        let opts = Options::new().with("memo", "rent");
        let err = spec().check_arguments(&opts).unwrap_err();
        match err {
            UnitError::ArgumentMismatch { param, actual, .. } => {
                assert_eq!(param, "amount");
                assert_eq!(actual, None);
            }
            other => panic!("expected ArgumentMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_mismatch() {
        let opts = Options::new().with("amount", "ten").with("memo", "rent");
        let err = spec().check_arguments(&opts).unwrap_err();
        match err {
            UnitError::ArgumentMismatch { param, actual, .. } => {
                assert_eq!(param, "amount");
                assert_eq!(actual, Some(ArgKind::String));
            }
            other => panic!("expected ArgumentMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_catalog_lookup() {
        let spec = spec();
        assert_eq!(spec.message_for("overdrawn"), "Account would be overdrawn");
        assert_eq!(spec.message_for("unheard_of"), "unheard_of");
        assert_eq!(spec.qualified("overdrawn"), "transfer-overdrawn");
    }
}
