//! Request entity validation.
//!
//! Entities describe their own constraints by implementing [`Validate`]; a
//! [`Validator`] engine installed in the deployment decides how the collected
//! violations are reported.

use std::fmt;

use serde::Serialize;

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    /// Path of the offending property, e.g. `address.zip`.
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl ConstraintViolation {
    /// Creates a violation.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.message)
    }
}

/// A non-empty set of violations produced by a [`Validator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ConstraintViolation>);

impl ValidationErrors {
    /// Wraps a list of violations.
    pub fn new(violations: Vec<ConstraintViolation>) -> Self {
        Self(violations)
    }

    /// The violations, in the order they were reported.
    pub fn violations(&self) -> &[ConstraintViolation] {
        &self.0
    }

    /// Violation messages formatted as `path message`.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Collects violations while an entity checks its constraints.
#[derive(Debug, Default)]
pub struct ViolationReport {
    violations: Vec<ConstraintViolation>,
}

impl ViolationReport {
    /// Records a violation at `path` unless `valid` holds.
    pub fn check(&mut self, valid: bool, path: &str, message: &str) -> &mut Self {
        if !valid {
            self.violations.push(ConstraintViolation::new(path, message));
        }
        self
    }

    /// Records a violation unconditionally.
    pub fn push(&mut self, violation: ConstraintViolation) -> &mut Self {
        self.violations.push(violation);
        self
    }

    /// Returns true when nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    fn into_violations(self) -> Vec<ConstraintViolation> {
        self.violations
    }
}

/// An entity with declarative constraints.
pub trait Validate {
    /// Reports every violated constraint of `self`.
    fn constraints(&self, report: &mut ViolationReport);
}

/// A validation engine.
pub trait Validator: Send + Sync + fmt::Debug {
    /// Validates `entity`, returning its violations when any constraint fails.
    fn validate(&self, entity: &dyn Validate) -> Result<(), ValidationErrors>;
}

/// The default engine: reports violations sorted by path, optionally stopping
/// at the first one.
#[derive(Debug, Clone, Default)]
pub struct StandardValidator {
    fail_fast: bool,
}

impl StandardValidator {
    /// Creates a validator reporting every violation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports only the first violation.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

impl Validator for StandardValidator {
    fn validate(&self, entity: &dyn Validate) -> Result<(), ValidationErrors> {
        let mut report = ViolationReport::default();
        entity.constraints(&mut report);

        let mut violations = report.into_violations();
        if violations.is_empty() {
            return Ok(());
        }

        if self.fail_fast {
            violations.truncate(1);
        } else {
            violations.sort_by(|a, b| a.path.cmp(&b.path));
        }
        Err(ValidationErrors::new(violations))
    }
}
