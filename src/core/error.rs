use rust_decimal::Decimal;
use std::fmt;

/// A single broken rule found while validating a band, group or model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("ceiling [{ceiling}] must be greater than floor [{floor}]")]
    CeilingNotAboveFloor { floor: u64, ceiling: u64 },
    #[error("only one of rate or flat_charge may be set, not both")]
    RateAndFlatCharge,
    #[error("either rate or flat_charge must be set")]
    MissingCharge,
    #[error("rate [{0}] must be between 0 and 1 inclusive")]
    RateOutOfRange(Decimal),
    #[error("a rule must contain at least one band")]
    NoBands,
    #[error("floor of first band must be 0, found [{0}]")]
    FirstFloorNotZero(u64),
    #[error("band {index} floor [{floor}] does not match ceiling [{previous_ceiling}] of previous band")]
    Discontiguous {
        index: usize,
        floor: u64,
        previous_ceiling: u64,
    },
    #[error("a tax model must contain at least one rule")]
    NoRules,
    #[error("conversion multiplier [{0}] must be greater than 0")]
    NonPositiveMultiplier(Decimal),
    #[error("[{value}] scaled by [{multiplier}] is too large to represent")]
    ScaleOverflow { value: Decimal, multiplier: Decimal },
    #[error("withdrawal rate [{0}] must not be negative")]
    NegativeWithdrawalRate(Decimal),
    #[error("income sample step must be greater than 0")]
    ZeroStep,
    #[error("income range yields {count} sample points, at most {max} are allowed")]
    TooManySamples { count: u64, max: u64 },
    #[error("{subject}: {violation}")]
    Nested {
        subject: String,
        violation: Box<Violation>,
    },
}

/// Raised when rule data breaks one or more structural invariants.
///
/// Carries every violation found so a table author can fix them in one pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ValidationError {
    subject: String,
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(subject: impl Into<String>, violations: Vec<Violation>) -> Self {
        ValidationError {
            subject: subject.into(),
            violations,
        }
    }

    /// `Ok(())` when nothing was violated, otherwise the collected error.
    pub fn check(subject: impl Into<String>, violations: Vec<Violation>) -> Result<(), Self> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self::new(subject, violations))
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Flatten this error's violations under its subject, for embedding in a parent error.
    pub fn into_nested(self) -> Vec<Violation> {
        let subject = self.subject;
        self.violations
            .into_iter()
            .map(|violation| Violation::Nested {
                subject: subject.clone(),
                violation: Box::new(violation),
            })
            .collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} ({} problem{}):",
            self.subject,
            self.violations.len(),
            if self.violations.len() == 1 { "" } else { "s" }
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}
