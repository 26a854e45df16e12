use super::band::truncate;
use super::error::Violation;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// An income-dependent deduction applied before a rule's bands are evaluated.
pub trait AllowancePolicy: fmt::Debug + Send + Sync {
    /// Deduction for the given pre-deduction amount.
    fn evaluate(&self, taxable: u64) -> u64;

    /// Parameters this policy cannot be evaluated with.
    fn violations(&self) -> Vec<Violation> {
        Vec::new()
    }
}

/// Deduction subtracted from the amount before band evaluation.
#[derive(Debug, Clone)]
pub enum Allowance {
    Fixed(u64),
    Policy(Arc<dyn AllowancePolicy>),
}

impl Default for Allowance {
    fn default() -> Self {
        Allowance::Fixed(0)
    }
}

impl From<u64> for Allowance {
    fn from(value: u64) -> Self {
        Allowance::Fixed(value)
    }
}

impl Allowance {
    pub fn policy<P: AllowancePolicy + 'static>(policy: P) -> Self {
        Allowance::Policy(Arc::new(policy))
    }

    pub fn evaluate(&self, taxable: u64) -> u64 {
        match self {
            Allowance::Fixed(value) => *value,
            Allowance::Policy(policy) => policy.evaluate(taxable),
        }
    }

    pub fn violations(&self) -> Vec<Violation> {
        match self {
            Allowance::Fixed(_) => Vec::new(),
            Allowance::Policy(policy) => policy.violations(),
        }
    }
}

/// A share of the amount, never less than `minimum` and optionally capped.
///
/// With `rate = 0.7` and `minimum = 2000` this is the deduction used for
/// Spanish self-employed (autonomo) income.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProportionalAllowance {
    pub rate: Decimal,
    pub minimum: u64,
    pub cap: Option<u64>,
}

impl AllowancePolicy for ProportionalAllowance {
    fn evaluate(&self, taxable: u64) -> u64 {
        let share = self
            .rate
            .checked_mul(Decimal::from(taxable))
            .map_or(u64::MAX, truncate)
            .max(self.minimum);
        match self.cap {
            Some(cap) => share.min(cap),
            None => share,
        }
    }

    fn violations(&self) -> Vec<Violation> {
        if self.rate < Decimal::ZERO || self.rate > Decimal::ONE {
            vec![Violation::RateOutOfRange(self.rate)]
        } else {
            Vec::new()
        }
    }
}

/// A fixed allowance withdrawn once the amount passes a threshold.
///
/// Above `threshold` the allowance shrinks by `withdrawal_rate` for every unit
/// of excess, down to zero. The UK personal allowance is `base = 12570`,
/// `threshold = 100000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaperedAllowance {
    pub base: u64,
    pub threshold: u64,
    pub withdrawal_rate: Decimal,
}

impl AllowancePolicy for TaperedAllowance {
    fn evaluate(&self, taxable: u64) -> u64 {
        if taxable <= self.threshold {
            return self.base;
        }
        let withdrawn = Decimal::from(taxable - self.threshold)
            .checked_mul(self.withdrawal_rate)
            .map_or(u64::MAX, truncate);
        self.base.saturating_sub(withdrawn)
    }

    fn violations(&self) -> Vec<Violation> {
        if self.withdrawal_rate.is_sign_negative() && !self.withdrawal_rate.is_zero() {
            vec![Violation::NegativeWithdrawalRate(self.withdrawal_rate)]
        } else {
            Vec::new()
        }
    }
}
