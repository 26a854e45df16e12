use super::error::{ValidationError, Violation};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Unvalidated band definition, as read from a rule table or model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BandSpec {
    /// Lower limit of the band (exclusive for flat charges)
    #[serde(default)]
    pub floor: u64,
    /// Upper limit of the band (inclusive)
    pub ceiling: u64,
    /// Fraction of the amount charged within the band, 0 to 1
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub rate: Option<Decimal>,
    /// Fixed amount charged when the amount falls within the band
    #[serde(default)]
    pub flat_charge: Option<u64>,
    /// Charge the whole amount at this band's rate when it falls in range
    #[serde(default)]
    pub exclusive: bool,
}

impl BandSpec {
    pub fn rate(floor: u64, ceiling: u64, rate: Decimal) -> Self {
        BandSpec {
            floor,
            ceiling,
            rate: Some(rate),
            flat_charge: None,
            exclusive: false,
        }
    }

    pub fn flat(floor: u64, ceiling: u64, flat_charge: u64) -> Self {
        BandSpec {
            floor,
            ceiling,
            rate: None,
            flat_charge: Some(flat_charge),
            exclusive: false,
        }
    }

    pub fn exclusive(self) -> Self {
        BandSpec {
            exclusive: true,
            ..self
        }
    }

    /// Every invariant this definition breaks.
    pub fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        if self.ceiling <= self.floor {
            violations.push(Violation::CeilingNotAboveFloor {
                floor: self.floor,
                ceiling: self.ceiling,
            });
        }
        match (self.rate, self.flat_charge) {
            (Some(_), Some(_)) => violations.push(Violation::RateAndFlatCharge),
            (None, None) => violations.push(Violation::MissingCharge),
            _ => {}
        }
        if let Some(rate) = self.rate {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                violations.push(Violation::RateOutOfRange(rate));
            }
        }
        violations
    }
}

/// What a band charges once its range applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    Rate(Decimal),
    Flat(u64),
}

/// A validated amount range with a rate or flat charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    floor: u64,
    ceiling: u64,
    charge: Charge,
    exclusive: bool,
}

impl TryFrom<BandSpec> for Band {
    type Error = ValidationError;

    fn try_from(spec: BandSpec) -> Result<Self, Self::Error> {
        ValidationError::check("band", spec.violations())?;
        let charge = match (spec.rate, spec.flat_charge) {
            (Some(rate), None) => Charge::Rate(rate),
            (None, Some(flat)) => Charge::Flat(flat),
            _ => return Err(ValidationError::new("band", spec.violations())),
        };
        Ok(Band {
            floor: spec.floor,
            ceiling: spec.ceiling,
            charge,
            exclusive: spec.exclusive,
        })
    }
}

impl Band {
    pub fn new(spec: BandSpec) -> Result<Self, ValidationError> {
        Band::try_from(spec)
    }

    pub fn floor(&self) -> u64 {
        self.floor
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    pub fn charge(&self) -> Charge {
        self.charge
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// `floor < amount <= ceiling`
    fn contains(&self, amount: u64) -> bool {
        self.floor < amount && amount <= self.ceiling
    }

    /// Amount payable under this band alone, truncated to whole units.
    pub fn get_payable(&self, amount: u64) -> u64 {
        match self.charge {
            Charge::Flat(charge) => {
                if self.contains(amount) {
                    charge
                } else {
                    0
                }
            }
            Charge::Rate(rate) if self.exclusive => {
                if self.contains(amount) {
                    truncate(rate * Decimal::from(amount))
                } else {
                    0
                }
            }
            Charge::Rate(rate) => {
                if amount < self.floor {
                    0
                } else if amount > self.ceiling {
                    truncate(rate * Decimal::from(self.ceiling - self.floor))
                } else {
                    truncate(rate * Decimal::from(amount - self.floor))
                }
            }
        }
    }

    /// Rescale the monetary limits and flat charge; rates are dimensionless and kept.
    pub fn convert(&self, multiplier: Decimal) -> Result<Self, ValidationError> {
        if multiplier <= Decimal::ZERO {
            return Err(ValidationError::new(
                "band conversion",
                vec![Violation::NonPositiveMultiplier(multiplier)],
            ));
        }
        let mut violations = Vec::new();
        let mut scaled = |value: u64| {
            scale(Decimal::from(value), multiplier).unwrap_or_else(|violation| {
                violations.push(violation);
                0
            })
        };
        let floor = scaled(self.floor);
        let ceiling = scaled(self.ceiling);
        let (rate, flat_charge) = match self.charge {
            Charge::Rate(rate) => (Some(rate), None),
            Charge::Flat(flat) => (None, Some(scaled(flat))),
        };
        ValidationError::check("band conversion", violations)?;
        Band::try_from(BandSpec {
            floor,
            ceiling,
            rate,
            flat_charge,
            exclusive: self.exclusive,
        })
    }
}

impl From<&Band> for BandSpec {
    fn from(band: &Band) -> Self {
        let (rate, flat_charge) = match band.charge {
            Charge::Rate(rate) => (Some(rate), None),
            Charge::Flat(flat) => (None, Some(flat)),
        };
        BandSpec {
            floor: band.floor,
            ceiling: band.ceiling,
            rate,
            flat_charge,
            exclusive: band.exclusive,
        }
    }
}

/// Truncate toward zero into whole units. Negative values clamp to 0, overflow saturates.
pub(crate) fn truncate(value: Decimal) -> u64 {
    if value.is_sign_negative() {
        return 0;
    }
    value.trunc().to_u64().unwrap_or(u64::MAX)
}

/// `value * multiplier` truncated to whole units, for non-negative operands.
///
/// Fails when the product does not fit in a `u64`.
pub(crate) fn scale(value: Decimal, multiplier: Decimal) -> Result<u64, Violation> {
    value
        .checked_mul(multiplier)
        .and_then(|scaled| scaled.trunc().to_u64())
        .ok_or(Violation::ScaleOverflow { value, multiplier })
}
