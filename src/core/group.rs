use super::allowance::Allowance;
use super::band::{Band, BandSpec};
use super::error::{ValidationError, Violation};
use rust_decimal::Decimal;

/// A named rule family: contiguous bands starting at zero plus an allowance.
#[derive(Debug, Clone)]
pub struct BandsGroup {
    name: String,
    bands: Vec<Band>,
    allowance: Allowance,
}

impl BandsGroup {
    /// Validate the band definitions and their contiguity.
    ///
    /// Every broken band and every gap or overlap is reported together.
    pub fn new(
        name: impl Into<String>,
        specs: Vec<BandSpec>,
        allowance: Allowance,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let mut violations = Vec::new();
        let mut bands = Vec::with_capacity(specs.len());

        if specs.is_empty() {
            violations.push(Violation::NoBands);
        }
        if let Some(first) = specs.first() {
            if first.floor != 0 {
                violations.push(Violation::FirstFloorNotZero(first.floor));
            }
        }
        for (index, pair) in specs.windows(2).enumerate() {
            if pair[1].floor != pair[0].ceiling {
                violations.push(Violation::Discontiguous {
                    index: index + 2,
                    floor: pair[1].floor,
                    previous_ceiling: pair[0].ceiling,
                });
            }
        }
        for (index, spec) in specs.into_iter().enumerate() {
            match Band::try_from(spec) {
                Ok(band) => bands.push(band),
                Err(err) => violations.extend(
                    ValidationError::new(format!("band {}", index + 1), err.violations().to_vec())
                        .into_nested(),
                ),
            }
        }
        violations.extend(ValidationError::new("allowance", allowance.violations()).into_nested());

        ValidationError::check(format!("rule \"{}\"", name), violations)?;
        Ok(BandsGroup {
            name,
            bands,
            allowance,
        })
    }

    pub fn with_allowance(self, allowance: Allowance) -> Result<Self, ValidationError> {
        ValidationError::check(
            format!("rule \"{}\"", self.name),
            ValidationError::new("allowance", allowance.violations()).into_nested(),
        )?;
        Ok(BandsGroup {
            allowance,
            ..self
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn allowance(&self) -> &Allowance {
        &self.allowance
    }

    /// Deduction for this amount, evaluated on the undeducted amount.
    pub fn allowance_for(&self, amount: u64) -> u64 {
        self.allowance.evaluate(amount)
    }

    /// Amount left for the bands once the allowance is deducted.
    pub fn taxable_for(&self, amount: u64) -> u64 {
        amount.saturating_sub(self.allowance_for(amount))
    }

    pub fn get_payable(&self, amount: u64) -> u64 {
        let taxable = self.taxable_for(amount);
        let payable = self
            .bands
            .iter()
            .map(|band| {
                let payable = band.get_payable(taxable);
                log::trace!(
                    "{} band ({}, {}]: taxable={}, payable={}",
                    self.name,
                    band.floor(),
                    band.ceiling(),
                    taxable,
                    payable
                );
                payable
            })
            .fold(0u64, u64::saturating_add);
        log::debug!(
            "{}: amount={}, taxable={}, payable={}",
            self.name,
            amount,
            taxable,
            payable
        );
        payable
    }

    /// Rescale every band by `multiplier`. The allowance is kept as is.
    pub fn convert(&self, multiplier: Decimal) -> Result<Self, ValidationError> {
        let subject = format!("rule \"{}\"", self.name);
        if multiplier <= Decimal::ZERO {
            return Err(ValidationError::new(
                subject,
                vec![Violation::NonPositiveMultiplier(multiplier)],
            ));
        }
        let mut violations = Vec::new();
        let mut bands = Vec::with_capacity(self.bands.len());
        for (index, band) in self.bands.iter().enumerate() {
            match band.convert(multiplier) {
                Ok(band) => bands.push(band),
                Err(err) => violations.extend(
                    ValidationError::new(format!("band {}", index + 1), err.violations().to_vec())
                        .into_nested(),
                ),
            }
        }
        ValidationError::check(subject, violations)?;
        Ok(BandsGroup {
            name: self.name.clone(),
            bands,
            allowance: self.allowance.clone(),
        })
    }
}
