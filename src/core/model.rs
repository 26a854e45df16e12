use super::error::{ValidationError, Violation};
use super::group::BandsGroup;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Increment used for the forward-difference marginal rate.
pub const DEFAULT_MARGINAL_DELTA: u64 = 100;
pub const DEFAULT_YEAR: i32 = 2025;
pub const DEFAULT_NAME: &str = "TaxModel";

/// A full tax regime: rule families applied in declaration order.
#[derive(Debug, Clone)]
pub struct TaxModel {
    name: String,
    year: i32,
    rules: Vec<BandsGroup>,
    non_sequential: bool,
}

/// Payable under one rule of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulePayable {
    pub name: String,
    pub payable: u64,
    /// `payable` as a share of the evaluated amount
    pub effective_rate: Decimal,
}

/// Outcome of evaluating a model for a single amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxResults {
    pub amount: u64,
    pub rules: Vec<RulePayable>,
    pub total_payable: u64,
    pub take_home: i64,
    pub effective_rate: Decimal,
}

impl TaxResults {
    pub fn payable_for(&self, rule: &str) -> Option<u64> {
        self.rules
            .iter()
            .find(|r| r.name == rule)
            .map(|r| r.payable)
    }

    /// Flat mapping keyed by rule name plus `total payable`, `take home` and `effective rate`.
    pub fn to_map(&self) -> BTreeMap<String, Decimal> {
        let mut map: BTreeMap<String, Decimal> = self
            .rules
            .iter()
            .map(|r| (r.name.clone(), Decimal::from(r.payable)))
            .collect();
        map.insert("total payable".to_string(), Decimal::from(self.total_payable));
        map.insert("take home".to_string(), Decimal::from(self.take_home));
        map.insert("effective rate".to_string(), self.effective_rate);
        map
    }
}

impl TaxModel {
    pub fn new(rules: Vec<BandsGroup>) -> Result<Self, ValidationError> {
        if rules.is_empty() {
            return Err(ValidationError::new(
                format!("tax model \"{}\"", DEFAULT_NAME),
                vec![Violation::NoRules],
            ));
        }
        Ok(TaxModel {
            name: DEFAULT_NAME.to_string(),
            year: DEFAULT_YEAR,
            rules,
            non_sequential: false,
        })
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        TaxModel {
            name: name.into(),
            ..self
        }
    }

    pub fn with_year(self, year: i32) -> Self {
        TaxModel { year, ..self }
    }

    /// Evaluate every rule against the original amount instead of the running remainder.
    pub fn non_sequential(self, non_sequential: bool) -> Self {
        TaxModel {
            non_sequential,
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn rules(&self) -> &[BandsGroup] {
        &self.rules
    }

    pub fn is_non_sequential(&self) -> bool {
        self.non_sequential
    }

    /// Payable per rule, in declaration order.
    ///
    /// Sequentially, each rule sees the amount net of every earlier rule's
    /// payable (never below zero).
    pub fn payables(&self, amount: u64) -> Vec<u64> {
        let mut base = amount;
        self.rules
            .iter()
            .map(|rule| {
                let payable = rule.get_payable(base);
                if !self.non_sequential {
                    base = base.saturating_sub(payable);
                }
                payable
            })
            .collect()
    }

    pub fn get_payable(&self, amount: u64) -> u64 {
        self.payables(amount)
            .into_iter()
            .fold(0u64, u64::saturating_add)
    }

    pub fn results(&self, amount: u64) -> TaxResults {
        let payables = self.payables(amount);
        let total_payable = payables.iter().copied().fold(0u64, u64::saturating_add);
        let rules = self
            .rules
            .iter()
            .zip(payables)
            .map(|(rule, payable)| RulePayable {
                name: rule.name().to_string(),
                payable,
                effective_rate: rate_of(payable, amount),
            })
            .collect();
        log::debug!(
            "{} ({}): amount={}, total payable={}",
            self.name,
            self.year,
            amount,
            total_payable
        );
        TaxResults {
            amount,
            rules,
            total_payable,
            take_home: net(amount, total_payable),
            effective_rate: rate_of(total_payable, amount),
        }
    }

    /// Forward-difference rate on the next `delta` units of income.
    pub fn marginal_rate(&self, amount: u64, delta: u64) -> Decimal {
        if delta == 0 {
            return Decimal::ZERO;
        }
        let next = Decimal::from(self.get_payable(amount.saturating_add(delta)));
        let current = Decimal::from(self.get_payable(amount));
        (next - current) / Decimal::from(delta)
    }

    /// A copy of this model with every rule's bands rescaled by `multiplier`.
    pub fn convert(&self, multiplier: Decimal) -> Result<Self, ValidationError> {
        let subject = format!("tax model \"{}\"", self.name);
        if multiplier <= Decimal::ZERO {
            return Err(ValidationError::new(
                subject,
                vec![Violation::NonPositiveMultiplier(multiplier)],
            ));
        }
        let mut violations = Vec::new();
        let mut rules = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            match rule.convert(multiplier) {
                Ok(rule) => rules.push(rule),
                Err(err) => violations.extend(err.into_nested()),
            }
        }
        ValidationError::check(subject, violations)?;
        log::debug!("converted {} by {}", self.name, multiplier);
        Ok(TaxModel {
            rules,
            name: self.name.clone(),
            ..*self
        })
    }
}

/// `amount - payable`, negative when charges exceed the amount.
pub(crate) fn net(amount: u64, payable: u64) -> i64 {
    let amount = i128::from(amount);
    let payable = i128::from(payable);
    i64::try_from(amount - payable).unwrap_or(if amount > payable {
        i64::MAX
    } else {
        i64::MIN
    })
}

/// `payable / amount`, or zero for a zero amount.
pub(crate) fn rate_of(payable: u64, amount: u64) -> Decimal {
    if amount == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(payable) / Decimal::from(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Allowance, BandSpec, TaperedAllowance};
    use proptest::prelude::{prop_assert, proptest};
    use rust_decimal_macros::dec;

    fn social_security() -> BandsGroup {
        BandsGroup::new(
            "Social Security",
            vec![
                BandSpec::flat(0, 10000, 1000),
                BandSpec::flat(10000, 30000, 2000),
                BandSpec::flat(30000, 10_000_000, 4000),
            ],
            Allowance::default(),
        )
        .unwrap()
    }

    fn income_tax() -> BandsGroup {
        BandsGroup::new(
            "Income Tax",
            vec![
                BandSpec::rate(0, 12450, dec!(0.19)),
                BandSpec::rate(12450, 20200, dec!(0.24)),
                BandSpec::rate(20200, 35200, dec!(0.30)),
                BandSpec::rate(35200, 10_000_000, dec!(0.37)),
            ],
            Allowance::Fixed(5500),
        )
        .unwrap()
    }

    fn sequential() -> TaxModel {
        TaxModel::new(vec![social_security(), income_tax()])
            .unwrap()
            .with_name("Autonomo")
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = TaxModel::new(vec![]).unwrap_err();
        assert_eq!(err.violations(), &[Violation::NoRules]);
    }

    #[test]
    fn defaults() {
        let model = TaxModel::new(vec![income_tax()]).unwrap();
        assert_eq!(model.name(), "TaxModel");
        assert_eq!(model.year(), 2025);
        assert!(!model.is_non_sequential());
    }

    #[test]
    fn sequential_rule_sees_amount_net_of_earlier_rules() {
        let model = sequential();
        let amount = 40000;
        let ss = social_security().get_payable(amount);
        let payables = model.payables(amount);
        assert_eq!(payables[0], ss);
        assert_eq!(payables[1], income_tax().get_payable(amount - ss));
    }

    #[test]
    fn non_sequential_rules_see_original_amount() {
        let model = sequential().non_sequential(true);
        let payables = model.payables(40000);
        assert_eq!(payables[0], 4000);
        assert_eq!(payables[1], income_tax().get_payable(40000));
    }

    #[test]
    fn results_totals() {
        let model = sequential();
        let results = model.results(40000);
        // 40000 - 4000 = 36000 base, 30500 after allowance:
        // 2365.5 + 1860 + 3090 = 7315.5 truncated per band to 2365 + 1860 + 3090
        assert_eq!(results.payable_for("Social Security"), Some(4000));
        assert_eq!(results.payable_for("Income Tax"), Some(7315));
        assert_eq!(results.total_payable, 11315);
        assert_eq!(results.take_home, 28685);
        assert_eq!(results.effective_rate, dec!(11315) / dec!(40000));
        assert_eq!(results.payable_for("Missing"), None);
        assert_eq!(results.rules[0].effective_rate, dec!(0.1));
        assert_eq!(results.rules[1].effective_rate, dec!(7315) / dec!(40000));
    }

    #[test]
    fn results_map_has_summary_keys() {
        let map = sequential().results(40000).to_map();
        assert_eq!(map["Social Security"], dec!(4000));
        assert_eq!(map["total payable"], dec!(11315));
        assert_eq!(map["take home"], dec!(28685));
        assert_eq!(map["effective rate"], dec!(0.282875));
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn zero_amount_has_zero_effective_rate() {
        let results = sequential().results(0);
        assert_eq!(results.total_payable, 0);
        assert_eq!(results.effective_rate, Decimal::ZERO);
        assert_eq!(results.take_home, 0);
        assert!(results
            .rules
            .iter()
            .all(|rule| rule.effective_rate == Decimal::ZERO));
    }

    #[test]
    fn flat_charges_can_exceed_income() {
        let results = sequential().results(500);
        assert_eq!(results.total_payable, 1000);
        assert_eq!(results.take_home, -500);
        assert_eq!(results.effective_rate, dec!(2));
    }

    #[test]
    fn get_payable_matches_results_total() {
        let model = sequential();
        for amount in [0, 9999, 10000, 25000, 40000, 120000] {
            assert_eq!(model.get_payable(amount), model.results(amount).total_payable);
        }
    }

    #[test]
    fn marginal_rate_is_forward_difference() {
        let model = sequential();
        let expected = (Decimal::from(model.get_payable(40100))
            - Decimal::from(model.get_payable(40000)))
            / dec!(100);
        assert_eq!(model.marginal_rate(40000, DEFAULT_MARGINAL_DELTA), expected);
        assert_eq!(expected, dec!(0.3));
    }

    #[test]
    fn marginal_rate_zero_delta_is_zero() {
        assert_eq!(sequential().marginal_rate(40000, 0), Decimal::ZERO);
    }

    #[test]
    fn marginal_rate_reflects_allowance_taper() {
        let income_tax = BandsGroup::new(
            "Income Tax",
            vec![
                BandSpec::rate(0, 37700, dec!(0.2)),
                BandSpec::rate(37700, 125140, dec!(0.4)),
                BandSpec::rate(125140, 10_000_000, dec!(0.45)),
            ],
            Allowance::policy(TaperedAllowance {
                base: 12570,
                threshold: 100000,
                withdrawal_rate: dec!(0.5),
            }),
        )
        .unwrap();
        let model = TaxModel::new(vec![income_tax]).unwrap();
        assert_eq!(model.marginal_rate(110000, 100), dec!(0.6));
        assert_eq!(model.marginal_rate(60000, 100), dec!(0.4));
    }

    #[test]
    fn convert_returns_independent_model() {
        let model = sequential().with_year(2024);
        let converted = model.convert(dec!(2)).unwrap();
        assert_eq!(converted.name(), "Autonomo");
        assert_eq!(converted.year(), 2024);
        assert_eq!(converted.rules()[0].bands()[0].ceiling(), 20000);
        assert_eq!(model.rules()[0].bands()[0].ceiling(), 10000);
    }

    #[test]
    fn convert_rejects_non_positive_multiplier() {
        let err = sequential().convert(dec!(-1)).unwrap_err();
        assert_eq!(err.violations(), &[Violation::NonPositiveMultiplier(dec!(-1))]);
    }

    #[test]
    fn convert_reports_overflow_for_open_ended_band() {
        let rule = BandsGroup::new(
            "Income Tax",
            vec![
                BandSpec::rate(0, 10000, dec!(0.1)),
                BandSpec::rate(10000, u64::MAX, dec!(0.2)),
            ],
            Allowance::default(),
        )
        .unwrap();
        let model = TaxModel::new(vec![rule]).unwrap();
        let err = model.convert(dec!(10000000000)).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert!(err.to_string().contains(
            "rule \"Income Tax\": band 2: [18446744073709551615] scaled by [10000000000] is too large to represent"
        ));
    }

    #[test]
    fn net_handles_negative_results() {
        assert_eq!(net(100, 250), -150);
        assert_eq!(net(250, 100), 150);
    }

    proptest! {
        #[test]
        fn prop_convert_round_trip_within_truncation(
            amount in 0u64..200_000,
            rate_pct in 50u32..300,
        ) {
            let model = TaxModel::new(vec![BandsGroup::new(
                "Income Tax",
                vec![
                    BandSpec::rate(0, 12450, dec!(0.19)),
                    BandSpec::rate(12450, 20200, dec!(0.24)),
                    BandSpec::rate(20200, 10_000_000, dec!(0.30)),
                ],
                Allowance::default(),
            )
            .unwrap()])
            .unwrap();
            let rate = Decimal::new(rate_pct.into(), 2);
            let back = model
                .convert(rate)
                .unwrap()
                .convert(Decimal::ONE / rate)
                .unwrap();
            let original = model.get_payable(amount);
            let round_trip = back.get_payable(amount);
            let diff = original.abs_diff(round_trip);
            // each limit may lose a unit per truncation, each band a unit of payable
            prop_assert!(diff <= 6, "original {} round trip {}", original, round_trip);
        }

        #[test]
        fn prop_get_payable_is_idempotent(amount in 0u64..500_000) {
            let model = sequential();
            prop_assert!(model.get_payable(amount) == model.get_payable(amount));
        }
    }
}
