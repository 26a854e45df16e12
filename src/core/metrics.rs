//! Income sweeps: per-rule payable, net and effective-rate series for charting.

use super::error::{ValidationError, Violation};
use super::model::{net, rate_of, TaxModel};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Decimal places kept for rates when writing tables.
pub const RATE_DECIMAL_PLACES: u32 = 6;

/// Largest number of incomes a single sweep may sample.
pub const MAX_SAMPLE_POINTS: u64 = 100_000;

/// Kind of value a metrics column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricKind {
    /// Payable under this rule alone, evaluated on the gross amount
    Payable,
    /// Gross amount less this rule's payable
    Net,
    /// Gross amount less the payable of this and every earlier rule
    NetInSequence,
    /// This rule's payable as a share of the gross amount
    EffectiveRate,
    /// Payable of this and every earlier rule as a share of the gross amount
    EffectiveRateInSequence,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Payable,
        MetricKind::Net,
        MetricKind::NetInSequence,
        MetricKind::EffectiveRate,
        MetricKind::EffectiveRateInSequence,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Payable => "Payable",
            MetricKind::Net => "Net",
            MetricKind::NetInSequence => "Net in sequence",
            MetricKind::EffectiveRate => "Effective rate",
            MetricKind::EffectiveRateInSequence => "Effective rate in sequence",
        }
    }

    pub fn is_rate(&self) -> bool {
        matches!(
            self,
            MetricKind::EffectiveRate | MetricKind::EffectiveRateInSequence
        )
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Evenly spaced gross incomes, `min` inclusive and `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomeRange {
    min: u64,
    max: u64,
    step: u64,
}

impl Default for IncomeRange {
    fn default() -> Self {
        IncomeRange {
            min: 3600,
            max: 120000,
            step: 100,
        }
    }
}

impl IncomeRange {
    pub fn new(min: u64, max: u64, step: u64) -> Result<Self, ValidationError> {
        if step == 0 {
            return Err(ValidationError::new(
                "income range",
                vec![Violation::ZeroStep],
            ));
        }
        let range = IncomeRange { min, max, step };
        let count = range.len();
        if count > MAX_SAMPLE_POINTS {
            return Err(ValidationError::new(
                "income range",
                vec![Violation::TooManySamples {
                    count,
                    max: MAX_SAMPLE_POINTS,
                }],
            ));
        }
        Ok(range)
    }

    /// Number of incomes sampled.
    pub fn len(&self) -> u64 {
        if self.max <= self.min {
            0
        } else {
            (self.max - self.min - 1) / self.step + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn incomes(&self) -> Vec<u64> {
        let step = usize::try_from(self.step).unwrap_or(usize::MAX);
        (self.min..self.max).step_by(step).collect()
    }
}

/// One series of a metrics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricColumn {
    pub metric: MetricKind,
    /// 1-based position of the rule in its model
    pub position: usize,
    pub rule: String,
    pub values: Vec<Decimal>,
}

impl MetricColumn {
    /// e.g. `Payable (1 Social Security)`
    pub fn label(&self) -> String {
        format!("{} ({} {})", self.metric, self.position, self.rule)
    }
}

/// Metrics for every sampled income, columns grouped by metric then rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsTable {
    pub model: String,
    pub incomes: Vec<u64>,
    pub columns: Vec<MetricColumn>,
}

impl MetricsTable {
    pub fn column(&self, metric: MetricKind, rule: &str) -> Option<&MetricColumn> {
        self.columns
            .iter()
            .find(|c| c.metric == metric && c.rule == rule)
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(MetricColumn::label).collect()
    }

    /// Keep only the columns of the given metric kinds, in their original order.
    pub fn select(self, metrics: &[MetricKind]) -> Self {
        MetricsTable {
            columns: self
                .columns
                .into_iter()
                .filter(|c| metrics.contains(&c.metric))
                .collect(),
            ..self
        }
    }

    /// Values of row `index` in column order.
    pub fn row(&self, index: usize) -> Option<Vec<Decimal>> {
        if index >= self.incomes.len() {
            return None;
        }
        Some(self.columns.iter().map(|c| c.values[index]).collect())
    }

    /// Write as CSV with a leading `gross income` column.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["gross income".to_string()];
        header.extend(self.labels());
        wtr.write_record(&header)?;
        for (index, income) in self.incomes.iter().enumerate() {
            let mut record = vec![income.to_string()];
            record.extend(self.columns.iter().map(|c| format_value(c, index)));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn format_value(column: &MetricColumn, index: usize) -> String {
    let value = column.values[index];
    if column.metric.is_rate() {
        value.round_dp(RATE_DECIMAL_PLACES).normalize().to_string()
    } else {
        value.to_string()
    }
}

/// Sweep `incomes` through `model`.
pub fn sample(model: &TaxModel, incomes: &[u64]) -> MetricsTable {
    let rules = model.rules();
    let mut columns: Vec<MetricColumn> = MetricKind::ALL
        .iter()
        .flat_map(|&metric| {
            rules.iter().enumerate().map(move |(index, rule)| MetricColumn {
                metric,
                position: index + 1,
                rule: rule.name().to_string(),
                values: Vec::with_capacity(incomes.len()),
            })
        })
        .collect();

    for &gross in incomes {
        let in_sequence = model.payables(gross);
        let mut cumulative = 0u64;
        for (index, rule) in rules.iter().enumerate() {
            let alone = rule.get_payable(gross);
            cumulative = cumulative.saturating_add(in_sequence[index]);
            for (offset, metric) in MetricKind::ALL.iter().enumerate() {
                let value = match metric {
                    MetricKind::Payable => Decimal::from(alone),
                    MetricKind::Net => Decimal::from(net(gross, alone)),
                    MetricKind::NetInSequence => Decimal::from(net(gross, cumulative)),
                    MetricKind::EffectiveRate => rate_of(alone, gross),
                    MetricKind::EffectiveRateInSequence => rate_of(cumulative, gross),
                };
                columns[offset * rules.len() + index].values.push(value);
            }
        }
    }

    log::debug!(
        "sampled {} incomes through {} ({} columns)",
        incomes.len(),
        model.name(),
        columns.len()
    );
    MetricsTable {
        model: model.name().to_string(),
        incomes: incomes.to_vec(),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Allowance, BandSpec, BandsGroup};
    use rust_decimal_macros::dec;

    fn model() -> TaxModel {
        let social_security = BandsGroup::new(
            "Social Security",
            vec![
                BandSpec::flat(0, 10000, 1000),
                BandSpec::flat(10000, 10_000_000, 3000),
            ],
            Allowance::default(),
        )
        .unwrap();
        let income_tax = BandsGroup::new(
            "Income Tax",
            vec![
                BandSpec::rate(0, 10000, dec!(0)),
                BandSpec::rate(10000, 10_000_000, dec!(0.2)),
            ],
            Allowance::default(),
        )
        .unwrap();
        TaxModel::new(vec![social_security, income_tax])
            .unwrap()
            .with_name("Sample")
    }

    #[test]
    fn default_range_matches_original_sweep() {
        let incomes = IncomeRange::default().incomes();
        assert_eq!(incomes.first(), Some(&3600));
        assert_eq!(incomes.last(), Some(&119900));
        assert_eq!(incomes.len(), 1164);
    }

    #[test]
    fn range_excludes_max() {
        let incomes = IncomeRange::new(0, 300, 100).unwrap().incomes();
        assert_eq!(incomes, vec![0, 100, 200]);
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = IncomeRange::new(0, 100, 0).unwrap_err();
        assert_eq!(err.violations(), &[Violation::ZeroStep]);
    }

    #[test]
    fn range_length_counts_sample_points() {
        assert_eq!(IncomeRange::default().len(), 1164);
        assert_eq!(IncomeRange::new(0, 301, 100).unwrap().len(), 4);
        assert!(IncomeRange::new(500, 500, 100).unwrap().is_empty());
        assert!(IncomeRange::new(500, 100, 100).unwrap().incomes().is_empty());
    }

    #[test]
    fn oversized_range_is_rejected() {
        let err = IncomeRange::new(0, u64::MAX, 1).unwrap_err();
        assert_eq!(
            err.violations(),
            &[Violation::TooManySamples {
                count: u64::MAX,
                max: MAX_SAMPLE_POINTS,
            }]
        );
        assert!(IncomeRange::new(0, MAX_SAMPLE_POINTS, 1).is_ok());
        assert!(IncomeRange::new(0, MAX_SAMPLE_POINTS + 1, 1).is_err());
    }

    #[test]
    fn columns_grouped_by_metric_then_rule() {
        let table = sample(&model(), &[20000]);
        assert_eq!(
            table.labels(),
            vec![
                "Payable (1 Social Security)",
                "Payable (2 Income Tax)",
                "Net (1 Social Security)",
                "Net (2 Income Tax)",
                "Net in sequence (1 Social Security)",
                "Net in sequence (2 Income Tax)",
                "Effective rate (1 Social Security)",
                "Effective rate (2 Income Tax)",
                "Effective rate in sequence (1 Social Security)",
                "Effective rate in sequence (2 Income Tax)",
            ]
        );
    }

    #[test]
    fn this_rule_only_and_in_sequence_values() {
        let table = sample(&model(), &[20000]);
        let value = |metric, rule| table.column(metric, rule).unwrap().values[0];

        // alone, income tax sees the full 20000
        assert_eq!(value(MetricKind::Payable, "Income Tax"), dec!(2000));
        assert_eq!(value(MetricKind::Net, "Income Tax"), dec!(18000));
        // in sequence it sees 17000 and pays 1400
        assert_eq!(value(MetricKind::NetInSequence, "Social Security"), dec!(17000));
        assert_eq!(value(MetricKind::NetInSequence, "Income Tax"), dec!(15600));
        assert_eq!(value(MetricKind::EffectiveRate, "Social Security"), dec!(0.15));
        assert_eq!(value(MetricKind::EffectiveRate, "Income Tax"), dec!(0.1));
        assert_eq!(
            value(MetricKind::EffectiveRateInSequence, "Income Tax"),
            dec!(0.22)
        );
    }

    #[test]
    fn select_keeps_requested_metrics() {
        let table = sample(&model(), &[20000]).select(&[MetricKind::NetInSequence]);
        assert_eq!(
            table.labels(),
            vec![
                "Net in sequence (1 Social Security)",
                "Net in sequence (2 Income Tax)"
            ]
        );
        assert_eq!(table.row(0), Some(vec![dec!(17000), dec!(15600)]));
    }

    #[test]
    fn zero_income_row_is_zero() {
        let table = sample(&model(), &[0]);
        assert!(table.row(0).unwrap().iter().all(|v| v.is_zero()));
        assert_eq!(table.row(1), None);
    }

    #[test]
    fn sample_is_pure() {
        let model = model();
        assert_eq!(sample(&model, &[5000, 20000]), sample(&model, &[5000, 20000]));
    }

    #[test]
    fn csv_output() {
        let table = sample(&model(), &[20000]);
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let mut lines = output.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("gross income,Payable (1 Social Security),"));
        assert_eq!(
            lines.next().unwrap(),
            "20000,3000,2000,17000,18000,17000,15600,0.15,0.1,0.15,0.22"
        );
    }
}
