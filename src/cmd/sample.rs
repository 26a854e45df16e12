//! Sample command - sweep incomes through a model for charting

use crate::cmd::{describe, format_rate, ModelArgs};
use clap::{Args, ValueEnum};
use cuota::core::{sample, IncomeRange, MetricKind, MetricsTable};
use std::io;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

#[derive(Args, Debug)]
pub struct SampleCommand {
    #[command(flatten)]
    model: ModelArgs,

    /// Lowest gross income sampled
    #[arg(long, default_value_t = 3600)]
    min: u64,

    /// Sampling stops before this gross income
    #[arg(long, default_value_t = 120000)]
    max: u64,

    /// Distance between sampled incomes
    #[arg(long, default_value_t = 100)]
    step: u64,

    /// Only output these metrics (repeatable)
    #[arg(long, value_enum)]
    metric: Vec<MetricArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    Payable,
    Net,
    NetInSequence,
    EffectiveRate,
    EffectiveRateInSequence,
}

impl From<MetricArg> for MetricKind {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Payable => MetricKind::Payable,
            MetricArg::Net => MetricKind::Net,
            MetricArg::NetInSequence => MetricKind::NetInSequence,
            MetricArg::EffectiveRate => MetricKind::EffectiveRate,
            MetricArg::EffectiveRateInSequence => MetricKind::EffectiveRateInSequence,
        }
    }
}

impl SampleCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let model = self.model.load()?;
        let range = IncomeRange::new(self.min, self.max, self.step)?;
        let mut table = sample(&model, &range.incomes());
        if !self.metric.is_empty() {
            let metrics: Vec<MetricKind> = self.metric.iter().copied().map(Into::into).collect();
            table = table.select(&metrics);
        }
        log::info!(
            "Sampled {} incomes from {} to {}",
            table.incomes.len(),
            self.min,
            self.max
        );

        match self.format {
            OutputFormat::Table => {
                println!("{}", describe(&model));
                println!("{}", render(&table));
            }
            OutputFormat::Csv => table.write_csv(io::stdout())?,
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
        }
        Ok(())
    }
}

fn render(table: &MetricsTable) -> String {
    let mut builder = Builder::default();
    let mut header = vec!["gross income".to_string()];
    header.extend(table.labels());
    builder.push_record(header);

    for (index, income) in table.incomes.iter().enumerate() {
        let mut record = vec![income.to_string()];
        if let Some(values) = table.row(index) {
            record.extend(values.iter().zip(&table.columns).map(|(value, column)| {
                if column.metric.is_rate() {
                    format_rate(*value)
                } else {
                    value.to_string()
                }
            }));
        }
        builder.push_record(record);
    }

    builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string()
}
