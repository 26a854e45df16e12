//! Compare command - one amount under each year's rule table

use crate::cmd::format_rate;
use clap::{Args, ValueEnum};
use cuota::core::{TaxResults, DEFAULT_MARGINAL_DELTA};
use cuota::import::{read_yearly_tables, TableKind};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CompareCommand {
    /// Directory of dated rule tables, e.g. cuotas2024.csv and cuotas2025.csv
    #[arg(short, long)]
    dir: PathBuf,

    /// How the value column of the tables is read
    #[arg(short, long, value_enum, default_value_t = KindArg::Flat)]
    kind: KindArg,

    /// Scale applied to floors, ceilings and flat charges (12 annualises monthly tables)
    #[arg(long, default_value_t = Decimal::ONE)]
    multiplier: Decimal,

    /// Gross amount to evaluate
    #[arg(short, long)]
    amount: u64,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Values are percentage rates
    Rate,
    /// Values are flat charges
    Flat,
}

impl From<KindArg> for TableKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Rate => TableKind::Rate,
            KindArg::Flat => TableKind::Flat,
        }
    }
}

#[derive(Debug, Serialize)]
struct YearOutput {
    year: i32,
    name: String,
    #[serde(flatten)]
    results: TaxResults,
    marginal_rate: Decimal,
}

#[derive(Debug, Clone, Tabled)]
struct YearRow {
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Payable")]
    payable: u64,
    #[tabled(rename = "Take Home")]
    take_home: i64,
    #[tabled(rename = "Effective Rate")]
    effective_rate: String,
    #[tabled(rename = "Marginal Rate")]
    marginal_rate: String,
}

impl CompareCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let models = read_yearly_tables(&self.dir, self.kind.into(), self.multiplier)?;
        if models.is_empty() {
            anyhow::bail!("no dated rule tables found in {}", self.dir.display());
        }

        let outputs: Vec<YearOutput> = models
            .iter()
            .map(|model| YearOutput {
                year: model.year(),
                name: model.name().to_string(),
                results: model.results(self.amount),
                marginal_rate: model.marginal_rate(self.amount, DEFAULT_MARGINAL_DELTA),
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outputs)?);
            return Ok(());
        }

        let rows: Vec<YearRow> = outputs
            .iter()
            .map(|output| YearRow {
                year: output.year,
                payable: output.results.total_payable,
                take_home: output.results.take_home,
                effective_rate: format_rate(output.results.effective_rate),
                marginal_rate: format_rate(output.marginal_rate),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!();
        println!("Gross amount: {}", self.amount);
        println!("{}", table);
        println!();
        Ok(())
    }
}
